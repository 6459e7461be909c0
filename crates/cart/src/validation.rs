use serde::{Deserialize, Serialize};

/// Outcome of validating a cart before it is ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Human-readable problems; empty when the cart is valid.
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// A result without errors.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A result carrying the given errors.
    pub fn invalid<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
