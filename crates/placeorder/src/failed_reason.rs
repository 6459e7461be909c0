//! Why a place-order attempt failed.

use cart::ValidationResult;
use serde::{Deserialize, Serialize};

/// Reason recorded on a context that reached `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason")]
pub enum FailedReason {
    /// Anything not covered by the other variants.
    Error { message: String },
    /// The payment gateway reported an error or a failed payment.
    PaymentError { error: String },
    /// The cart did not pass validation.
    CartValidation { result: ValidationResult },
    /// The customer aborted the payment at the provider.
    PaymentCanceledByCustomer,
}

impl FailedReason {
    pub fn error(message: impl Into<String>) -> Self {
        FailedReason::Error {
            message: message.into(),
        }
    }

    pub fn payment(error: impl Into<String>) -> Self {
        FailedReason::PaymentError {
            error: error.into(),
        }
    }

    /// Returns the variant name, used to tag the reason on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            FailedReason::Error { .. } => "Error",
            FailedReason::PaymentError { .. } => "PaymentError",
            FailedReason::CartValidation { .. } => "CartValidation",
            FailedReason::PaymentCanceledByCustomer => "PaymentCanceledByCustomer",
        }
    }
}

impl std::fmt::Display for FailedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailedReason::Error { message } => write!(f, "{message}"),
            FailedReason::PaymentError { error } => write!(f, "payment failed: {error}"),
            FailedReason::CartValidation { result } => {
                write!(f, "cart invalid: {}", result.errors.join(", "))
            }
            FailedReason::PaymentCanceledByCustomer => write!(f, "payment canceled by customer"),
        }
    }
}
