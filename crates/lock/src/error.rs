use thiserror::Error;

/// Errors that can occur when acquiring or releasing a lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another holder currently owns the lease for this key.
    #[error("Lock already taken: {0}")]
    Taken(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LockError {
    /// Returns true for plain contention, as opposed to infrastructure failure.
    pub fn is_taken(&self) -> bool {
        matches!(self, LockError::Taken(_))
    }
}

/// Result type for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;
