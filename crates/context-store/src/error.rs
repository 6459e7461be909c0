use thiserror::Error;

/// Errors that can occur when interacting with the context store.
#[derive(Debug, Error)]
pub enum ContextStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A value could not be serialized for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for context store operations.
pub type Result<T> = std::result::Result<T, ContextStoreError>;
