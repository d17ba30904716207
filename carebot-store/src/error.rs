//! Error types for store operations

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend rejected or failed a get/set/delete
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// A stored value could not be converted to or from its typed form
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// `modify` was asked to transform a key that holds no value
    #[error("No value stored for key {0}")]
    Missing(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
