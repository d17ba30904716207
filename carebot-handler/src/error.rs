//! Error types for handler actions

use carebot_store::StoreError;
use thiserror::Error;

/// Result type for handler operations
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Handler error types
///
/// A predicate that does not match is not an error; it is reported as
/// `Ok(false)` from `accept`.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A store read or write failed inside an action
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An action failed for its own reasons
    #[error("Action failed: {0}")]
    Action(String),
}
