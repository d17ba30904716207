//! Application error types

use carebot_handler::HandlerError;
use carebot_store::StoreError;
use thiserror::Error;

/// Result type for bot operations
pub type BotResult<T> = std::result::Result<T, BotError>;

/// Bot error types
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
}

impl From<toml::de::Error> for BotError {
    fn from(e: toml::de::Error) -> Self {
        BotError::Config(e.to_string())
    }
}
