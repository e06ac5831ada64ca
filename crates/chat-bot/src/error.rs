//! Application error types.

use thiserror::Error;

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Chat error: {0}")]
    Chat(#[from] chat_client::ChatError),

    #[error("Storage error: {0}")]
    Store(#[from] state_store::StoreError),

    #[error("A handler for \"{0}\" is already registered")]
    DuplicateHandler(String),

    #[error("Invalid command pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type alias for application errors.
pub type AppResult<T> = Result<T, AppError>;
