//! Chat transport errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Refusing to send an empty message")]
    EmptyMessage,

    #[error("Message too long: {len}/{max} bytes")]
    MessageTooLong { len: usize, max: usize },

    #[error("{0} is not supported by this transport")]
    Unsupported(&'static str),

    #[error("Already in channel {0}")]
    AlreadyJoined(String),

    #[error("Not in channel {0}")]
    NotJoined(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
