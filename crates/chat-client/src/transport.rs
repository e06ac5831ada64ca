//! Outbound side of a chat connection.

use crate::error::ChatError;
use async_trait::async_trait;

/// A live connection able to deliver messages to channels.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a message to a channel.
    async fn send(&self, channel: &str, message: &str) -> Result<(), ChatError>;

    /// Send a direct message. Many transports cannot, so the default refuses.
    async fn whisper(&self, _user: &str, _message: &str) -> Result<(), ChatError> {
        Err(ChatError::Unsupported("whisper"))
    }

    async fn join(&self, channel: &str) -> Result<(), ChatError>;

    async fn part(&self, channel: &str) -> Result<(), ChatError>;
}
