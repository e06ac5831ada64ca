//! Line-oriented console transport.
//!
//! Reads chat lines (`name[#badge,badge]: text`) from any async reader and
//! writes replies as `[#channel] message` lines to any async writer.

use crate::error::ChatError;
use crate::transport::ChatTransport;
use crate::types::ChatMessage;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_stream::Stream;
use tracing::{debug, error, info};

/// Transport that prints outgoing messages.
pub struct ConsoleTransport<W> {
    out: Mutex<W>,
}

impl ConsoleTransport<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    async fn write_line(&self, line: &str) -> Result<(), ChatError> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ChatTransport for ConsoleTransport<W> {
    async fn send(&self, channel: &str, message: &str) -> Result<(), ChatError> {
        self.write_line(&format!("[#{}] {}", channel, message)).await
    }

    async fn join(&self, channel: &str) -> Result<(), ChatError> {
        info!("Joined #{}", channel);
        Ok(())
    }

    async fn part(&self, channel: &str) -> Result<(), ChatError> {
        info!("Left #{}", channel);
        Ok(())
    }
}

/// Turns console input lines into chat messages.
pub struct ConsoleReceiver<R> {
    reader: R,
    channel: String,
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleReceiver<R> {
    pub fn new(reader: R, channel: impl Into<String>) -> Self {
        Self {
            reader,
            channel: channel.into(),
        }
    }

    /// Stream parsed messages until the reader is exhausted.
    pub fn stream(self) -> impl Stream<Item = ChatMessage> {
        let channel = self.channel;
        let mut lines = self.reader.lines();

        async_stream::stream! {
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        match ChatMessage::from_console_line(&line, &channel) {
                            Some(msg) => yield msg,
                            None => debug!("Skipping unparseable line: {}", line),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Console read error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}
