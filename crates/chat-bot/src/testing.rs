//! Shared fixtures for unit tests.

use crate::bot::{Bot, ChatBot};
use crate::commands::CommandContext;
use crate::recognizer::Command;
use crate::scheduler::ActivityGate;
use async_trait::async_trait;
use chat_client::{ChatError, ChatMessage, ChatTransport, ChatUser};
use state_store::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Transport that records everything sent and can be told to fail.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    fail_containing: Mutex<Option<String>>,
}

impl RecordingTransport {
    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(_, m)| m.clone()).collect()
    }

    pub async fn sent_to(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }

    /// Fail any send whose text contains `needle`.
    pub async fn fail_on(&self, needle: &str) {
        *self.fail_containing.lock().await = Some(needle.to_string());
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(&self, channel: &str, message: &str) -> Result<(), ChatError> {
        if let Some(needle) = self.fail_containing.lock().await.as_deref() {
            if message.contains(needle) {
                return Err(ChatError::Io(std::io::Error::other("send refused")));
            }
        }
        self.sent
            .lock()
            .await
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }

    async fn join(&self, _channel: &str) -> Result<(), ChatError> {
        Ok(())
    }

    async fn part(&self, _channel: &str) -> Result<(), ChatError> {
        Ok(())
    }
}

/// A bot named `testbot` with an in-memory store, joined to `lobby`.
pub async fn test_bot() -> (ChatBot, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let bot = ChatBot::new(
        "testbot",
        '!',
        transport.clone(),
        Arc::new(SnapshotStore::in_memory()),
        Arc::new(ActivityGate::new(Duration::from_secs(15 * 60))),
    )
    .unwrap();
    bot.join("lobby").await.unwrap();
    (bot, transport)
}

pub fn message(user: &str, text: &str) -> ChatMessage {
    ChatMessage::new(ChatUser::new(user), "lobby", text)
}

pub fn moderator_message(user: &str, text: &str) -> ChatMessage {
    ChatMessage::new(ChatUser::new(user).with_badge("moderator"), "lobby", text)
}

pub fn context(user: &str, name: &str, args: &str) -> CommandContext {
    CommandContext::new(
        &message(user, ""),
        Command {
            name: name.into(),
            args: args.into(),
        },
    )
}

pub fn moderator_context(user: &str, name: &str, args: &str) -> CommandContext {
    CommandContext::new(
        &moderator_message(user, ""),
        Command {
            name: name.into(),
            args: args.into(),
        },
    )
}
