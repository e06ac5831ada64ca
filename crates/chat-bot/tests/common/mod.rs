//! Common test utilities for integration tests.

use async_trait::async_trait;
use chat_bot::bot::{Bot, ChatBot};
use chat_bot::commands::{
    load_counter_handlers, load_mapping_handlers, register_admin_handlers, HelpQueueHandler,
};
use chat_bot::scheduler::ActivityGate;
use chat_client::{ChatError, ChatMessage, ChatTransport, ChatUser};
use state_store::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const CHANNEL: &str = "lobby";

/// Transport that keeps every outgoing message.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    pub async fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.sent.lock().await)
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(&self, _channel: &str, message: &str) -> Result<(), ChatError> {
        self.sent.lock().await.push(message.to_string());
        Ok(())
    }

    async fn join(&self, _channel: &str) -> Result<(), ChatError> {
        Ok(())
    }

    async fn part(&self, _channel: &str) -> Result<(), ChatError> {
        Ok(())
    }
}

/// Wire a bot the way the binary does, over the given store.
pub async fn start_bot(store: SnapshotStore) -> (Arc<ChatBot>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let bot = Arc::new(
        ChatBot::new(
            "botty",
            '!',
            transport.clone(),
            Arc::new(store),
            Arc::new(ActivityGate::new(Duration::from_secs(15 * 60))),
        )
        .unwrap(),
    );

    bot.join(CHANNEL).await.unwrap();
    load_counter_handlers(bot.as_ref()).await.unwrap();
    load_mapping_handlers(bot.as_ref()).await.unwrap();
    bot.register_handler(
        "help",
        Arc::new(HelpQueueHandler::new("help", "https://pastebin.com/")),
    )
    .await;
    register_admin_handlers(bot.as_ref()).await;

    (bot, transport)
}

pub fn viewer(name: &str, text: &str) -> ChatMessage {
    ChatMessage::new(ChatUser::new(name), CHANNEL, text)
}

pub fn moderator(name: &str, text: &str) -> ChatMessage {
    ChatMessage::new(ChatUser::new(name).with_badge("moderator"), CHANNEL, text)
}
