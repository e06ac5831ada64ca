//! The bot capability and the engine that dispatches chat lines to handlers.

use crate::commands::{CommandContext, CommandHandler, HandlerKind};
use crate::error::AppResult;
use crate::recognizer::Recognizer;
use crate::registry::HandlerRegistry;
use crate::scheduler::ActivityGate;
use async_trait::async_trait;
use chat_client::{validate_outgoing, ChatError, ChatMessage, ChatTransport};
use state_store::Storage;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// Everything a handler or the timer scheduler may do to the outside world.
#[async_trait]
pub trait Bot: Send + Sync {
    /// The bot's own display name.
    fn username(&self) -> &str;

    /// Character that introduces commands in chat.
    fn trigger(&self) -> char;

    /// Post a message to every joined channel.
    async fn say(&self, message: &str) -> AppResult<()>;

    /// Direct message. Transports without support fail with
    /// [`ChatError::Unsupported`].
    async fn whisper(&self, user: &str, message: &str) -> AppResult<()>;

    async fn join(&self, channel: &str) -> AppResult<()>;

    async fn depart(&self, channel: &str) -> AppResult<()>;

    /// Register a handler, replacing any previous owner of the name.
    async fn register_handler(&self, name: &str, handler: Arc<dyn CommandHandler>);

    /// Register a handler, failing with `DuplicateHandler` if the name is taken.
    async fn try_register_handler(&self, name: &str, handler: Arc<dyn CommandHandler>) -> AppResult<()>;

    async fn unregister_handler(&self, name: &str) -> bool;

    async fn handler_exists(&self, name: &str) -> bool;

    /// Kind of the handler registered under `name`, if any.
    async fn handler_kind(&self, name: &str) -> Option<HandlerKind>;

    fn storage(&self) -> &dyn Storage;
}

/// Result of feeding one chat line to [`ChatBot::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The line is not a command.
    Ignored,
    /// Command syntax, but nothing is registered under the name.
    Unknown(String),
    Handled(String),
    /// The handler ran and failed; the failure was logged.
    Failed(String),
}

/// Chat bot engine: owns the handler registry and joined channels, and
/// routes inbound lines to handlers.
pub struct ChatBot {
    username: String,
    recognizer: Recognizer,
    transport: Arc<dyn ChatTransport>,
    storage: Arc<dyn Storage>,
    handlers: HandlerRegistry,
    activity: Arc<ActivityGate>,
    channels: RwLock<Vec<String>>,
}

impl ChatBot {
    pub fn new(
        username: impl Into<String>,
        trigger: char,
        transport: Arc<dyn ChatTransport>,
        storage: Arc<dyn Storage>,
        activity: Arc<ActivityGate>,
    ) -> AppResult<Self> {
        Ok(Self {
            username: username.into(),
            recognizer: Recognizer::new(trigger)?,
            transport,
            storage,
            handlers: HandlerRegistry::new(),
            activity,
            channels: RwLock::new(Vec::new()),
        })
    }

    pub fn activity(&self) -> &Arc<ActivityGate> {
        &self.activity
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub async fn channels(&self) -> Vec<String> {
        self.channels.read().await.clone()
    }

    fn is_self(&self, message: &ChatMessage) -> bool {
        message.user.display_name.eq_ignore_ascii_case(&self.username)
    }

    /// Process one inbound chat line.
    ///
    /// Never fails: unknown commands and handler errors are logged and
    /// reported through the returned outcome.
    #[instrument(skip_all, fields(user = %message.user.display_name))]
    pub async fn dispatch(&self, message: &ChatMessage) -> DispatchOutcome {
        debug!("{}: {}", message.user.display_name, message.text);

        if !self.is_self(message) {
            self.activity.observe(message.timestamp).await;
        }

        let Some(command) = self.recognizer.recognize(&message.text) else {
            return DispatchOutcome::Ignored;
        };

        let name = command.name.clone();
        let ctx = CommandContext::new(message, command);

        match self.handlers.dispatch(&name, self, &ctx).await {
            None => {
                info!("No handler found for command \"{}\"", name);
                DispatchOutcome::Unknown(name)
            }
            Some(Ok(())) => DispatchOutcome::Handled(name),
            Some(Err(e)) => {
                error!(
                    "Failed to handle command \"{}\" with args \"{}\": {}",
                    name, ctx.command.args, e
                );
                DispatchOutcome::Failed(name)
            }
        }
    }
}

#[async_trait]
impl Bot for ChatBot {
    fn username(&self) -> &str {
        &self.username
    }

    fn trigger(&self) -> char {
        self.recognizer.trigger()
    }

    async fn say(&self, message: &str) -> AppResult<()> {
        validate_outgoing(message)?;

        let channels = self.channels.read().await;
        if channels.is_empty() {
            warn!("Dropping message, not in any channel: {}", message);
            return Ok(());
        }
        for channel in channels.iter() {
            self.transport.send(channel, message).await?;
        }
        Ok(())
    }

    async fn whisper(&self, user: &str, message: &str) -> AppResult<()> {
        validate_outgoing(message)?;
        Ok(self.transport.whisper(user, message).await?)
    }

    async fn join(&self, channel: &str) -> AppResult<()> {
        let mut channels = self.channels.write().await;
        if channels.iter().any(|c| c == channel) {
            return Err(ChatError::AlreadyJoined(channel.to_string()).into());
        }

        info!("Bot {} joining channel {}", self.username, channel);
        self.transport.join(channel).await?;
        channels.push(channel.to_string());
        Ok(())
    }

    async fn depart(&self, channel: &str) -> AppResult<()> {
        let mut channels = self.channels.write().await;
        let Some(idx) = channels.iter().position(|c| c == channel) else {
            return Err(ChatError::NotJoined(channel.to_string()).into());
        };

        self.transport.part(channel).await?;
        channels.remove(idx);
        info!("Bot {} left channel {}", self.username, channel);
        Ok(())
    }

    async fn register_handler(&self, name: &str, handler: Arc<dyn CommandHandler>) {
        self.handlers.register(name, handler).await;
    }

    async fn try_register_handler(&self, name: &str, handler: Arc<dyn CommandHandler>) -> AppResult<()> {
        self.handlers.try_register(name, handler).await
    }

    async fn unregister_handler(&self, name: &str) -> bool {
        self.handlers.unregister(name).await
    }

    async fn handler_exists(&self, name: &str) -> bool {
        self.handlers.exists(name).await
    }

    async fn handler_kind(&self, name: &str) -> Option<HandlerKind> {
        self.handlers.get(name).await.map(|handler| handler.kind())
    }

    fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::testing::{message, test_bot};
    use async_trait::async_trait;
    use chat_client::ChatUser;

    struct FailingHandler;

    #[async_trait]
    impl CommandHandler for FailingHandler {
        async fn handle(&self, bot: &dyn Bot, _ctx: &CommandContext) -> AppResult<()> {
            bot.storage().retrieve_counter("missing").await?;
            Ok(())
        }
    }

    struct ReplyHandler;

    #[async_trait]
    impl CommandHandler for ReplyHandler {
        async fn handle(&self, bot: &dyn Bot, ctx: &CommandContext) -> AppResult<()> {
            bot.say(&format!("pong {}", ctx.user_name())).await
        }
    }

    #[tokio::test]
    async fn test_dispatch_outcomes() {
        let (bot, transport) = test_bot().await;
        bot.register_handler("ping", Arc::new(ReplyHandler)).await;
        bot.register_handler("broken", Arc::new(FailingHandler)).await;

        assert_eq!(bot.dispatch(&message("ari", "hello")).await, DispatchOutcome::Ignored);
        assert_eq!(
            bot.dispatch(&message("ari", "!nope")).await,
            DispatchOutcome::Unknown("nope".into())
        );
        assert_eq!(
            bot.dispatch(&message("ari", "!ping")).await,
            DispatchOutcome::Handled("ping".into())
        );
        assert_eq!(
            bot.dispatch(&message("ari", "!broken")).await,
            DispatchOutcome::Failed("broken".into())
        );

        // Only the successful handler replied
        assert_eq!(transport.sent().await, vec!["pong ari".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_records_activity_except_self() {
        let (bot, _transport) = test_bot().await;
        let before = bot.activity().last_seen().await;

        let mut own = message("testbot", "beep");
        own.timestamp = before + chrono::Duration::minutes(5);
        bot.dispatch(&own).await;
        assert_eq!(bot.activity().last_seen().await, before);

        let mut other = message("ari", "hi");
        other.timestamp = before + chrono::Duration::minutes(6);
        bot.dispatch(&other).await;
        assert_eq!(bot.activity().last_seen().await, other.timestamp);
    }

    #[tokio::test]
    async fn test_say_validates_and_broadcasts() {
        let (bot, transport) = test_bot().await;
        bot.join("second").await.unwrap();

        bot.say("hello").await.unwrap();
        assert_eq!(
            transport.sent_to().await,
            vec![
                ("lobby".to_string(), "hello".to_string()),
                ("second".to_string(), "hello".to_string()),
            ]
        );

        assert!(matches!(
            bot.say("").await,
            Err(AppError::Chat(ChatError::EmptyMessage))
        ));
        assert!(matches!(
            bot.say(&"x".repeat(600)).await,
            Err(AppError::Chat(ChatError::MessageTooLong { .. }))
        ));
    }

    #[tokio::test]
    async fn test_join_and_depart() {
        let (bot, _transport) = test_bot().await;

        assert!(matches!(
            bot.join("lobby").await,
            Err(AppError::Chat(ChatError::AlreadyJoined(_)))
        ));

        bot.depart("lobby").await.unwrap();
        assert!(bot.channels().await.is_empty());
        assert!(matches!(
            bot.depart("lobby").await,
            Err(AppError::Chat(ChatError::NotJoined(_)))
        ));

        // Nowhere to send, but not an error
        bot.say("anyone?").await.unwrap();
    }

    #[tokio::test]
    async fn test_whisper_unsupported_is_an_error_value() {
        let (bot, _transport) = test_bot().await;
        assert!(matches!(
            bot.whisper("ari", "psst").await,
            Err(AppError::Chat(ChatError::Unsupported("whisper")))
        ));
    }

    #[tokio::test]
    async fn test_handler_can_see_moderator_flag() {
        let (bot, _transport) = test_bot().await;
        let msg = ChatMessage::new(ChatUser::new("sam").with_badge("moderator"), "lobby", "!x");
        let ctx = CommandContext::new(&msg, bot.recognizer.recognize(&msg.text).unwrap());
        assert!(ctx.is_moderator());
        assert_eq!(ctx.user_name(), "sam");
    }
}
