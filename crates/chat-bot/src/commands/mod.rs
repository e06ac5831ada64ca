//! Bot command handlers.

mod admin;
mod counter;
mod help_queue;
mod mapping;

pub use admin::{register_admin_handlers, AdminHandler, AdminKind};
pub use counter::{create_counter_handler, load_counter_handlers, CounterHandler};
pub use help_queue::{
    parse_help_args, HelpArgsError, HelpQueue, HelpQueueHandler, HelpRequest, HelpSubcommand,
};
pub use mapping::{create_mapping_handler, load_mapping_handlers, render_template, MappingHandler};

use crate::bot::Bot;
use crate::error::AppResult;
use crate::recognizer::Command;
use async_trait::async_trait;
use chat_client::{ChatMessage, ChatUser};

/// What a handler sees of the message that invoked it.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub user: ChatUser,
    pub channel: String,
    pub command: Command,
}

impl CommandContext {
    pub fn new(message: &ChatMessage, command: Command) -> Self {
        Self {
            user: message.user.clone(),
            channel: message.channel.clone(),
            command,
        }
    }

    pub fn user_name(&self) -> &str {
        &self.user.display_name
    }

    pub fn is_moderator(&self) -> bool {
        self.user.is_moderator()
    }
}

/// Where a registered command comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Registered by the bot itself (help queue, admin commands).
    Builtin,
    Counter,
    Mapping,
}

/// Command handler trait.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Builtin
    }

    /// Handle one invocation. Replies go out through `bot`.
    ///
    /// Errors are logged by the dispatcher; nothing is sent to chat for them.
    async fn handle(&self, bot: &dyn Bot, ctx: &CommandContext) -> AppResult<()>;
}
