//! Counter commands - each invocation bumps a stored count and reports it.

use crate::bot::Bot;
use crate::commands::{CommandContext, CommandHandler, HandlerKind};
use crate::error::AppResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct CounterHandler {
    name: String,
}

impl CounterHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl CommandHandler for CounterHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Counter
    }

    async fn handle(&self, bot: &dyn Bot, _ctx: &CommandContext) -> AppResult<()> {
        // Single step in the store, shared by every handler for this name
        let (value, prefix) = bot.storage().increment_counter(&self.name).await?;

        debug!("Counter {} is now {}", self.name, value);
        bot.say(&format!("{}: {}", prefix, value)).await
    }
}

/// Create a counter and register its command.
///
/// Fails with `DuplicateHandler` if any command already owns `name`; the
/// stored counter is then left untouched.
pub async fn create_counter_handler(
    bot: &dyn Bot,
    name: &str,
    initial: i64,
    prefix: &str,
) -> AppResult<()> {
    bot.try_register_handler(name, Arc::new(CounterHandler::new(name)))
        .await?;

    if let Err(e) = bot.storage().create_counter(name, initial, prefix).await {
        warn!("Failed to store counter {}, unregistering: {}", name, e);
        bot.unregister_handler(name).await;
        return Err(e.into());
    }

    info!("Created new counter handler for {}", name);
    Ok(())
}

/// Register a handler for every stored counter. Returns how many were loaded.
pub async fn load_counter_handlers(bot: &dyn Bot) -> AppResult<usize> {
    let counters = bot.storage().list_counters().await?;
    for name in &counters {
        bot.register_handler(name, Arc::new(CounterHandler::new(name.as_str())))
            .await;
        debug!("Loaded counter handler for {}", name);
    }
    Ok(counters.len())
}
