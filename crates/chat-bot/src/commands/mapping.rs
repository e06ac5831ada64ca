//! Mapping commands - fixed replies with `{user}` substitution.

use crate::bot::Bot;
use crate::commands::{CommandContext, CommandHandler, HandlerKind};
use crate::error::AppResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Placeholder replaced with the invoking user's display name.
pub const USER_PLACEHOLDER: &str = "{user}";

pub fn render_template(template: &str, user: &str) -> String {
    template.replace(USER_PLACEHOLDER, user)
}

pub struct MappingHandler {
    name: String,
}

impl MappingHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl CommandHandler for MappingHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Mapping
    }

    async fn handle(&self, bot: &dyn Bot, ctx: &CommandContext) -> AppResult<()> {
        let template = bot.storage().retrieve_mapping(&self.name).await?;
        bot.say(&render_template(&template, ctx.user_name())).await
    }
}

/// Store a reply template and register its command.
///
/// Fails with `DuplicateHandler` if any command already owns `name`.
pub async fn create_mapping_handler(bot: &dyn Bot, name: &str, template: &str) -> AppResult<()> {
    bot.try_register_handler(name, Arc::new(MappingHandler::new(name)))
        .await?;

    if let Err(e) = bot.storage().create_mapping(name, template).await {
        warn!("Failed to store mapping {}, unregistering: {}", name, e);
        bot.unregister_handler(name).await;
        return Err(e.into());
    }

    info!("Created new mapping handler for {}", name);
    Ok(())
}

/// Register a handler for every stored mapping. Returns how many were loaded.
pub async fn load_mapping_handlers(bot: &dyn Bot) -> AppResult<usize> {
    let mappings = bot.storage().list_mappings().await?;
    for name in mappings.keys() {
        bot.register_handler(name, Arc::new(MappingHandler::new(name.as_str())))
            .await;
        debug!("Loaded mapping handler for {}", name);
    }
    Ok(mappings.len())
}
