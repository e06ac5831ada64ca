//! Command name to handler routing.

use crate::bot::Bot;
use crate::commands::{CommandContext, CommandHandler};
use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Registry of command handlers. Each name has at most one owner.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler, replacing any previous owner of the name.
    pub async fn register(&self, name: &str, handler: Arc<dyn CommandHandler>) -> bool {
        let replaced = self
            .handlers
            .write()
            .await
            .insert(name.to_string(), handler)
            .is_some();
        if replaced {
            debug!("Replaced handler for {}", name);
        }
        replaced
    }

    /// Register a handler only if the name is free.
    pub async fn try_register(&self, name: &str, handler: Arc<dyn CommandHandler>) -> AppResult<()> {
        let mut handlers = self.handlers.write().await;
        if handlers.contains_key(name) {
            return Err(AppError::DuplicateHandler(name.to_string()));
        }
        handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// Remove a handler. Returns whether one was registered.
    pub async fn unregister(&self, name: &str) -> bool {
        self.handlers.write().await.remove(name).is_some()
    }

    pub async fn exists(&self, name: &str) -> bool {
        self.handlers.read().await.contains_key(name)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.read().await.get(name).cloned()
    }

    /// Registered command names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run the handler registered under `name`.
    ///
    /// Returns `None` when no handler owns the name. The registry lock is
    /// released before the handler runs, so handlers may register or
    /// unregister commands themselves.
    pub async fn dispatch(
        &self,
        name: &str,
        bot: &dyn Bot,
        ctx: &CommandContext,
    ) -> Option<AppResult<()>> {
        let handler = self.get(name).await?;
        Some(handler.handle(bot, ctx).await)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
