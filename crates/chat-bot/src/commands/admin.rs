//! Moderator commands for managing counters, mappings and timers from chat.
//!
//! ```text
//! !counter add <name> <initial> <prefix...>
//! !counter remove <name>
//! !mapping add <name> <template...>
//! !mapping remove <name>
//! !timer add <name> <interval> <message...>
//! !timer remove <name>
//! ```

use crate::bot::Bot;
use crate::commands::{
    create_counter_handler, create_mapping_handler, CommandContext, CommandHandler, HandlerKind,
};
use crate::error::{AppError, AppResult};
use crate::scheduler::create_timer;
use async_trait::async_trait;
use chat_client::{validate_outgoing, MAX_MESSAGE_LEN};
use humantime_serde::re::humantime;
use state_store::StoreError;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminKind {
    Counter,
    Mapping,
    Timer,
}

impl AdminKind {
    pub const ALL: [AdminKind; 3] = [AdminKind::Counter, AdminKind::Mapping, AdminKind::Timer];

    /// Command name the kind is managed under.
    pub fn command(&self) -> &'static str {
        match self {
            AdminKind::Counter => "counter",
            AdminKind::Mapping => "mapping",
            AdminKind::Timer => "timer",
        }
    }

    /// Handler kind backing stored rows of this kind. Timers have none.
    fn handler_kind(&self) -> Option<HandlerKind> {
        match self {
            AdminKind::Counter => Some(HandlerKind::Counter),
            AdminKind::Mapping => Some(HandlerKind::Mapping),
            AdminKind::Timer => None,
        }
    }

    fn add_usage(&self) -> &'static str {
        match self {
            AdminKind::Counter => "add <name> <initial> <prefix>",
            AdminKind::Mapping => "add <name> <template>",
            AdminKind::Timer => "add <name> <interval> <message>",
        }
    }
}

pub struct AdminHandler {
    kind: AdminKind,
}

impl AdminHandler {
    pub fn new(kind: AdminKind) -> Self {
        Self { kind }
    }

    fn usage(&self, trigger: char, user: &str) -> String {
        format!(
            "@{} usage: {t}{c} {} | {t}{c} remove <name>",
            user,
            self.kind.add_usage(),
            t = trigger,
            c = self.kind.command(),
        )
    }

    fn too_long(&self, user: &str) -> String {
        format!(
            "@{} {} text must be 1-{} bytes",
            user,
            self.kind.command(),
            MAX_MESSAGE_LEN
        )
    }

    /// `None` means the arguments did not parse.
    async fn add(&self, bot: &dyn Bot, user: &str, args: &str) -> AppResult<Option<String>> {
        let (name, rest) = split_word(args);
        if !is_command_name(name) {
            return Ok(None);
        }
        let trigger = bot.trigger();

        let result = match self.kind {
            AdminKind::Counter => {
                let (initial, prefix) = split_word(rest);
                let Ok(initial) = initial.parse::<i64>() else {
                    return Ok(None);
                };
                if prefix.is_empty() {
                    return Ok(None);
                }
                create_counter_handler(bot, name, initial, prefix).await
            }
            AdminKind::Mapping => {
                if rest.is_empty() {
                    return Ok(None);
                }
                if validate_outgoing(rest).is_err() {
                    return Ok(Some(self.too_long(user)));
                }
                create_mapping_handler(bot, name, rest).await
            }
            AdminKind::Timer => {
                let (interval, message) = split_word(rest);
                let Ok(interval) = humantime::parse_duration(interval) else {
                    return Ok(None);
                };
                if interval.is_zero() || message.is_empty() {
                    return Ok(None);
                }
                if validate_outgoing(message).is_err() {
                    return Ok(Some(self.too_long(user)));
                }

                match bot.storage().retrieve_timer(name).await {
                    Ok(_) => {
                        return Ok(Some(format!("@{} timer {} already exists", user, name)));
                    }
                    Err(StoreError::NotFound { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
                create_timer(bot, name, message, interval).await?;
                return Ok(Some(format!(
                    "@{} timer {} will post every {}",
                    user,
                    name,
                    humantime::format_duration(interval)
                )));
            }
        };

        match result {
            Ok(()) => {
                info!("{} added {} {}", user, self.kind.command(), name);
                Ok(Some(format!(
                    "@{} added {} {}{}",
                    user,
                    self.kind.command(),
                    trigger,
                    name
                )))
            }
            Err(AppError::DuplicateHandler(_)) => Ok(Some(format!(
                "@{} {}{} already exists",
                user, trigger, name
            ))),
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, bot: &dyn Bot, user: &str, args: &str) -> AppResult<Option<String>> {
        let (name, rest) = split_word(args);
        if !is_command_name(name) || !rest.is_empty() {
            return Ok(None);
        }

        let storage = bot.storage();
        let deleted = match self.kind {
            AdminKind::Counter => storage.delete_counter(name).await,
            AdminKind::Mapping => storage.delete_mapping(name).await,
            AdminKind::Timer => storage.delete_timer(name).await,
        };

        match deleted {
            Ok(()) => {
                // Leave a built-in command sharing the name registered
                if let Some(kind) = self.kind.handler_kind() {
                    if bot.handler_kind(name).await == Some(kind) {
                        bot.unregister_handler(name).await;
                    }
                }
                info!("{} removed {} {}", user, self.kind.command(), name);
                Ok(Some(format!("@{} removed {} {}", user, self.kind.command(), name)))
            }
            Err(StoreError::NotFound { .. }) => Ok(Some(format!(
                "@{} there is no {} named {}",
                user,
                self.kind.command(),
                name
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CommandHandler for AdminHandler {
    async fn handle(&self, bot: &dyn Bot, ctx: &CommandContext) -> AppResult<()> {
        let user = ctx.user_name();
        if !ctx.is_moderator() {
            return bot
                .say(&format!("@{} only moderators can manage {}s", user, self.kind.command()))
                .await;
        }

        let (action, rest) = split_word(&ctx.command.args);
        let reply = match action {
            "add" => self.add(bot, user, rest).await?,
            "remove" => self.remove(bot, user, rest).await?,
            _ => None,
        };

        let reply = reply.unwrap_or_else(|| self.usage(bot.trigger(), user));
        bot.say(&reply).await
    }
}

/// Register the `counter`, `mapping` and `timer` commands.
pub async fn register_admin_handlers(bot: &dyn Bot) {
    for kind in AdminKind::ALL {
        bot.register_handler(kind.command(), Arc::new(AdminHandler::new(kind)))
            .await;
    }
}

/// Split off the first whitespace-delimited word; both halves are trimmed.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

/// Names must be matchable by the recognizer.
fn is_command_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::DispatchOutcome;
    use crate::testing::{message, moderator_message, test_bot};
    use std::time::Duration;

    #[test]
    fn test_split_word() {
        assert_eq!(split_word("  add  deaths 0 Deaths: "), ("add", "deaths 0 Deaths:"));
        assert_eq!(split_word("remove"), ("remove", ""));
        assert_eq!(split_word(""), ("", ""));
    }

    #[tokio::test]
    async fn test_counter_add_and_use() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;

        bot.dispatch(&moderator_message("sam", "!counter add deaths 10 Total deaths")).await;
        bot.dispatch(&message("ari", "!deaths")).await;

        assert_eq!(
            transport.sent().await,
            vec!["@sam added counter !deaths".to_string(), "Total deaths: 11".into()]
        );
    }

    #[tokio::test]
    async fn test_non_moderator_rejected() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;

        bot.dispatch(&message("ari", "!mapping add rules be nice")).await;

        assert!(!bot.handler_exists("rules").await);
        assert_eq!(
            transport.sent().await,
            vec!["@ari only moderators can manage mappings".to_string()]
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_reported() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;

        bot.dispatch(&moderator_message("sam", "!mapping add rules be nice")).await;
        bot.dispatch(&moderator_message("sam", "!counter add rules 0 Rules")).await;
        bot.dispatch(&moderator_message("sam", "!mapping add timer hijack")).await;

        let sent = transport.sent().await;
        assert_eq!(sent[1], "@sam !rules already exists");
        assert_eq!(sent[2], "@sam !timer already exists");
        assert!(bot.storage().retrieve_counter("rules").await.is_err());
    }

    #[tokio::test]
    async fn test_mapping_remove_unregisters() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;

        bot.dispatch(&moderator_message("sam", "!mapping add lurk {user} is lurking")).await;
        bot.dispatch(&moderator_message("sam", "!mapping remove lurk")).await;

        assert_eq!(
            bot.dispatch(&message("ari", "!lurk")).await,
            DispatchOutcome::Unknown("lurk".into())
        );
        assert!(bot.storage().list_mappings().await.unwrap().is_empty());
        assert_eq!(transport.sent().await[1], "@sam removed mapping lurk");
    }

    #[tokio::test]
    async fn test_remove_missing() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;

        bot.dispatch(&moderator_message("sam", "!counter remove help")).await;
        assert_eq!(transport.sent().await, vec!["@sam there is no counter named help".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_keeps_builtin_with_same_name() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;
        // A mapping stored under a name a built-in command later took over
        bot.storage().create_mapping("timer", "old reminder").await.unwrap();

        bot.dispatch(&moderator_message("sam", "!mapping remove timer")).await;

        assert!(bot.storage().list_mappings().await.unwrap().is_empty());
        assert_eq!(bot.handler_kind("timer").await, Some(HandlerKind::Builtin));
        assert_eq!(transport.sent().await, vec!["@sam removed mapping timer".to_string()]);
    }

    #[tokio::test]
    async fn test_overlong_texts_rejected() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;
        let long = "x".repeat(MAX_MESSAGE_LEN + 1);

        bot.dispatch(&moderator_message("sam", &format!("!timer add spam 1m {}", long))).await;
        bot.dispatch(&moderator_message("sam", &format!("!mapping add spam {}", long))).await;

        assert!(bot.storage().list_timers().await.unwrap().is_empty());
        assert!(bot.storage().list_mappings().await.unwrap().is_empty());
        assert!(!bot.handler_exists("spam").await);
        assert_eq!(
            transport.sent().await,
            vec![
                "@sam timer text must be 1-512 bytes".to_string(),
                "@sam mapping text must be 1-512 bytes".into(),
            ]
        );
    }

    #[tokio::test]
    async fn test_timer_add_and_remove() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;

        bot.dispatch(&moderator_message("sam", "!timer add water 30m Drink some water")).await;
        let timer = bot.storage().retrieve_timer("water").await.unwrap();
        assert_eq!(timer.interval, Duration::from_secs(30 * 60));
        assert_eq!(timer.message, "Drink some water");

        bot.dispatch(&moderator_message("sam", "!timer add water 5m again")).await;
        bot.dispatch(&moderator_message("sam", "!timer remove water")).await;
        assert!(bot.storage().list_timers().await.unwrap().is_empty());

        assert_eq!(
            transport.sent().await,
            vec![
                "@sam timer water will post every 30m".to_string(),
                "@sam timer water already exists".into(),
                "@sam removed timer water".into(),
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_arguments_reply_usage() {
        let (bot, transport) = test_bot().await;
        register_admin_handlers(&bot).await;

        for line in [
            "!counter",
            "!counter add deaths lots Deaths",
            "!counter add deaths 0",
            "!counter add bad-name 0 Bad",
            "!timer add water soon Drink",
            "!timer add water 0s Drink",
            "!mapping remove a b",
        ] {
            bot.dispatch(&moderator_message("sam", line)).await;
        }

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 7);
        assert_eq!(
            sent[0],
            "@sam usage: !counter add <name> <initial> <prefix> | !counter remove <name>"
        );
        assert!(sent.iter().all(|reply| reply.starts_with("@sam usage: ")));
        assert!(bot.storage().list_counters().await.unwrap().is_empty());
        assert!(bot.storage().list_timers().await.unwrap().is_empty());
    }
}
