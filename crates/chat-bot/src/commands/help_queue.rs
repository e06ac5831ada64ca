//! Help queue command - a first-come first-served line for support requests.
//!
//! Sub-commands: `about`, `position`, `put "<message>" [paste]` and the
//! moderator-only `pop`.

use crate::bot::Bot;
use crate::commands::{CommandContext, CommandHandler};
use crate::error::AppResult;
use async_trait::async_trait;
use chat_client::MAX_MESSAGE_LEN as CHAT_MESSAGE_LEN;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

pub const MIN_MESSAGE_LEN: usize = 20;
pub const MAX_MESSAGE_LEN: usize = 120;
pub const MAX_PASTE_CODE_LEN: usize = 32;

/// A pending request for help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpRequest {
    pub username: String,
    pub message: String,
    /// Paste code, completed to a URL when the request is popped.
    pub code: Option<String>,
}

/// Ordered queue with at most one entry per user.
#[derive(Debug, Default)]
pub struct HelpQueue {
    entries: VecDeque<HelpRequest>,
}

impl HelpQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 0-based position of the user's request.
    pub fn position(&self, username: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.username.eq_ignore_ascii_case(username))
    }

    /// Append a request. Fails with the user's current position if they
    /// already have one queued.
    pub fn put(&mut self, request: HelpRequest) -> Result<usize, usize> {
        if let Some(existing) = self.position(&request.username) {
            return Err(existing);
        }
        self.entries.push_back(request);
        Ok(self.entries.len() - 1)
    }

    /// The oldest request, left in place.
    pub fn peek(&self) -> Option<&HelpRequest> {
        self.entries.front()
    }

    /// Remove the oldest request.
    pub fn pop(&mut self) -> Option<HelpRequest> {
        self.entries.pop_front()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpSubcommand {
    About,
    Position,
    Put { message: String, code: Option<String> },
    Pop,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HelpArgsError {
    #[error("unrecognized help sub-command")]
    Malformed,

    #[error("help message must be {min}-{max} characters", min = MIN_MESSAGE_LEN, max = MAX_MESSAGE_LEN)]
    InvalidMessage,
}

/// Parse the argument string of the help command.
pub fn parse_help_args(args: &str) -> Result<HelpSubcommand, HelpArgsError> {
    let args = args.trim();
    let (head, rest) = match args.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (args, ""),
    };

    match head {
        "about" if rest.is_empty() => Ok(HelpSubcommand::About),
        "position" if rest.is_empty() => Ok(HelpSubcommand::Position),
        "pop" if rest.is_empty() => Ok(HelpSubcommand::Pop),
        "put" => parse_put(rest),
        _ => Err(HelpArgsError::Malformed),
    }
}

fn parse_put(rest: &str) -> Result<HelpSubcommand, HelpArgsError> {
    let quoted = rest.strip_prefix('"').ok_or(HelpArgsError::InvalidMessage)?;
    let end = quoted.find('"').ok_or(HelpArgsError::InvalidMessage)?;

    let message = &quoted[..end];
    let trailing = quoted[end + 1..].trim();
    let code = if trailing.is_empty() {
        None
    } else {
        Some(parse_paste_code(trailing).ok_or(HelpArgsError::Malformed)?)
    };

    let len = message.chars().count();
    if !(MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&len) {
        return Err(HelpArgsError::InvalidMessage);
    }

    Ok(HelpSubcommand::Put {
        message: message.to_string(),
        code,
    })
}

/// Accept a bare paste code or a paste URL ending in one.
fn parse_paste_code(token: &str) -> Option<String> {
    if token.contains(char::is_whitespace) {
        return None;
    }

    let code = if token.contains("://") {
        token.trim_end_matches('/').rsplit('/').next()?
    } else {
        token
    };

    let valid = !code.is_empty()
        && code.len() <= MAX_PASTE_CODE_LEN
        && code.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| code.to_string())
}

pub struct HelpQueueHandler {
    command: String,
    paste_url: String,
    queue: Mutex<HelpQueue>,
}

impl HelpQueueHandler {
    /// `command` is the name the handler is registered under, used in
    /// usage replies; `paste_url` is prefixed to paste codes.
    pub fn new(command: impl Into<String>, paste_url: impl Into<String>) -> Self {
        let mut paste_url = paste_url.into();
        if !paste_url.ends_with('/') {
            paste_url.push('/');
        }
        Self {
            command: command.into(),
            paste_url,
            queue: Mutex::new(HelpQueue::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    fn about(&self, trigger: char) -> String {
        format!(
            "Need programming help? Queue up with {t}{c} put \"<your problem, {min}-{max} chars>\" [pastebin link], \
             check your spot with {t}{c} position. A moderator will call you up.",
            t = trigger,
            c = self.command,
            min = MIN_MESSAGE_LEN,
            max = MAX_MESSAGE_LEN,
        )
    }

    fn usage(&self, trigger: char, user: &str) -> String {
        format!(
            "@{} usage: {}{} <about|position|put \"message\" [pastebin link]|pop>",
            user, trigger, self.command
        )
    }

    /// Falls back to leaving out the request text when the full reply
    /// would not fit in one chat message.
    fn pop_reply(&self, moderator: &str, request: &HelpRequest) -> String {
        let link = request
            .code
            .as_ref()
            .map(|code| format!(" {}{}", self.paste_url, code))
            .unwrap_or_default();

        let full = format!(
            "@{} next up is @{}: \"{}\"{}",
            moderator, request.username, request.message, link
        );
        if full.len() <= CHAT_MESSAGE_LEN {
            return full;
        }
        format!("@{} next up is @{}{}", moderator, request.username, link)
    }
}

#[async_trait]
impl CommandHandler for HelpQueueHandler {
    async fn handle(&self, bot: &dyn Bot, ctx: &CommandContext) -> AppResult<()> {
        let user = ctx.user_name();
        let trigger = bot.trigger();

        let reply = match parse_help_args(&ctx.command.args) {
            Err(HelpArgsError::Malformed) => self.usage(trigger, user),
            Err(HelpArgsError::InvalidMessage) => format!(
                "@{} a help request needs a quoted message of {}-{} characters, see {}{} about",
                user, MIN_MESSAGE_LEN, MAX_MESSAGE_LEN, trigger, self.command
            ),
            Ok(HelpSubcommand::About) => self.about(trigger),
            Ok(HelpSubcommand::Position) => match self.queue.lock().await.position(user) {
                Some(idx) => format!("@{} you are at position {} in the help queue", user, idx),
                None => format!("@{} you are not queued", user),
            },
            Ok(HelpSubcommand::Put { message, code }) => {
                let request = HelpRequest {
                    username: user.to_string(),
                    message,
                    code,
                };
                match self.queue.lock().await.put(request) {
                    Ok(idx) => {
                        info!("Queued help request from {} at {}", user, idx);
                        format!("@{} you have been added to the help queue at position {}", user, idx)
                    }
                    Err(idx) => format!(
                        "@{} you already have a help request in the queue, please wait your turn, you are at position {}",
                        user, idx
                    ),
                }
            }
            Ok(HelpSubcommand::Pop) if !ctx.is_moderator() => {
                format!("@{} only moderators can take the next help request", user)
            }
            Ok(HelpSubcommand::Pop) => {
                let mut queue = self.queue.lock().await;
                let Some(request) = queue.peek() else {
                    drop(queue);
                    return bot.say(&format!("@{} the help queue is empty", user)).await;
                };

                // The entry leaves the queue only once the reply went out
                let reply = self.pop_reply(user, request);
                bot.say(&reply).await?;
                if let Some(request) = queue.pop() {
                    info!("{} popped help request from {}", user, request.username);
                }
                return Ok(());
            }
        };

        bot.say(&reply).await
    }
}
