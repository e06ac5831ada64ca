//! Chat message types.

use crate::error::ChatError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Longest message the transport will accept, in bytes.
pub const MAX_MESSAGE_LEN: usize = 512;

/// Badges that grant moderator privileges.
const MODERATOR_BADGES: [&str; 2] = ["broadcaster", "moderator"];

/// Identity of a message sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatUser {
    pub display_name: String,
    /// Badge name to badge version (e.g. `"moderator" -> "1"`).
    pub badges: BTreeMap<String, String>,
}

impl ChatUser {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            badges: BTreeMap::new(),
        }
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badges.insert(badge.into(), "1".into());
        self
    }

    /// Broadcasters and moderators may run privileged commands.
    pub fn is_moderator(&self) -> bool {
        MODERATOR_BADGES
            .iter()
            .any(|badge| self.badges.contains_key(*badge))
    }
}

/// One chat line delivered by the transport.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub user: ChatUser,
    pub channel: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(user: ChatUser, channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user,
            channel: channel.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Parse a console line of the form `name[#badge,badge]: text`.
    pub fn from_console_line(line: &str, channel: &str) -> Option<Self> {
        let (sender, text) = line.split_once(':')?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (name, badges) = match sender.trim().split_once('#') {
            Some((name, badges)) => (name.trim(), Some(badges)),
            None => (sender.trim(), None),
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }

        let mut user = ChatUser::new(name);
        for badge in badges.into_iter().flat_map(|b| b.split(',')) {
            let badge = badge.trim();
            if !badge.is_empty() {
                user = user.with_badge(badge);
            }
        }

        Some(Self::new(user, channel, text))
    }
}

/// Check an outgoing message against transport limits.
pub fn validate_outgoing(message: &str) -> Result<(), ChatError> {
    if message.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if message.len() > MAX_MESSAGE_LEN {
        return Err(ChatError::MessageTooLong {
            len: message.len(),
            max: MAX_MESSAGE_LEN,
        });
    }
    Ok(())
}
