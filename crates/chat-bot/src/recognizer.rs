//! Command recognition in ordinary chat lines.

use crate::error::AppResult;
use regex::Regex;

/// A command invocation found in a chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    /// Everything after the name, trimmed. May be empty.
    pub args: String,
}

/// Finds `<trigger><word> [args]` anywhere in a line.
#[derive(Debug, Clone)]
pub struct Recognizer {
    trigger: char,
    pattern: Regex,
}

impl Recognizer {
    pub fn new(trigger: char) -> AppResult<Self> {
        let pattern = Regex::new(&format!(
            r"{}(?P<command>\w+)(?:\s+(?P<args>.+))?",
            regex::escape(trigger.encode_utf8(&mut [0; 4]))
        ))?;
        Ok(Self { trigger, pattern })
    }

    pub fn trigger(&self) -> char {
        self.trigger
    }

    /// Whether the line carries a command at all.
    pub fn contains_command(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    /// Extract the first command in the line, or `None` for ordinary chat.
    pub fn recognize(&self, line: &str) -> Option<Command> {
        let caps = self.pattern.captures(line)?;
        let name = caps.name("command")?.as_str().to_string();
        let args = caps
            .name("args")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Some(Command { name, args })
    }
}
