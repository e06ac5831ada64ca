//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Bot identity and channel
    #[serde(default)]
    pub bot: BotConfig,

    /// Timer scheduling
    #[serde(default)]
    pub timers: TimerConfig,

    /// State persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Help queue command
    #[serde(default)]
    pub help: HelpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Display name the bot posts under. Its own lines never count as activity.
    #[serde(default = "default_username")]
    pub username: String,

    /// Channel joined at startup
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Character that introduces a command
    #[serde(default = "default_trigger")]
    pub trigger: char,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimerConfig {
    /// How often due timers are checked
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Quiet period after which timers pause
    #[serde(default = "default_activity_window", with = "humantime_serde")]
    pub activity_window: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot file. Empty keeps state in memory only.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelpConfig {
    /// Command name of the help queue
    #[serde(default = "default_help_command")]
    pub command: String,

    /// Prefix completed with a paste code when a request is popped
    #[serde(default = "default_paste_url")]
    pub paste_url: String,
}

impl StorageConfig {
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        let path = self.path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}

// Default implementations
impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            channel: default_channel(),
            trigger: default_trigger(),
            log_level: default_log_level(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            activity_window: default_activity_window(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self {
            command: default_help_command(),
            paste_url: default_paste_url(),
        }
    }
}

// Default value functions
fn default_username() -> String {
    "chat-bot".into()
}

fn default_channel() -> String {
    "lobby".into()
}

fn default_trigger() -> char {
    '!'
}

fn default_log_level() -> String {
    "info".into()
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_activity_window() -> Duration {
    Duration::from_secs(15 * 60) // 15 minutes
}

fn default_storage_path() -> String {
    "state.json".into()
}

fn default_help_command() -> String {
    "help".into()
}

fn default_paste_url() -> String {
    "https://pastebin.com/".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Keep values as strings; a trigger like "1" must not become a number.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bot.username, "chat-bot");
        assert_eq!(config.bot.trigger, '!');
        assert_eq!(config.timers.tick_interval, Duration::from_secs(1));
        assert_eq!(config.timers.activity_window, Duration::from_secs(900));
        assert_eq!(config.help.command, "help");
        assert_eq!(
            config.storage.snapshot_path(),
            Some(PathBuf::from("state.json"))
        );
    }

    #[test]
    fn test_empty_storage_path_is_in_memory() {
        let storage = StorageConfig { path: "  ".into() };
        assert_eq!(storage.snapshot_path(), None);
    }

    #[test]
    fn test_deserialize_from_strings() {
        let source = config::Config::builder()
            .set_override("bot.trigger", "?")
            .unwrap()
            .set_override("timers.activity_window", "30m")
            .unwrap()
            .set_override("storage.path", "")
            .unwrap()
            .build()
            .unwrap();

        let config: Config = source.try_deserialize().unwrap();
        assert_eq!(config.bot.trigger, '?');
        assert_eq!(config.bot.channel, "lobby");
        assert_eq!(config.timers.activity_window, Duration::from_secs(30 * 60));
        assert_eq!(config.storage.snapshot_path(), None);
    }
}
