//! Chat bot engine: command recognition, handler dispatch, counters,
//! mappings, the help queue and activity-gated timers.

pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod recognizer;
pub mod registry;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use bot::{Bot, ChatBot, DispatchOutcome};
pub use error::{AppError, AppResult};
