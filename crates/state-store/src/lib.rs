//! Durable bot state: counters, text mappings and timers.
//!
//! Handlers and the timer scheduler depend only on the [`Storage`] contract.
//! [`SnapshotStore`] is the bundled backing; it keeps the state in memory and
//! can mirror it to a JSON file so it survives restarts.

mod error;
mod storage;
mod store;
mod types;

pub use error::StoreError;
pub use storage::Storage;
pub use store::SnapshotStore;
pub use types::*;
