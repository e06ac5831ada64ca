//! The persisted-state contract shared by handlers and the timer scheduler.

use crate::error::StoreError;
use crate::types::TimerRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// Durable counters, text mappings and timers, each keyed by a unique name.
///
/// `create_*` operations are insert-or-ignore: creating a name that already
/// exists leaves the stored row untouched. Every other operation on a
/// missing name fails with [`StoreError::NotFound`].
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_counter(&self, name: &str, initial: i64, prefix: &str) -> Result<(), StoreError>;

    /// Current value and display prefix.
    async fn retrieve_counter(&self, name: &str) -> Result<(i64, String), StoreError>;

    async fn update_counter(&self, name: &str, value: i64) -> Result<(), StoreError>;

    /// Add one to a counter as a single step, returning the new value and
    /// prefix. Fails with [`StoreError::CounterOverflow`] at `i64::MAX`,
    /// leaving the value unchanged.
    async fn increment_counter(&self, name: &str) -> Result<(i64, String), StoreError>;

    async fn delete_counter(&self, name: &str) -> Result<(), StoreError>;

    async fn list_counters(&self) -> Result<Vec<String>, StoreError>;

    async fn create_mapping(&self, name: &str, template: &str) -> Result<(), StoreError>;

    async fn retrieve_mapping(&self, name: &str) -> Result<String, StoreError>;

    async fn update_mapping(&self, name: &str, template: &str) -> Result<(), StoreError>;

    async fn delete_mapping(&self, name: &str) -> Result<(), StoreError>;

    async fn list_mappings(&self) -> Result<BTreeMap<String, String>, StoreError>;

    /// Create a timer whose first firing is one interval from now.
    async fn create_timer(&self, name: &str, message: &str, interval: Duration) -> Result<(), StoreError>;

    async fn retrieve_timer(&self, name: &str) -> Result<TimerRecord, StoreError>;

    /// Move `next_fire` to one interval after `fired_at`.
    async fn reset_timer(&self, name: &str, fired_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn delete_timer(&self, name: &str) -> Result<(), StoreError>;

    /// Timer names with their next firing time, soonest first.
    async fn list_timers(&self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError>;
}
