//! In-memory state store with optional JSON snapshot persistence.

use crate::error::StoreError;
use crate::storage::Storage;
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// State store backed by memory and, when opened with a path, a snapshot file.
///
/// Every mutation is applied to a copy of the state, written out, and only
/// then committed, so a failed write leaves the in-memory state unchanged.
/// Writers are serialized by the state lock.
#[derive(Clone)]
pub struct SnapshotStore {
    state: Arc<RwLock<StateSnapshot>>,
    path: Option<PathBuf>,
}

impl SnapshotStore {
    /// Create a store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(StateSnapshot::default())),
            path: None,
        }
    }

    /// Open a store persisted at `path`, loading the snapshot if one exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let state = match fs::read(&path).await {
            Ok(data) => {
                let state: StateSnapshot = serde_json::from_slice(&data)?;
                info!(
                    "Loaded state from {} ({} counters, {} mappings, {} timers)",
                    path.display(),
                    state.counters.len(),
                    state.mappings.len(),
                    state.timers.len()
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file at {}, starting empty", path.display());
                StateSnapshot::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            path: Some(path),
        })
    }

    /// Snapshot file location, if persistent.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> StateSnapshot {
        self.state.read().await.clone()
    }

    async fn persist(&self, state: &StateSnapshot) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let data = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Write atomically using temp file + rename
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, path).await?;

        debug!("Saved state to {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut StateSnapshot) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let out = apply(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(out)
    }
}

#[async_trait]
impl Storage for SnapshotStore {
    #[instrument(skip(self))]
    async fn create_counter(&self, name: &str, initial: i64, prefix: &str) -> Result<(), StoreError> {
        self.mutate(|state| {
            if let Entry::Vacant(slot) = state.counters.entry(name.to_string()) {
                slot.insert(CounterRecord {
                    value: initial,
                    prefix: prefix.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn retrieve_counter(&self, name: &str) -> Result<(i64, String), StoreError> {
        let state = self.state.read().await;
        state
            .counters
            .get(name)
            .map(|c| (c.value, c.prefix.clone()))
            .ok_or_else(|| StoreError::not_found("counter", name))
    }

    async fn update_counter(&self, name: &str, value: i64) -> Result<(), StoreError> {
        self.mutate(|state| {
            let counter = state
                .counters
                .get_mut(name)
                .ok_or_else(|| StoreError::not_found("counter", name))?;
            counter.value = value;
            Ok(())
        })
        .await
    }

    async fn increment_counter(&self, name: &str) -> Result<(i64, String), StoreError> {
        self.mutate(|state| {
            let counter = state
                .counters
                .get_mut(name)
                .ok_or_else(|| StoreError::not_found("counter", name))?;
            counter.value = counter
                .value
                .checked_add(1)
                .ok_or_else(|| StoreError::CounterOverflow(name.to_string()))?;
            Ok((counter.value, counter.prefix.clone()))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_counter(&self, name: &str) -> Result<(), StoreError> {
        self.mutate(|state| {
            state
                .counters
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("counter", name))
        })
        .await
    }

    async fn list_counters(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.state.read().await.counters.keys().cloned().collect())
    }

    #[instrument(skip(self, template))]
    async fn create_mapping(&self, name: &str, template: &str) -> Result<(), StoreError> {
        self.mutate(|state| {
            state
                .mappings
                .entry(name.to_string())
                .or_insert_with(|| template.to_string());
            Ok(())
        })
        .await
    }

    async fn retrieve_mapping(&self, name: &str) -> Result<String, StoreError> {
        let state = self.state.read().await;
        state
            .mappings
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("mapping", name))
    }

    async fn update_mapping(&self, name: &str, template: &str) -> Result<(), StoreError> {
        self.mutate(|state| {
            let current = state
                .mappings
                .get_mut(name)
                .ok_or_else(|| StoreError::not_found("mapping", name))?;
            *current = template.to_string();
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_mapping(&self, name: &str) -> Result<(), StoreError> {
        self.mutate(|state| {
            state
                .mappings
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("mapping", name))
        })
        .await
    }

    async fn list_mappings(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.state.read().await.mappings.clone())
    }

    #[instrument(skip(self, message))]
    async fn create_timer(&self, name: &str, message: &str, interval: Duration) -> Result<(), StoreError> {
        let now = Utc::now();
        self.mutate(|state| {
            state
                .timers
                .entry(name.to_string())
                .or_insert_with(|| TimerRecord::new(message, interval, now));
            Ok(())
        })
        .await
    }

    async fn retrieve_timer(&self, name: &str) -> Result<TimerRecord, StoreError> {
        let state = self.state.read().await;
        state
            .timers
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("timer", name))
    }

    async fn reset_timer(&self, name: &str, fired_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.mutate(|state| {
            let timer = state
                .timers
                .get_mut(name)
                .ok_or_else(|| StoreError::not_found("timer", name))?;
            timer.reschedule(fired_at);
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_timer(&self, name: &str) -> Result<(), StoreError> {
        self.mutate(|state| {
            state
                .timers
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("timer", name))
        })
        .await
    }

    async fn list_timers(&self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        let state = self.state.read().await;
        let mut timers: Vec<_> = state
            .timers
            .iter()
            .map(|(name, timer)| (name.clone(), timer.next_fire))
            .collect();
        timers.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(timers)
    }
}
