//! Counter, mapping and timer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A named counter and the prefix shown when it is reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub value: i64,
    pub prefix: String,
}

/// A recurring reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub message: String,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub next_fire: DateTime<Utc>,
}

impl TimerRecord {
    /// Create a timer that first fires one interval after `now`.
    pub fn new(message: impl Into<String>, interval: Duration, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            interval,
            next_fire: advance(now, interval),
        }
    }

    /// Whether the timer should fire at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_fire <= now
    }

    /// Schedule the next firing one interval after `fired_at`.
    pub fn reschedule(&mut self, fired_at: DateTime<Utc>) {
        self.next_fire = advance(fired_at, self.interval);
    }
}

/// Everything the store owns, in the shape written to a snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub counters: BTreeMap<String, CounterRecord>,
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub timers: BTreeMap<String, TimerRecord>,
}

/// `at + interval`, saturating at the latest representable instant.
pub fn advance(at: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
