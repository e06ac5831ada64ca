//! Recurring reminders.
//!
//! The scheduler wakes on a fixed tick, fires every timer whose `next_fire`
//! has passed and moves it one interval past the firing time. Reminders are
//! suppressed while the channel is idle: the [`ActivityGate`] closes once no
//! chat from anyone but the bot has been seen for the activity window, and
//! reopens on the next such message.

use crate::bot::Bot;
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

struct ActivityState {
    active: bool,
    last_seen: DateTime<Utc>,
}

/// Global on/off switch for timers, driven by channel activity.
pub struct ActivityGate {
    window: Duration,
    state: Mutex<ActivityState>,
}

impl ActivityGate {
    /// Create an open gate, counting startup as activity.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(ActivityState {
                active: true,
                last_seen: Utc::now(),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a chat message seen at `at` and reopen the gate.
    pub async fn observe(&self, at: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        state.active = true;
        if at > state.last_seen {
            state.last_seen = at;
        }
    }

    pub async fn last_seen(&self) -> DateTime<Utc> {
        self.state.lock().await.last_seen
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    /// Decide whether timers may fire at `now`, closing the gate if the
    /// channel has been quiet for longer than the window.
    pub async fn allows_firing(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().await;
        if !state.active {
            return false;
        }

        let quiet_for = (now - state.last_seen).to_std().unwrap_or_default();
        if quiet_for > self.window {
            info!("No chat for {:?}, pausing timers", quiet_for);
            state.active = false;
            return false;
        }
        true
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The channel is idle; no timers were considered.
    Suppressed,
    Ran { fired: Vec<String>, failed: Vec<String> },
}

/// Fires due timers on a fixed cadence.
pub struct TimerScheduler {
    activity: Arc<ActivityGate>,
    tick_interval: Duration,
}

impl TimerScheduler {
    pub fn new(activity: Arc<ActivityGate>, tick_interval: Duration) -> Self {
        Self {
            activity,
            tick_interval,
        }
    }

    /// Run one tick as of `now`.
    ///
    /// A failure on one timer is logged and leaves it due, so it is retried
    /// on the next tick; the remaining timers still fire.
    #[instrument(skip(self, bot))]
    pub async fn tick(&self, bot: &dyn Bot, now: DateTime<Utc>) -> TickOutcome {
        if !self.activity.allows_firing(now).await {
            return TickOutcome::Suppressed;
        }

        let mut fired = Vec::new();
        let mut failed = Vec::new();

        let timers = match bot.storage().list_timers().await {
            Ok(timers) => timers,
            Err(e) => {
                error!("Failed to list timers: {}", e);
                return TickOutcome::Ran { fired, failed };
            }
        };

        for (name, next_fire) in timers {
            if next_fire > now {
                // Sorted soonest first, nothing further is due
                break;
            }
            match self.fire(bot, &name, now).await {
                Ok(()) => fired.push(name),
                Err(e) => {
                    error!("Failed to fire timer \"{}\": {}", name, e);
                    failed.push(name);
                }
            }
        }

        if !fired.is_empty() {
            debug!("Fired {} timers", fired.len());
        }
        TickOutcome::Ran { fired, failed }
    }

    async fn fire(&self, bot: &dyn Bot, name: &str, now: DateTime<Utc>) -> AppResult<()> {
        let timer = bot.storage().retrieve_timer(name).await?;
        bot.say(&timer.message).await?;
        bot.storage().reset_timer(name, now).await?;
        Ok(())
    }

    /// Tick forever.
    pub async fn run(&self, bot: Arc<dyn Bot>) {
        info!(
            "Starting timer scheduler, tick: {:?}, activity window: {:?}",
            self.tick_interval,
            self.activity.window()
        );

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.tick(bot.as_ref(), Utc::now()).await;
        }
    }

    /// Spawn the scheduler as a background task.
    pub fn spawn(self, bot: Arc<dyn Bot>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(bot).await;
        })
    }
}

/// Create a recurring reminder that first fires one interval from now.
pub async fn create_timer(
    bot: &dyn Bot,
    name: &str,
    message: &str,
    interval: Duration,
) -> AppResult<()> {
    bot.storage().create_timer(name, message, interval).await?;
    info!("Created timer {} every {:?}", name, interval);
    Ok(())
}
