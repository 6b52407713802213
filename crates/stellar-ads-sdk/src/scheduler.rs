//! Refresh scheduler: one repeating timer that re-enters the delivery
//! cycle for every tracked slot.
//!
//! The scheduler applies no backpressure. Each tick calls
//! [`RefreshTarget::on_tick`] and moves on; if a previous cycle is still in
//! flight, both complete and the slot controller's ordering rule decides
//! which result stays on screen.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Seconds per refresh-interval unit.
const SECONDS_PER_MINUTE: u64 = 60;

/// Receives scheduler ticks.
pub trait RefreshTarget: Send + Sync {
    /// Called once per tick. Must not block; start the work and return.
    fn on_tick(&self);
}

/// Handle to a running refresh timer. Dropping it stops the timer.
#[derive(Debug)]
pub struct RefreshScheduler {
    period: Duration,
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Start ticking every `interval_minutes` minutes.
    ///
    /// The first tick fires one full interval after start.
    pub fn start(
        interval_minutes: u64,
        target: Arc<dyn RefreshTarget>,
    ) -> Result<Self, ConfigError> {
        let seconds = interval_minutes.saturating_mul(SECONDS_PER_MINUTE);
        Self::start_with_period(Duration::from_secs(seconds), target)
    }

    /// Start ticking every `period`.
    pub fn start_with_period(
        period: Duration,
        target: Arc<dyn RefreshTarget>,
    ) -> Result<Self, ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::Invalid(
                "refresh interval must be greater than zero".to_owned(),
            ));
        }
        let first = Instant::now()
            .checked_add(period)
            .ok_or_else(|| ConfigError::Invalid("refresh interval is too large".to_owned()))?;

        info!(period_secs = period.as_secs(), "auto-refresh started");
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick: u64 = 0;
            loop {
                ticker.tick().await;
                tick = tick.saturating_add(1);
                debug!(tick = tick, "refresh tick");
                target.on_tick();
            }
        });

        Ok(Self { period, task })
    }

    /// Interval between ticks.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Whether the timer task is still alive.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the timer.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.task.abort();
        debug!("auto-refresh stopped");
    }
}
