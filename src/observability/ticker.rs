//! Periodic stats reporting schedule.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Ticks every period, or never when disabled.
#[derive(Debug)]
pub struct StatsTicker {
    interval: Option<Interval>,
}

impl StatsTicker {
    /// `0` disables reporting.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Self { interval: None }
        } else {
            Self::every(Duration::from_secs(secs))
        }
    }

    /// First tick one full period from now. `period` must be non-zero.
    pub fn every(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Some(interval),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick. Pending forever when disabled.
    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}
