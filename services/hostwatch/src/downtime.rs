//! Grace-period tracking for flapping resources
//!
//! Tracks when each check was first seen unhealthy, independently of when
//! it was last alerted on. Entries live in memory only: restarting the
//! process during an outage restarts that outage's grace clock.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

/// Where a check stands relative to its grace period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowntimeState {
    /// No unhealthy observation is being tracked
    Healthy,
    /// Unhealthy, but not yet for longer than the grace period
    Degraded { down_for: TimeDelta },
    /// Continuously unhealthy for longer than the grace period
    AlertEligible { down_for: TimeDelta },
}

#[derive(Debug, Default)]
pub struct DowntimeTracker {
    down_since: HashMap<String, DateTime<Utc>>,
}

impl DowntimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unhealthy observation at `now` and classify it
    pub fn observe_unhealthy(
        &mut self,
        check_id: &str,
        now: DateTime<Utc>,
        grace: TimeDelta,
    ) -> DowntimeState {
        let since = *self
            .down_since
            .entry(check_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Check '{}' first observed unhealthy at {}", check_id, now);
                now
            });
        Self::classify(now - since, grace)
    }

    /// Record a healthy observation, returning whether a downtime was in progress
    pub fn observe_healthy(&mut self, check_id: &str) -> bool {
        self.down_since.remove(check_id).is_some()
    }

    /// Classify a check without recording an observation
    pub fn state(&self, check_id: &str, now: DateTime<Utc>, grace: TimeDelta) -> DowntimeState {
        match self.down_since.get(check_id) {
            None => DowntimeState::Healthy,
            Some(since) => Self::classify(now - *since, grace),
        }
    }

    pub fn down_since(&self, check_id: &str) -> Option<DateTime<Utc>> {
        self.down_since.get(check_id).copied()
    }

    pub fn tracked(&self) -> usize {
        self.down_since.len()
    }

    fn classify(down_for: TimeDelta, grace: TimeDelta) -> DowntimeState {
        if down_for > grace {
            DowntimeState::AlertEligible { down_for }
        } else {
            DowntimeState::Degraded { down_for }
        }
    }
}
