//! Alert deduplication and delivery
//!
//! The [`Alerter`] decides whether an alert for a check may be delivered,
//! hands it to a [`Notifier`] and records the delivery time so repeats are
//! suppressed until the repeat interval has elapsed. State is only written
//! after the notifier confirms delivery; a failed delivery leaves the check
//! eligible on the very next tick.

use std::sync::Arc;

use chrono::TimeDelta;

use crate::clock::Clock;
use crate::notifier::{AlertLevel, AlertMessage, Notifier};
use crate::state_store::{AlertState, StateStore};

/// Outcome of [`Alerter::send_alert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The check was alerted on recently; nothing was sent
    Suppressed,
    /// The notifier accepted the alert
    Delivered,
    /// The notifier failed; state was left untouched
    Failed,
}

pub struct Alerter {
    notifier: Arc<dyn Notifier>,
    store: StateStore,
    state: AlertState,
    repeat_interval: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Alerter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alerter")
            .field("notifier", &self.notifier.type_name())
            .field("state_file", &self.store.path())
            .field("suppressed_checks", &self.state.len())
            .field("repeat_interval", &self.repeat_interval)
            .finish()
    }
}

impl Alerter {
    /// Build an alerter, loading any state persisted by a previous run
    pub fn new(
        notifier: Arc<dyn Notifier>,
        store: StateStore,
        repeat_interval: TimeDelta,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = store.load();
        if !state.is_empty() {
            tracing::info!(
                "Restored alert suppression for {} check(s) from {:?}",
                state.len(),
                store.path()
            );
            for (check_id, last_alert) in state.iter() {
                tracing::debug!("Check '{}' last alerted at {}", check_id, last_alert);
            }
        }
        Self {
            notifier,
            store,
            state,
            repeat_interval,
            clock,
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn repeat_interval(&self) -> TimeDelta {
        self.repeat_interval
    }

    /// Whether an alert for `check_id` would be delivered right now
    ///
    /// Alerts without a check id are never deduplicated.
    pub fn should_alert(&self, check_id: Option<&str>) -> bool {
        let Some(check_id) = check_id.filter(|id| !id.is_empty()) else {
            return true;
        };
        match self.state.last_alert(check_id) {
            None => true,
            Some(last) => self.clock.now().naive_utc() - last > self.repeat_interval,
        }
    }

    /// Deliver an alert unless it is suppressed for `check_id`
    pub async fn send_alert(
        &mut self,
        title: &str,
        message: &str,
        level: AlertLevel,
        check_id: Option<&str>,
    ) -> Delivery {
        let check_id = check_id.filter(|id| !id.is_empty());
        if !self.should_alert(check_id) {
            tracing::debug!(
                "Suppressing alert '{}' for '{}' (within repeat interval)",
                title,
                check_id.unwrap_or_default()
            );
            return Delivery::Suppressed;
        }

        let alert = AlertMessage {
            title: title.to_string(),
            body: message.to_string(),
            level,
            check_id: check_id.map(str::to_string),
            timestamp: self.clock.now(),
        };

        if let Err(e) = self.notifier.notify(&alert).await {
            tracing::warn!(
                "Failed to deliver alert '{}' via '{}': {}",
                title,
                self.notifier.type_name(),
                e
            );
            return Delivery::Failed;
        }

        tracing::info!("Alert delivered: {}: {}", alert.display_title(), message);

        if let Some(check_id) = check_id {
            self.state.record(check_id, self.clock.now().naive_utc());
            self.persist();
        }
        Delivery::Delivered
    }

    /// Forget the last alert for `check_id` so its next failure alerts immediately
    ///
    /// Returns whether anything was cleared. Only writes the state file when it was.
    pub fn clear_state(&mut self, check_id: &str) -> bool {
        if !self.state.remove(check_id) {
            return false;
        }
        tracing::info!("Check '{}' recovered, clearing alert state", check_id);
        self.persist();
        true
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            tracing::warn!(
                "Failed to persist alert state to {:?}: {}",
                self.store.path(),
                e
            );
        }
    }
}
