//! Engine: runs monitors on a fixed interval and routes their reports to the alerter

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;

use crate::alerter::{Alerter, Delivery};
use crate::clock::Clock;
use crate::downtime::{DowntimeState, DowntimeTracker};
use crate::monitor::{CheckReport, Health, Monitor};

/// What happened during one pass over all monitors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub monitors_run: usize,
    pub failed_monitors: Vec<String>,
    pub healthy: usize,
    pub unhealthy: usize,
    /// Unhealthy checks still inside their grace period
    pub pending_grace: usize,
    pub delivered: usize,
    pub suppressed: usize,
    pub delivery_failures: usize,
    /// Checks whose alert state was cleared by a recovery
    pub recovered: usize,
}

/// The engine owns every piece of mutable monitoring state
pub struct Engine {
    monitors: Vec<Box<dyn Monitor>>,
    alerter: Alerter,
    downtime: DowntimeTracker,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("monitors", &self.monitors)
            .field("alerter", &self.alerter)
            .field("interval", &self.interval)
            .finish()
    }
}

impl Engine {
    /// Monitors run in the order given, every tick
    pub fn new(
        monitors: Vec<Box<dyn Monitor>>,
        alerter: Alerter,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            monitors,
            alerter,
            downtime: DowntimeTracker::new(),
            clock,
            interval,
        }
    }

    pub fn alerter(&self) -> &Alerter {
        &self.alerter
    }

    pub fn downtime(&self) -> &DowntimeTracker {
        &self.downtime
    }

    pub fn monitor_names(&self) -> Vec<&str> {
        self.monitors.iter().map(|m| m.name()).collect()
    }

    /// Run ticks until the cancellation token is triggered
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!(
            "Running {} monitor(s) every {:?}",
            self.monitors.len(),
            self.interval
        );
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let summary = self.run_tick().await;
            tracing::debug!("Tick complete: {:?}", summary);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => {
                    tracing::debug!("Check loop cancelled");
                    break;
                }
            }
        }
    }

    /// Run every monitor once and apply the results
    ///
    /// A monitor that fails is logged and skipped; the rest still run.
    pub async fn run_tick(&mut self) -> TickSummary {
        let Self {
            monitors,
            alerter,
            downtime,
            clock,
            ..
        } = self;
        let mut summary = TickSummary::default();

        for monitor in monitors.iter() {
            summary.monitors_run += 1;
            let reports = match monitor.check().await {
                Ok(reports) => reports,
                Err(e) => {
                    tracing::error!("Monitor '{}' failed: {}", monitor.name(), e);
                    summary.failed_monitors.push(monitor.name().to_string());
                    continue;
                }
            };

            tracing::debug!(
                "Monitor '{}' produced {} report(s)",
                monitor.name(),
                reports.len()
            );

            let grace = monitor.grace_period();
            for report in reports {
                apply_report(
                    alerter,
                    downtime,
                    clock.now(),
                    grace,
                    report,
                    &mut summary,
                )
                .await;
            }
        }

        summary
    }
}

async fn apply_report(
    alerter: &mut Alerter,
    downtime: &mut DowntimeTracker,
    now: DateTime<Utc>,
    grace: Option<TimeDelta>,
    report: CheckReport,
    summary: &mut TickSummary,
) {
    let CheckReport { check_id, health } = report;

    let finding = match health {
        Health::Healthy => {
            summary.healthy += 1;
            if downtime.observe_healthy(&check_id) {
                tracing::info!("Check '{}' is healthy again", check_id);
            }
            if alerter.clear_state(&check_id) {
                summary.recovered += 1;
            }
            return;
        }
        Health::Unhealthy(finding) => finding,
    };

    summary.unhealthy += 1;

    if let Some(grace) = grace {
        match downtime.observe_unhealthy(&check_id, now, grace) {
            DowntimeState::Degraded { down_for } => {
                tracing::info!(
                    "Check '{}' unhealthy for {}s (grace period {}s), not alerting yet: {}",
                    check_id,
                    down_for.num_seconds(),
                    grace.num_seconds(),
                    finding.detail
                );
                summary.pending_grace += 1;
                return;
            }
            DowntimeState::AlertEligible { down_for } => {
                tracing::debug!(
                    "Check '{}' unhealthy for {}s, past grace period",
                    check_id,
                    down_for.num_seconds()
                );
            }
            DowntimeState::Healthy => {}
        }
    }

    match alerter
        .send_alert(
            &finding.title,
            &finding.detail,
            finding.level,
            Some(&check_id),
        )
        .await
    {
        Delivery::Delivered => summary.delivered += 1,
        Delivery::Suppressed => summary.suppressed += 1,
        Delivery::Failed => summary.delivery_failures += 1,
    }
}
