//! Monitor trait and check result types

use std::fmt;

use async_trait::async_trait;
use chrono::TimeDelta;

use crate::notifier::AlertLevel;

/// Why a check is unhealthy, phrased for the alert
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub title: String,
    pub detail: String,
    pub level: AlertLevel,
}

/// Health of a single logical check
#[derive(Debug, Clone, PartialEq)]
pub enum Health {
    Healthy,
    Unhealthy(Finding),
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// Result of evaluating one check during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub check_id: String,
    pub health: Health,
}

impl CheckReport {
    pub fn healthy(check_id: impl Into<String>) -> Self {
        Self {
            check_id: check_id.into(),
            health: Health::Healthy,
        }
    }

    pub fn unhealthy(
        check_id: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            check_id: check_id.into(),
            health: Health::Unhealthy(Finding {
                title: title.into(),
                detail: detail.into(),
                level: AlertLevel::Error,
            }),
        }
    }

    pub fn with_level(mut self, level: AlertLevel) -> Self {
        if let Health::Unhealthy(finding) = &mut self.health {
            finding.level = level;
        }
        self
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.health {
            Health::Healthy => write!(f, "{}: healthy", self.check_id),
            Health::Unhealthy(finding) => {
                write!(f, "{}: {} ({})", self.check_id, finding.title, finding.detail)
            }
        }
    }
}

/// A group of related checks evaluated together once per tick
#[async_trait]
pub trait Monitor: Send + Sync + std::fmt::Debug {
    /// Get the monitor name
    fn name(&self) -> &str;

    /// How long a check must stay unhealthy before it may alert
    ///
    /// `None` alerts on the first unhealthy observation.
    fn grace_period(&self) -> Option<TimeDelta> {
        None
    }

    /// Evaluate every check this monitor owns
    ///
    /// An `Err` means the monitor could not evaluate anything this tick; it
    /// neither alerts nor clears any check.
    async fn check(&self) -> crate::Result<Vec<CheckReport>>;
}
