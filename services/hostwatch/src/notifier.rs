//! Alert messages and the trait for delivering them

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Error,
    Warning,
}

impl AlertLevel {
    /// Embed color: red for errors, yellow for everything else
    pub fn color(self) -> u32 {
        match self {
            AlertLevel::Error => 15_158_332,
            AlertLevel::Warning => 16_776_960,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Error => "error",
            AlertLevel::Warning => "warning",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert on its way to a notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    pub level: AlertLevel,
    pub check_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AlertMessage {
    /// Title as shown to humans, prefixed with the level, e.g. `[ERROR] Disk Usage High`
    pub fn display_title(&self) -> String {
        format!("[{}] {}", self.level.as_str().to_uppercase(), self.title)
    }
}

/// Trait for sending alerts
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "webhook")
    fn type_name(&self) -> &str;

    /// Deliver an alert; `Ok` means the sink confirmed receipt
    async fn notify(&self, alert: &AlertMessage) -> crate::Result<()>;
}
