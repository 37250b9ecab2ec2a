//! Configuration types for the hostwatch service

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when `webhook.url` is left empty
pub const WEBHOOK_URL_ENV: &str = "HOSTWATCH_WEBHOOK_URL";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, alias = "discord")]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub functional: FunctionalConfig,
}

/// Where alerts go and how often they may repeat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default, alias = "webhook_url")]
    pub url: String,
    #[serde(default = "default_repeat_minutes")]
    pub repeat_alert_after_minutes: f64,
}

impl WebhookConfig {
    pub fn repeat_interval(&self) -> TimeDelta {
        delta_from_millis(self.repeat_alert_after_minutes * 60_000.0)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            repeat_alert_after_minutes: default_repeat_minutes(),
        }
    }
}

/// Scheduler and persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_mount_path")]
    pub host_disk_mount_path: PathBuf,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
            host_disk_mount_path: default_mount_path(),
            state_file: default_state_file(),
        }
    }
}

/// Resource usage thresholds, in percent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_threshold")]
    pub disk_usage_threshold_percent: f64,
    #[serde(default = "default_threshold")]
    pub memory_usage_threshold_percent: f64,
    #[serde(default = "default_threshold")]
    pub cpu_load_threshold_percent: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            disk_usage_threshold_percent: default_threshold(),
            memory_usage_threshold_percent: default_threshold(),
            cpu_load_threshold_percent: default_threshold(),
        }
    }
}

/// Containers that must be running
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    #[serde(default)]
    pub containers: Vec<String>,
    #[serde(default = "default_grace_period")]
    pub grace_period_seconds: u64,
}

impl DockerConfig {
    pub fn grace_period(&self) -> TimeDelta {
        delta_from_secs(self.grace_period_seconds)
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            grace_period_seconds: default_grace_period(),
        }
    }
}

/// Endpoint reachability checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionalConfig {
    #[serde(default)]
    pub http_checks: Vec<HttpCheckConfig>,
    #[serde(default)]
    pub tcp_checks: Vec<TcpCheckConfig>,
}

impl FunctionalConfig {
    pub fn is_empty(&self) -> bool {
        self.http_checks.is_empty() && self.tcp_checks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpCheckConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: f64,
}

impl HttpCheckConfig {
    /// Request timeout; values `validate` would reject fall back to the default
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .ok()
            .filter(|t| !t.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_http_timeout()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpCheckConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

fn delta_from_secs(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Clamped to `0..=TimeDelta::MAX`; NaN maps to zero
fn delta_from_millis(millis: f64) -> TimeDelta {
    if millis.is_nan() || millis <= 0.0 {
        return TimeDelta::zero();
    }
    if millis >= TimeDelta::MAX.num_milliseconds() as f64 {
        return TimeDelta::MAX;
    }
    TimeDelta::try_milliseconds(millis as i64).unwrap_or(TimeDelta::MAX)
}

fn default_repeat_minutes() -> f64 {
    60.0
}

fn default_check_interval() -> u64 {
    60
}

fn default_mount_path() -> PathBuf {
    PathBuf::from("/")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("/tmp/alert_state.json")
}

fn default_threshold() -> f64 {
    90.0
}

fn default_grace_period() -> u64 {
    60
}

fn default_http_timeout() -> f64 {
    5.0
}

impl Config {
    /// Fill secrets that may be supplied through the environment
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if self.webhook.url.trim().is_empty() {
            if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
                tracing::debug!("Using webhook URL from {}", WEBHOOK_URL_ENV);
                self.webhook.url = url;
            }
        }
        Ok(())
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.webhook.url.trim().is_empty() {
            return Err(crate::HostwatchError::Config(format!(
                "webhook.url is empty and {} is not set",
                WEBHOOK_URL_ENV
            )));
        }
        if self.general.check_interval_seconds == 0 {
            return Err(crate::HostwatchError::Config(
                "general.check_interval_seconds must be greater than zero".to_string(),
            ));
        }
        let minutes = self.webhook.repeat_alert_after_minutes;
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(crate::HostwatchError::Config(format!(
                "webhook.repeat_alert_after_minutes must be a non-negative number, got {}",
                minutes
            )));
        }
        for check in &self.functional.http_checks {
            if !check.timeout_seconds.is_finite() || check.timeout_seconds <= 0.0 {
                return Err(crate::HostwatchError::Config(format!(
                    "functional.http_checks '{}': timeout_seconds must be a positive number, got {}",
                    check.name, check.timeout_seconds
                )));
            }
        }
        let thresholds = [
            (
                "disk_usage_threshold_percent",
                self.system.disk_usage_threshold_percent,
            ),
            (
                "memory_usage_threshold_percent",
                self.system.memory_usage_threshold_percent,
            ),
            (
                "cpu_load_threshold_percent",
                self.system.cpu_load_threshold_percent,
            ),
        ];
        for (name, value) in thresholds {
            if !(0.0..=100.0).contains(&value) {
                return Err(crate::HostwatchError::Config(format!(
                    "system.{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::HostwatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
