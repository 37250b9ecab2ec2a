//! BDD test world for hostwatch service

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::TimeDelta;
use cucumber::World;

use hostwatch::alerter::{Alerter, Delivery};
use hostwatch::clock::ManualClock;
use hostwatch::config::WebhookConfig;
use hostwatch::docker::{ContainerInfo, ContainerRuntime};
use hostwatch::io::TcpConnector;
use hostwatch::notifier::{AlertMessage, Notifier};
use hostwatch::state_store::StateStore;
use hostwatch::system::SystemSampler;
use hostwatch::{Config, Hostwatch, HostwatchBuilder, HostwatchError, TickSummary};

pub const STATE_FILE_NAME: &str = "alert_state.json";

// --- Test doubles ---

/// A notifier that records every alert and can be switched to fail
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    failing: AtomicBool,
    sent: Mutex<Vec<AlertMessage>>,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<AlertMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn type_name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, alert: &AlertMessage) -> hostwatch::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HostwatchError::Notifier("webhook returned 500".to_string()));
        }
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// A container runtime whose containers are set by the scenario
#[derive(Debug, Default)]
pub struct FakeContainerRuntime {
    pub containers: Mutex<HashMap<String, String>>,
    pub unavailable: AtomicBool,
}

#[async_trait::async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn list_containers(&self) -> hostwatch::Result<Vec<ContainerInfo>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(HostwatchError::Probe(
                "Cannot connect to the Docker daemon".to_string(),
            ));
        }
        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .map(|(name, state)| ContainerInfo {
                name: name.clone(),
                state: state.clone(),
            })
            .collect())
    }
}

/// A sampler reporting fixed usage figures
#[derive(Debug)]
pub struct FixedSampler {
    pub disk: Mutex<f64>,
    pub memory: Mutex<f64>,
    pub cpu: Mutex<f64>,
}

impl Default for FixedSampler {
    fn default() -> Self {
        Self {
            disk: Mutex::new(10.0),
            memory: Mutex::new(10.0),
            cpu: Mutex::new(10.0),
        }
    }
}

#[async_trait::async_trait]
impl SystemSampler for FixedSampler {
    async fn disk_usage_percent(&self, _mount: &Path) -> hostwatch::Result<f64> {
        Ok(*self.disk.lock().unwrap())
    }

    async fn memory_usage_percent(&self) -> hostwatch::Result<f64> {
        Ok(*self.memory.lock().unwrap())
    }

    async fn cpu_usage_percent(&self) -> hostwatch::Result<f64> {
        Ok(*self.cpu.lock().unwrap())
    }
}

/// A TCP connector that refuses the configured ports
#[derive(Debug, Default)]
pub struct FakeTcpConnector {
    pub refused: Mutex<HashSet<u16>>,
}

#[async_trait::async_trait]
impl TcpConnector for FakeTcpConnector {
    async fn connect(&self, host: &str, port: u16, _timeout: Duration) -> hostwatch::Result<()> {
        if self.refused.lock().unwrap().contains(&port) {
            return Err(HostwatchError::Probe(format!(
                "connection to {}:{} refused",
                host, port
            )));
        }
        Ok(())
    }
}

// --- World ---

#[derive(Debug, Default, World)]
pub struct HostwatchWorld {
    pub dir: Option<tempfile::TempDir>,
    pub clock: Option<ManualClock>,
    pub notifier: Option<Arc<RecordingNotifier>>,
    pub repeat_minutes: Option<f64>,

    // Alerter scenarios
    pub alerter: Option<Alerter>,
    pub deliveries: Vec<Delivery>,

    // Scheduler scenarios
    pub config: Option<Config>,
    pub runtime: Arc<FakeContainerRuntime>,
    pub sampler: Arc<FixedSampler>,
    pub tcp: Arc<FakeTcpConnector>,
    pub hostwatch: Option<Hostwatch>,
    pub last_summary: Option<TickSummary>,
}

impl HostwatchWorld {
    pub fn state_path(&mut self) -> PathBuf {
        self.dir
            .get_or_insert_with(|| tempfile::tempdir().unwrap())
            .path()
            .join(STATE_FILE_NAME)
    }

    pub fn clock(&mut self) -> ManualClock {
        self.clock
            .get_or_insert_with(|| ManualClock::new("2024-01-01T00:00:00Z".parse().unwrap()))
            .clone()
    }

    pub fn notifier(&mut self) -> Arc<RecordingNotifier> {
        Arc::clone(
            self.notifier
                .get_or_insert_with(|| Arc::new(RecordingNotifier::default())),
        )
    }

    pub fn repeat_interval(&self) -> TimeDelta {
        WebhookConfig {
            url: String::new(),
            repeat_alert_after_minutes: self.repeat_minutes.unwrap_or(60.0),
        }
        .repeat_interval()
    }

    /// The alerter, loading persisted state on first use
    pub fn alerter(&mut self) -> &mut Alerter {
        if self.alerter.is_none() {
            let store = StateStore::new(self.state_path());
            let clock = self.clock();
            let alerter = Alerter::new(
                self.notifier(),
                store,
                self.repeat_interval(),
                Arc::new(clock),
            );
            self.alerter = Some(alerter);
        }
        self.alerter.as_mut().unwrap()
    }

    pub fn config(&mut self) -> &mut Config {
        if self.config.is_none() {
            let mut config = Config::default();
            config.webhook.url = "https://chat.example/api/webhooks/1/token".to_string();
            config.general.state_file = self.state_path();
            self.config = Some(config);
        }
        self.config.as_mut().unwrap()
    }

    /// The service, built from the scenario's configuration on first use
    pub fn hostwatch(&mut self) -> &mut Hostwatch {
        if self.hostwatch.is_none() {
            let repeat = self.repeat_minutes.unwrap_or(60.0);
            self.config().webhook.repeat_alert_after_minutes = repeat;
            let config = self.config().clone();
            let clock = self.clock();
            let hostwatch = HostwatchBuilder::new(config)
                .with_notifier(self.notifier())
                .with_clock(Arc::new(clock))
                .with_container_runtime(self.runtime.clone())
                .with_system_sampler(self.sampler.clone())
                .with_tcp_connector(self.tcp.clone())
                .build()
                .expect("hostwatch should build");
            self.hostwatch = Some(hostwatch);
        }
        self.hostwatch.as_mut().unwrap()
    }

    pub fn advance(&mut self, by: TimeDelta) {
        self.clock().advance(by);
    }
}
