//! Hostwatch - host, container and endpoint health monitor
//!
//! Periodically checks host resources, docker containers and network
//! endpoints, and posts deduplicated alerts to a chat webhook.

pub mod alerter;
pub mod clock;
pub mod config;
pub mod docker;
pub mod downtime;
pub mod engine;
pub mod error;
pub mod functional;
pub mod io;
pub mod monitor;
pub mod notifier;
pub mod state_store;
pub mod system;
pub mod webhook;

pub use config::{load_config, Config};
pub use engine::{Engine, TickSummary};
pub use error::{HostwatchError, Result};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::alerter::Alerter;
use crate::clock::{Clock, SystemClock};
use crate::docker::{ContainerRuntime, DockerCli, DockerMonitor};
use crate::functional::FunctionalMonitor;
use crate::io::{HttpClient, ReqwestHttpClient, TcpConnector, TokioTcpConnector};
use crate::monitor::Monitor;
use crate::notifier::Notifier;
use crate::state_store::StateStore;
use crate::system::{SysinfoSampler, SystemMonitor, SystemSampler};
use crate::webhook::WebhookNotifier;

/// Assembles a [`Hostwatch`] from configuration, with optional overrides
/// for every external dependency
pub struct HostwatchBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    tcp: Option<Arc<dyn TcpConnector>>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    sampler: Option<Arc<dyn SystemSampler>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
    monitors: Option<Vec<Box<dyn Monitor>>>,
    cancel: Option<CancellationToken>,
}

impl HostwatchBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            tcp: None,
            runtime: None,
            sampler: None,
            notifier: None,
            clock: None,
            monitors: None,
            cancel: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_tcp_connector(mut self, tcp: Arc<dyn TcpConnector>) -> Self {
        self.tcp = Some(tcp);
        self
    }

    pub fn with_container_runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_system_sampler(mut self, sampler: Arc<dyn SystemSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Replace the webhook notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the monitors built from configuration
    pub fn with_monitors(mut self, monitors: Vec<Box<dyn Monitor>>) -> Self {
        self.monitors = Some(monitors);
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Validate the configuration and wire up the engine
    pub fn build(self) -> Result<Hostwatch> {
        let config = self.config;
        config.validate()?;

        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let notifier = self.notifier.unwrap_or_else(|| {
            Arc::new(WebhookNotifier::new(
                config.webhook.url.clone(),
                Arc::clone(&http),
            ))
        });

        let monitors = match self.monitors {
            Some(monitors) => monitors,
            None => {
                let sampler = self
                    .sampler
                    .unwrap_or_else(|| Arc::new(SysinfoSampler::new()));
                let mut monitors: Vec<Box<dyn Monitor>> =
                    vec![Box::new(SystemMonitor::new(&config, sampler))];

                if config.docker.containers.is_empty() {
                    tracing::debug!("No containers configured, docker monitor disabled");
                } else {
                    let runtime = self
                        .runtime
                        .unwrap_or_else(|| Arc::new(DockerCli::new()));
                    monitors.push(Box::new(DockerMonitor::new(&config, runtime)));
                }

                if config.functional.is_empty() {
                    tracing::debug!("No endpoint checks configured, functional monitor disabled");
                } else {
                    let tcp = self.tcp.unwrap_or_else(|| Arc::new(TokioTcpConnector));
                    monitors.push(Box::new(FunctionalMonitor::new(
                        &config.functional,
                        Arc::clone(&http),
                        tcp,
                    )));
                }
                monitors
            }
        };

        let alerter = Alerter::new(
            notifier,
            StateStore::new(config.general.state_file.clone()),
            config.webhook.repeat_interval(),
            Arc::clone(&clock),
        );

        let engine = Engine::new(
            monitors,
            alerter,
            clock,
            Duration::from_secs(config.general.check_interval_seconds),
        );

        Ok(Hostwatch {
            engine,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// A fully wired monitoring service
#[derive(Debug)]
pub struct Hostwatch {
    engine: Engine,
    cancel: CancellationToken,
}

impl Hostwatch {
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one pass over all monitors, keeping the service alive
    pub async fn tick(&mut self) -> TickSummary {
        self.engine.run_tick().await
    }

    /// Run a single pass over all monitors and shut down
    pub async fn run_once(mut self) -> TickSummary {
        let summary = self.tick().await;
        tracing::info!(
            "Single run complete: {} monitor(s), {} alert(s) delivered",
            summary.monitors_run,
            summary.delivered
        );
        summary
    }

    /// Run until ctrl-c or until the cancellation token is triggered
    pub async fn start(mut self) -> Result<()> {
        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => {
                    tracing::error!("Failed to listen for ctrl-c: {}", e);
                    return;
                }
            }
            cancel_for_signal.cancel();
        });

        tracing::info!(
            "Hostwatch started with monitors: {}",
            self.engine.monitor_names().join(", ")
        );
        self.engine.run(self.cancel.clone()).await;
        tracing::info!("Hostwatch stopped");

        Ok(())
    }
}
