//! Endpoint reachability monitor: HTTP GETs and TCP connects

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{FunctionalConfig, HttpCheckConfig, TcpCheckConfig};
use crate::io::{HttpClient, TcpConnector};
use crate::monitor::{CheckReport, Monitor};

pub const TCP_TIMEOUT: Duration = Duration::from_secs(3);

/// Alerts when an HTTP endpoint errors or a TCP port refuses connections
pub struct FunctionalMonitor {
    http_checks: Vec<HttpCheckConfig>,
    tcp_checks: Vec<TcpCheckConfig>,
    http: Arc<dyn HttpClient>,
    tcp: Arc<dyn TcpConnector>,
}

impl std::fmt::Debug for FunctionalMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionalMonitor")
            .field("http_checks", &self.http_checks.len())
            .field("tcp_checks", &self.tcp_checks.len())
            .finish()
    }
}

impl FunctionalMonitor {
    pub fn new(
        config: &FunctionalConfig,
        http: Arc<dyn HttpClient>,
        tcp: Arc<dyn TcpConnector>,
    ) -> Self {
        Self {
            http_checks: config.http_checks.clone(),
            tcp_checks: config.tcp_checks.clone(),
            http,
            tcp,
        }
    }

    async fn check_http(&self, check: &HttpCheckConfig) -> CheckReport {
        let check_id = format!("http_{}", check.name);
        match self.http.get(&check.url, check.timeout()).await {
            Ok(response) if response.status >= 400 => CheckReport::unhealthy(
                check_id,
                "HTTP Check Failed",
                format!("{} returned {}", check.name, response.status),
            ),
            Ok(_) => CheckReport::healthy(check_id),
            Err(e) => CheckReport::unhealthy(
                check_id,
                "HTTP Check Unreachable",
                format!("{} unreachable: {}", check.name, e),
            ),
        }
    }

    async fn check_tcp(&self, check: &TcpCheckConfig) -> CheckReport {
        let check_id = format!("tcp_{}", check.name);
        match self.tcp.connect(&check.host, check.port, TCP_TIMEOUT).await {
            Ok(()) => CheckReport::healthy(check_id),
            Err(e) => {
                tracing::debug!(
                    "TCP check '{}' ({}:{}) failed: {}",
                    check.name,
                    check.host,
                    check.port,
                    e
                );
                CheckReport::unhealthy(
                    check_id,
                    "TCP Check Failed",
                    format!(
                        "Cannot connect to {} ({}:{})",
                        check.name, check.host, check.port
                    ),
                )
            }
        }
    }
}

#[async_trait]
impl Monitor for FunctionalMonitor {
    fn name(&self) -> &str {
        "functional"
    }

    async fn check(&self) -> crate::Result<Vec<CheckReport>> {
        let mut reports = Vec::with_capacity(self.http_checks.len() + self.tcp_checks.len());
        for check in &self.http_checks {
            reports.push(self.check_http(check).await);
        }
        for check in &self.tcp_checks {
            reports.push(self.check_tcp(check).await);
        }
        Ok(reports)
    }
}
