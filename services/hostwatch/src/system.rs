//! Host resource monitor: disk, memory and CPU usage

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{Disks, System};

use crate::config::Config;
use crate::monitor::{CheckReport, Monitor};

pub const DISK_CHECK_ID: &str = "sys_disk";
pub const MEMORY_CHECK_ID: &str = "sys_mem";
pub const CPU_CHECK_ID: &str = "sys_cpu";

/// Source of host resource usage figures, all in percent
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait SystemSampler: Send + Sync {
    async fn disk_usage_percent(&self, mount: &Path) -> crate::Result<f64>;

    async fn memory_usage_percent(&self) -> crate::Result<f64>;

    async fn cpu_usage_percent(&self) -> crate::Result<f64>;
}

/// Sampler backed by the `sysinfo` crate
#[derive(Debug, Clone)]
pub struct SysinfoSampler {
    cpu_window: Duration,
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self {
            cpu_window: Duration::from_secs(1).max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SystemSampler for SysinfoSampler {
    async fn disk_usage_percent(&self, mount: &Path) -> crate::Result<f64> {
        let path = tokio::fs::canonicalize(mount).await?;
        let disks = tokio::task::spawn_blocking(list_disks)
            .await
            .map_err(|e| crate::HostwatchError::Probe(format!("Disk listing failed: {}", e)))?;
        containing_mount(&disks, &path)
            .map(DiskUsage::used_percent)
            .ok_or_else(|| {
                crate::HostwatchError::Probe(format!("No mounted filesystem holds {:?}", path))
            })
    }

    async fn memory_usage_percent(&self) -> crate::Result<f64> {
        let (used, total) = tokio::task::spawn_blocking(|| {
            let mut sys = System::new();
            sys.refresh_memory();
            (sys.used_memory(), sys.total_memory())
        })
        .await
        .map_err(|e| crate::HostwatchError::Probe(format!("Memory sampling failed: {}", e)))?;
        memory_percent(used, total)
    }

    async fn cpu_usage_percent(&self) -> crate::Result<f64> {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        tokio::time::sleep(self.cpu_window).await;
        sys.refresh_cpu_usage();
        Ok(f64::from(sys.global_cpu_usage()))
    }
}

/// Capacity of one mounted filesystem, in bytes
#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total: u64,
    pub available: u64,
}

impl DiskUsage {
    pub fn used_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.total.saturating_sub(self.available) as f64 / self.total as f64 * 100.0
    }
}

fn list_disks() -> Vec<DiskUsage> {
    Disks::new_with_refreshed_list()
        .list()
        .iter()
        .map(|disk| DiskUsage {
            mount_point: disk.mount_point().to_path_buf(),
            total: disk.total_space(),
            available: disk.available_space(),
        })
        .collect()
}

/// The filesystem holding `path`, i.e. the deepest mount point it lives under
pub fn containing_mount<'a>(disks: &'a [DiskUsage], path: &Path) -> Option<&'a DiskUsage> {
    disks
        .iter()
        .filter(|disk| path.starts_with(&disk.mount_point))
        .max_by_key(|disk| disk.mount_point.components().count())
}

pub fn memory_percent(used: u64, total: u64) -> crate::Result<f64> {
    if total == 0 {
        return Err(crate::HostwatchError::Probe(
            "Total memory reported as zero".to_string(),
        ));
    }
    Ok(used.min(total) as f64 / total as f64 * 100.0)
}

/// Alerts when disk, memory or CPU usage exceeds its threshold
pub struct SystemMonitor {
    mount: PathBuf,
    disk_threshold: f64,
    memory_threshold: f64,
    cpu_threshold: f64,
    sampler: Arc<dyn SystemSampler>,
}

impl std::fmt::Debug for SystemMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemMonitor")
            .field("mount", &self.mount)
            .field("disk_threshold", &self.disk_threshold)
            .field("memory_threshold", &self.memory_threshold)
            .field("cpu_threshold", &self.cpu_threshold)
            .finish()
    }
}

impl SystemMonitor {
    pub fn new(config: &Config, sampler: Arc<dyn SystemSampler>) -> Self {
        Self {
            mount: config.general.host_disk_mount_path.clone(),
            disk_threshold: config.system.disk_usage_threshold_percent,
            memory_threshold: config.system.memory_usage_threshold_percent,
            cpu_threshold: config.system.cpu_load_threshold_percent,
            sampler,
        }
    }

    async fn check_disk(&self) -> Option<CheckReport> {
        match self.sampler.disk_usage_percent(&self.mount).await {
            Ok(percent) if percent > self.disk_threshold => Some(CheckReport::unhealthy(
                DISK_CHECK_ID,
                "Disk Usage High",
                format!("Disk usage at {:.1}% on host.", percent),
            )),
            Ok(_) => Some(CheckReport::healthy(DISK_CHECK_ID)),
            Err(crate::HostwatchError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Host mount {:?} not found, skipping disk check", self.mount);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to sample disk usage of {:?}: {}", self.mount, e);
                None
            }
        }
    }

    async fn check_memory(&self) -> Option<CheckReport> {
        match self.sampler.memory_usage_percent().await {
            Ok(percent) if percent > self.memory_threshold => Some(CheckReport::unhealthy(
                MEMORY_CHECK_ID,
                "Memory Usage High",
                format!("RAM usage at {:.1}%", percent),
            )),
            Ok(_) => Some(CheckReport::healthy(MEMORY_CHECK_ID)),
            Err(e) => {
                tracing::warn!("Failed to sample memory usage: {}", e);
                None
            }
        }
    }

    async fn check_cpu(&self) -> Option<CheckReport> {
        match self.sampler.cpu_usage_percent().await {
            Ok(percent) if percent > self.cpu_threshold => Some(CheckReport::unhealthy(
                CPU_CHECK_ID,
                "CPU Load High",
                format!("CPU usage at {:.1}%", percent),
            )),
            Ok(_) => Some(CheckReport::healthy(CPU_CHECK_ID)),
            Err(e) => {
                tracing::warn!("Failed to sample CPU usage: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Monitor for SystemMonitor {
    fn name(&self) -> &str {
        "system"
    }

    async fn check(&self) -> crate::Result<Vec<CheckReport>> {
        let reports = [
            self.check_disk().await,
            self.check_memory().await,
            self.check_cpu().await,
        ];
        Ok(reports.into_iter().flatten().collect())
    }
}
