//! Persisted alert suppression state
//!
//! The state file is a single JSON object mapping check identifiers to the
//! naive UTC timestamp of the last delivered alert:
//!
//! ```json
//! { "sys_disk": "2024-01-01T00:00:00", "docker_web": "2024-01-01T00:03:12.512" }
//! ```
//!
//! Timestamps carry no offset and are always read as UTC. A file written
//! by a tool that stored local time is therefore shifted by the host's UTC
//! offset: east of UTC its entries look newer and suppress for longer.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Last-alert time per check identifier
///
/// A key is present only while its check has been alerted on and not yet
/// cleared by a healthy observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertState {
    entries: BTreeMap<String, NaiveDateTime>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_alert(&self, check_id: &str) -> Option<NaiveDateTime> {
        self.entries.get(check_id).copied()
    }

    pub fn record(&mut self, check_id: &str, at: NaiveDateTime) {
        self.entries.insert(check_id.to_string(), at);
    }

    /// Remove a check, returning whether it was present
    pub fn remove(&mut self, check_id: &str) -> bool {
        self.entries.remove(check_id).is_some()
    }

    pub fn contains(&self, check_id: &str) -> bool {
        self.entries.contains_key(check_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NaiveDateTime)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// File-backed store for [`AlertState`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state; a missing or unreadable file yields an empty state
    pub fn load(&self) -> AlertState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No alert state at {:?}, starting empty", self.path);
                return AlertState::new();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read alert state {:?}: {}. Starting empty.",
                    self.path,
                    e
                );
                return AlertState::new();
            }
        };

        match serde_json::from_str::<AlertState>(&content) {
            Ok(state) => {
                tracing::debug!(
                    "Loaded {} alert state entries from {:?}",
                    state.len(),
                    self.path
                );
                state
            }
            Err(e) => {
                tracing::warn!(
                    "Alert state {:?} is corrupt: {}. Starting empty.",
                    self.path,
                    e
                );
                AlertState::new()
            }
        }
    }

    /// Replace the persisted state
    ///
    /// Writes a sibling temporary file and renames it over the target, so a
    /// crash mid-write leaves the previous file intact.
    pub fn save(&self, state: &AlertState) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.temp_path()?;
        let json = serde_json::to_vec(state)?;
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(
            "Saved {} alert state entries to {:?}",
            state.len(),
            self.path
        );
        Ok(())
    }

    fn temp_path(&self) -> crate::Result<PathBuf> {
        let file_name = self.path.file_name().ok_or_else(|| {
            crate::HostwatchError::State(format!("State path {:?} has no file name", self.path))
        })?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        Ok(self.path.with_file_name(tmp_name))
    }
}
