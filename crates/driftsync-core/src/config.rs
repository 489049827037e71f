//! Centralized configuration management
//!
//! This module consolidates the configuration structures used by the
//! coordinator: the folder registry it reads, and the tuning knobs for the
//! event bus and the summary scheduler.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::DeviceId;

// ----------------------------------------------------------------------------
// Folder Configuration
// ----------------------------------------------------------------------------

/// Synchronization mode of a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FolderType {
    #[default]
    SendReceive,
    SendOnly,
    /// Local changes are tracked separately from the globally synced state
    ReceiveOnly,
}

/// Configuration of one synchronized folder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderConfig {
    pub id: String,
    pub label: String,
    pub folder_type: FolderType,
    /// Devices the folder is shared with, the local device included
    pub devices: Vec<DeviceId>,
    /// Do not propagate deletions into this folder
    pub ignore_delete: bool,
}

impl FolderConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Whether the folder is shared with the given device
    pub fn shared_with(&self, device: &DeviceId) -> bool {
        self.devices.contains(device)
    }
}

/// The engine's folder registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub folders: Vec<FolderConfig>,
}

impl Config {
    pub fn folder(&self, id: &str) -> Option<&FolderConfig> {
        self.folders.iter().find(|folder| folder.id == id)
    }
}

/// Shared read view of the engine configuration.
///
/// Cloning is cheap. The coordinator only ever reads; `replace` exists for
/// the embedding engine and for tests.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Config>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of all configured folders
    pub fn folders(&self) -> Vec<FolderConfig> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .folders
            .clone()
    }

    /// Configuration of one folder, if it exists
    pub fn folder(&self, id: &str) -> Option<FolderConfig> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .folder(id)
            .cloned()
    }

    /// Swap in a new configuration
    pub fn replace(&self, config: Config) {
        *self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }
}

// ----------------------------------------------------------------------------
// Bus Configuration
// ----------------------------------------------------------------------------

/// Buffer sizing for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Broadcast buffer per subscriber; slow subscribers past this lag
    /// lose events rather than blocking publishers
    pub event_buffer: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { event_buffer: 128 }
    }
}

impl BusConfig {
    /// Small buffers so tests exercise lag handling quickly
    pub fn testing() -> Self {
        Self { event_buffer: 16 }
    }
}

// ----------------------------------------------------------------------------
// Summary Coordinator Configuration
// ----------------------------------------------------------------------------

/// Timing knobs for the summary coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Nominal interval between scheduled drains of the dirty-set. The
    /// effective interval stretches with each batch's own runtime.
    pub pump_interval: Duration,
    /// How recently a consumer must have polled for drains to publish
    pub liveness_window: Duration,
    /// Delay before a crashed task is restarted
    pub restart_backoff: Duration,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            pump_interval: Duration::from_secs(2),
            liveness_window: Duration::from_secs(60),
            restart_backoff: Duration::from_secs(1),
        }
    }
}

impl SummaryConfig {
    /// Short intervals for tests that drive the real timer
    pub fn testing() -> Self {
        Self {
            pump_interval: Duration::from_millis(100),
            liveness_window: Duration::from_secs(60),
            restart_backoff: Duration::from_millis(10),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn device(seed: u8) -> DeviceId {
        DeviceId::from_bytes(&[seed])
    }

    #[test]
    fn test_shared_with() {
        let mut folder = FolderConfig::new("docs");
        folder.devices = vec![device(1), device(2)];
        assert!(folder.shared_with(&device(1)));
        assert!(!folder.shared_with(&device(3)));
    }

    #[test]
    fn test_handle_lookup_and_replace() {
        let handle = ConfigHandle::new(Config {
            folders: vec![FolderConfig::new("docs")],
        });
        assert!(handle.folder("docs").is_some());
        assert!(handle.folder("music").is_none());

        handle.replace(Config {
            folders: vec![FolderConfig::new("music")],
        });
        assert!(handle.folder("docs").is_none());
        assert_eq!(handle.folders().len(), 1);
    }

    #[test]
    fn test_config_defaults() {
        let config = SummaryConfig::default();
        assert_eq!(config.pump_interval, Duration::from_secs(2));
        assert_eq!(config.liveness_window, Duration::from_secs(60));
        assert_eq!(BusConfig::default().event_buffer, 128);
    }
}
