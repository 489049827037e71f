//! Query seam between the coordinator and the sync engine's data model
//!
//! The coordinator never touches file metadata or block indexes directly; it
//! reads folder-level aggregates through the [`Model`] trait and treats the
//! results as opaque. The engine side owns consistency; this side owns
//! nothing but the calls.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::types::DeviceId;

// ----------------------------------------------------------------------------
// Aggregate Counters
// ----------------------------------------------------------------------------

/// Aggregate size counters for one scope of a folder (global, local, need)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeCounts {
    pub files: i64,
    pub directories: i64,
    pub symlinks: i64,
    pub deleted: i64,
    pub bytes: i64,
}

impl SizeCounts {
    /// Total items, deletions not included
    pub fn total_items(&self) -> i64 {
        self.files + self.directories + self.symlinks
    }
}

/// Point-in-time aggregate view of one folder's database
#[derive(Debug, Clone, Default)]
pub struct FolderSnapshot {
    pub global: SizeCounts,
    pub local: SizeCounts,
    pub need: SizeCounts,
    pub receive_only_changed: SizeCounts,
    /// Highest sequence number per device, including the
    /// [`DeviceId::LOCAL`] and [`DeviceId::GLOBAL`] bookkeeping rows
    pub sequences: HashMap<DeviceId, i64>,
}

impl FolderSnapshot {
    /// Sequence number recorded for the given device, zero when absent
    pub fn sequence(&self, device: &DeviceId) -> i64 {
        self.sequences.get(device).copied().unwrap_or(0)
    }
}

// ----------------------------------------------------------------------------
// Folder State
// ----------------------------------------------------------------------------

/// Lifecycle state of a folder runner, in its wire spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderState {
    Idle,
    Scanning,
    ScanWaiting,
    SyncWaiting,
    SyncPreparing,
    Syncing,
    Cleaning,
    CleanWaiting,
    Error,
}

impl core::fmt::Display for FolderState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            FolderState::Idle => "idle",
            FolderState::Scanning => "scanning",
            FolderState::ScanWaiting => "scan-waiting",
            FolderState::SyncWaiting => "sync-waiting",
            FolderState::SyncPreparing => "sync-preparing",
            FolderState::Syncing => "syncing",
            FolderState::Cleaning => "cleaning",
            FolderState::CleanWaiting => "clean-waiting",
            FolderState::Error => "error",
        };
        write!(f, "{name}")
    }
}

// ----------------------------------------------------------------------------
// Query Result Types
// ----------------------------------------------------------------------------

/// One entry the folder's puller currently fails on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: String,
    pub message: String,
}

/// Completion aggregates of one folder for one remote device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    /// Percentage in [0, 100]
    pub completion: f64,
    pub global_bytes: i64,
    pub need_bytes: i64,
    pub global_items: i64,
    pub need_items: i64,
    pub need_deletes: i64,
    pub sequence: i64,
}

// ----------------------------------------------------------------------------
// Model Trait
// ----------------------------------------------------------------------------

/// Read-only query interface onto the sync engine's model.
///
/// All methods are point reads. The coordinator holds no locks of its own
/// while calling them, and applies no per-call timeout: a slow query delays
/// the current batch only, which the scheduler's self-throttling absorbs.
#[async_trait]
pub trait Model: Send + Sync {
    /// Aggregate database snapshot for the folder
    async fn snapshot(&self, folder: &str) -> Result<FolderSnapshot, ModelError>;

    /// Entries the folder's puller currently fails on
    async fn folder_errors(&self, folder: &str) -> Result<Vec<FileError>, ModelError>;

    /// Current folder state and the time it last changed
    async fn state(&self, folder: &str)
        -> Result<(FolderState, Option<SystemTime>), ModelError>;

    /// Bytes already completed by in-flight downloads for the folder
    async fn progress_bytes_completed(&self, folder: &str) -> i64;

    /// Whether the device currently has an active connection
    async fn is_connected(&self, device: &DeviceId) -> bool;

    /// Completion aggregates of the folder for the given remote device
    async fn completion(&self, device: &DeviceId, folder: &str) -> CompletionStats;

    /// The folder's ignore pattern lines, comments included
    async fn ignore_patterns(&self, folder: &str) -> Result<Vec<String>, ModelError>;

    /// The folder's filesystem watcher error, if any
    async fn watch_error(&self, folder: &str) -> Option<String>;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
