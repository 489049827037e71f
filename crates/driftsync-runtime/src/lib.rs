//! driftsync coordinator engine
//!
//! This crate contains the folder summary coordinator of the driftsync
//! engine:
//! - `FolderSummaryService`: the facade owning state and lifecycle
//! - `ClassifierTask` / `SchedulerTask`: the two supervised loops
//! - `SummaryPublisher`: record assembly and publication
//! - A minimal restarting supervisor for the loops
//!
//! The coordinator observes the engine's event stream, tracks folders whose
//! reported status went stale, and periodically republishes summaries and
//! per-device completion, rate-limited by its own runtime cost so it can
//! never become a bottleneck for the engine. `driftsync-core` provides the
//! stable API definitions it builds on.

pub mod dirty;
pub mod publisher;
pub mod service;
pub mod supervisor;
pub mod tasks;

pub use dirty::DirtySet;
pub use publisher::SummaryPublisher;
pub use service::{FolderSummaryService, Liveness};
pub use supervisor::Supervised;
pub use tasks::{classifier_mask, ClassifierTask, SchedulerTask};

// Re-export core types for convenience
pub use driftsync_core::{
    BusConfig, CompletionStats, Config, ConfigHandle, DeviceId, DriftsyncError, DriftsyncResult,
    Event, EventBus, EventKind, EventMask, FileError, FolderConfig, FolderSnapshot, FolderState,
    FolderSummary, FolderType, Model, ModelError, ReceiveOnlyCounts, SizeCounts, Subscription,
    SummaryConfig,
};
