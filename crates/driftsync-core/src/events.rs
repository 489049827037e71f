//! Typed event model and in-process event bus
//!
//! This module defines the typed event protocol. Every event kind owns a
//! fixed payload shape; consumers subscribe with a bitmask of kinds and
//! pattern-match on the variant instead of downcasting payloads.

use core::fmt;
use core::ops::BitOr;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::config::BusConfig;
use crate::model::CompletionStats;
use crate::summary::FolderSummary;
use crate::types::DeviceId;

// ----------------------------------------------------------------------------
// Event Kinds and Masks
// ----------------------------------------------------------------------------

/// Discriminant for every event the engine can emit, one bit each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum EventKind {
    LocalIndexUpdated = 1 << 0,
    RemoteIndexUpdated = 1 << 1,
    StateChanged = 1 << 2,
    RemoteDownloadProgress = 1 << 3,
    DeviceConnected = 1 << 4,
    DeviceDisconnected = 1 << 5,
    FolderWatchStateChanged = 1 << 6,
    DownloadProgress = 1 << 7,
    FolderSummary = 1 << 8,
    FolderCompletion = 1 << 9,
}

impl EventKind {
    /// The single-kind mask
    pub fn mask(self) -> EventMask {
        EventMask(self as u32)
    }
}

/// Set of event kinds, used to filter bus subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventMask(u32);

impl EventMask {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    pub fn contains(self, kind: EventKind) -> bool {
        self.0 & kind as u32 != 0
    }
}

impl From<EventKind> for EventMask {
    fn from(kind: EventKind) -> Self {
        kind.mask()
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl BitOr<EventKind> for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventKind) -> EventMask {
        EventMask(self.0 | rhs as u32)
    }
}

impl BitOr for EventKind {
    type Output = EventMask;

    fn bitor(self, rhs: EventKind) -> EventMask {
        self.mask() | rhs
    }
}

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

/// Events flowing over the engine's bus, one fixed payload per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// The local index gained changes for a folder
    LocalIndexUpdated { folder: String, items: u64 },
    /// A remote device announced index changes for a folder
    RemoteIndexUpdated {
        folder: String,
        device: DeviceId,
        items: u64,
    },
    /// A folder runner moved between lifecycle states
    StateChanged {
        folder: String,
        from: crate::model::FolderState,
        to: crate::model::FolderState,
    },
    /// A remote device reported download progress against our data
    RemoteDownloadProgress { folder: String, device: DeviceId },
    /// A device connection was established
    DeviceConnected { device: DeviceId },
    /// A device connection was lost
    DeviceDisconnected { device: DeviceId },
    /// The folder's filesystem watcher changed state
    FolderWatchStateChanged {
        folder: String,
        error: Option<String>,
    },
    /// Local download progress, keyed by the folders being pulled
    DownloadProgress { folders: Vec<String> },
    /// Published folder summary
    FolderSummary {
        folder: String,
        summary: Box<FolderSummary>,
    },
    /// Published per-device completion
    FolderCompletion {
        folder: String,
        device: DeviceId,
        completion: CompletionStats,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::LocalIndexUpdated { .. } => EventKind::LocalIndexUpdated,
            Event::RemoteIndexUpdated { .. } => EventKind::RemoteIndexUpdated,
            Event::StateChanged { .. } => EventKind::StateChanged,
            Event::RemoteDownloadProgress { .. } => EventKind::RemoteDownloadProgress,
            Event::DeviceConnected { .. } => EventKind::DeviceConnected,
            Event::DeviceDisconnected { .. } => EventKind::DeviceDisconnected,
            Event::FolderWatchStateChanged { .. } => EventKind::FolderWatchStateChanged,
            Event::DownloadProgress { .. } => EventKind::DownloadProgress,
            Event::FolderSummary { .. } => EventKind::FolderSummary,
            Event::FolderCompletion { .. } => EventKind::FolderCompletion,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind())
    }
}

// ----------------------------------------------------------------------------
// Event Bus
// ----------------------------------------------------------------------------

/// In-process broadcast bus carrying engine events to any interested task.
///
/// Publishing never blocks. A subscriber that falls more than the buffer
/// behind loses the oldest events and is told so via a lag warning.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(config: &BusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.event_buffer);
        Self { sender }
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: Event) {
        // A send with no live subscribers is not an error for the bus
        let _ = self.sender.send(event);
    }

    /// Subscribe to the kinds selected by the mask
    pub fn subscribe(&self, mask: impl Into<EventMask>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            mask: mask.into(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(&BusConfig::default())
    }
}

/// Filtered view of the bus; yields only events in the subscribed mask
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
    mask: EventMask,
}

impl Subscription {
    /// Wait for the next matching event. Returns None once the bus is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.mask.contains(event.kind()) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event subscription lagged, events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant; None when no matching event is buffered
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.mask.contains(event.kind()) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "event subscription lagged, events dropped");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
