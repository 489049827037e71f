//! Coordinator task loops
//!
//! Two cooperating loops own the coordinator's work:
//!
//! - [`ClassifierTask`] consumes the event stream and turns each event into
//!   dirty-set marks, with a fast path handing just-finished folders
//!   straight to the scheduler.
//! - [`SchedulerTask`] drains the dirty-set on a self-throttling timer and
//!   drives the publisher, gated on someone actually watching the output.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use driftsync_core::{
    ConfigHandle, DriftsyncResult, Event, EventBus, EventKind, EventMask, FolderState,
    SummaryConfig,
};

use crate::dirty::DirtySet;
use crate::publisher::SummaryPublisher;
use crate::service::Liveness;
use crate::supervisor::shutdown_requested;

/// Event kinds that can make a folder's reported status stale
pub fn classifier_mask() -> EventMask {
    EventKind::LocalIndexUpdated
        | EventKind::RemoteIndexUpdated
        | EventKind::StateChanged
        | EventKind::RemoteDownloadProgress
        | EventKind::DeviceConnected
        | EventKind::FolderWatchStateChanged
        | EventKind::DownloadProgress
}

// ----------------------------------------------------------------------------
// Classifier Task
// ----------------------------------------------------------------------------

/// Maps engine events to dirty-set mutations
pub struct ClassifierTask {
    bus: EventBus,
    cfg: ConfigHandle,
    dirty: Arc<DirtySet>,
    immediate: mpsc::Sender<String>,
    shutdown: watch::Receiver<bool>,
}

impl ClassifierTask {
    pub fn new(
        bus: EventBus,
        cfg: ConfigHandle,
        dirty: Arc<DirtySet>,
        immediate: mpsc::Sender<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            bus,
            cfg,
            dirty,
            immediate,
            shutdown,
        }
    }

    pub async fn run(mut self) -> DriftsyncResult<()> {
        info!("classifier task starting");

        let mut sub = self.bus.subscribe(classifier_mask());

        // This loop needs to stay fast so the subscription does not lag
        loop {
            tokio::select! {
                event = sub.recv() => match event {
                    Some(event) => self.classify(event),
                    None => {
                        debug!("event bus closed, stopping classifier");
                        break;
                    }
                },
                _ = shutdown_requested(&mut self.shutdown) => break,
            }
        }

        info!("classifier task stopped");
        Ok(())
    }

    /// Record which folders an event makes stale. Pure set mutation; no
    /// computation or I/O happens here.
    fn classify(&self, event: Event) {
        match event {
            Event::DeviceConnected { device } => {
                // A newly reachable peer may need fresh completion data for
                // every folder shared with it
                for folder in self.cfg.folders() {
                    if folder.shared_with(&device) {
                        self.dirty.mark(&folder.id);
                    }
                }
            }

            Event::DownloadProgress { folders } => {
                self.dirty.mark_all(folders);
            }

            Event::StateChanged { folder, from, to } => {
                if to != FolderState::Idle {
                    return;
                }
                if from != FolderState::Syncing && from != FolderState::SyncPreparing {
                    return;
                }

                // A sync run just finished. Hand the folder straight to the
                // scheduler when it is ready to receive; otherwise fall back
                // to the normal mark. The send must never block this loop.
                match self.immediate.try_send(folder.clone()) {
                    Ok(()) => {
                        self.dirty.unmark(&folder);
                    }
                    Err(_) => {
                        // Refresh whenever the next drain happens
                        self.dirty.mark(&folder);
                    }
                }
            }

            Event::LocalIndexUpdated { folder, .. }
            | Event::RemoteIndexUpdated { folder, .. }
            | Event::RemoteDownloadProgress { folder, .. }
            | Event::FolderWatchStateChanged { folder, .. } => {
                self.dirty.mark(&folder);
            }

            other => {
                trace!(kind = ?other.kind(), "ignoring event");
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Scheduler Task
// ----------------------------------------------------------------------------

/// Drains the dirty-set on a self-throttling timer and drives the publisher
pub struct SchedulerTask {
    publisher: Arc<SummaryPublisher>,
    dirty: Arc<DirtySet>,
    liveness: Arc<Liveness>,
    immediate: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
    pump_interval: Duration,
    liveness_window: Duration,
    shutdown: watch::Receiver<bool>,
}

impl SchedulerTask {
    pub fn new(
        publisher: Arc<SummaryPublisher>,
        dirty: Arc<DirtySet>,
        liveness: Arc<Liveness>,
        immediate: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
        config: &SummaryConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            publisher,
            dirty,
            liveness,
            immediate,
            pump_interval: config.pump_interval,
            liveness_window: config.liveness_window,
            shutdown,
        }
    }

    pub async fn run(mut self) -> DriftsyncResult<()> {
        info!("scheduler task starting");

        let immediate = Arc::clone(&self.immediate);
        let mut immediate = immediate.lock().await;

        let pump = tokio::time::sleep(self.pump_interval);
        tokio::pin!(pump);

        loop {
            tokio::select! {
                _ = &mut pump => {
                    let started = Instant::now();
                    for folder in self.folders_to_handle() {
                        self.publisher.publish(&folder).await;
                    }

                    // Cap summary work at roughly a third of the duty
                    // cycle: the longer this batch ran, the longer the wait
                    // before the next one
                    let wait = 2 * started.elapsed() + self.pump_interval;
                    pump.as_mut().reset(Instant::now() + wait);
                }

                folder = immediate.recv() => match folder {
                    // Idle-transition fast path: publish now, skip the
                    // liveness gate, leave the timer alone
                    Some(folder) => self.publisher.publish(&folder).await,
                    None => {
                        debug!("immediate channel closed, stopping scheduler");
                        break;
                    }
                },

                _ = shutdown_requested(&mut self.shutdown) => break,
            }
        }

        info!("scheduler task stopped");
        Ok(())
    }

    /// Folders due for recomputation this tick.
    ///
    /// While no consumer has polled recently the drain still happens, but
    /// the entries are dropped instead of published, bounding the set.
    fn folders_to_handle(&self) -> Vec<String> {
        if !self.liveness.active(self.liveness_window) {
            let dropped = self.dirty.drain();
            if !dropped.is_empty() {
                debug!(
                    count = dropped.len(),
                    "nobody listening for events, dropping dirty folders"
                );
            }
            return Vec::new();
        }
        self.dirty.drain()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use driftsync_core::{BusConfig, Config, DeviceId, FolderConfig};

    fn task_with(
        folders: Vec<FolderConfig>,
        immediate_capacity: usize,
    ) -> (ClassifierTask, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(immediate_capacity);
        // The sender side may drop; these tests drive classify() directly
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = ClassifierTask::new(
            EventBus::new(&BusConfig::testing()),
            ConfigHandle::new(Config { folders }),
            Arc::new(DirtySet::new()),
            tx,
            shutdown_rx,
        );
        (task, rx)
    }

    fn device(seed: u8) -> DeviceId {
        DeviceId::from_bytes(&[seed])
    }

    fn shared_folder(id: &str, devices: &[DeviceId]) -> FolderConfig {
        FolderConfig {
            id: id.to_string(),
            devices: devices.to_vec(),
            ..FolderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_index_updates_mark_folder() {
        let (task, _rx) = task_with(Vec::new(), 1);

        task.classify(Event::LocalIndexUpdated {
            folder: "docs".to_string(),
            items: 1,
        });
        task.classify(Event::RemoteIndexUpdated {
            folder: "docs".to_string(),
            device: device(1),
            items: 3,
        });

        assert_eq!(task.dirty.drain(), vec!["docs".to_string()]);
    }

    #[tokio::test]
    async fn test_device_connected_marks_shared_folders() {
        let peer = device(1);
        let (task, _rx) = task_with(
            vec![
                shared_folder("docs", &[peer, device(9)]),
                shared_folder("music", &[device(9)]),
                shared_folder("photos", &[peer]),
            ],
            1,
        );

        task.classify(Event::DeviceConnected { device: peer });

        let mut dirty = task.dirty.drain();
        dirty.sort();
        assert_eq!(dirty, vec!["docs".to_string(), "photos".to_string()]);
    }

    #[tokio::test]
    async fn test_download_progress_marks_all_keyed_folders() {
        let (task, _rx) = task_with(Vec::new(), 1);

        task.classify(Event::DownloadProgress {
            folders: vec!["docs".to_string(), "music".to_string()],
        });

        assert_eq!(task.dirty.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_transition_uses_immediate_channel() {
        let (task, mut rx) = task_with(Vec::new(), 1);
        task.dirty.mark("docs");

        task.classify(Event::StateChanged {
            folder: "docs".to_string(),
            from: FolderState::Syncing,
            to: FolderState::Idle,
        });

        // Handed off out of band, and no longer pending a drain
        assert_eq!(rx.try_recv().unwrap(), "docs");
        assert!(task.dirty.is_empty());
    }

    #[tokio::test]
    async fn test_idle_transition_falls_back_when_channel_full() {
        let (task, mut rx) = task_with(Vec::new(), 1);

        // Fill the single slot so the next send misses
        task.immediate.try_send("music".to_string()).unwrap();

        task.classify(Event::StateChanged {
            folder: "docs".to_string(),
            from: FolderState::SyncPreparing,
            to: FolderState::Idle,
        });

        assert_eq!(rx.try_recv().unwrap(), "music");
        assert_eq!(task.dirty.drain(), vec!["docs".to_string()]);
    }

    #[tokio::test]
    async fn test_other_state_transitions_are_ignored() {
        let (task, mut rx) = task_with(Vec::new(), 1);

        task.classify(Event::StateChanged {
            folder: "docs".to_string(),
            from: FolderState::Scanning,
            to: FolderState::Idle,
        });
        task.classify(Event::StateChanged {
            folder: "docs".to_string(),
            from: FolderState::Idle,
            to: FolderState::Syncing,
        });

        assert!(rx.try_recv().is_err());
        assert!(task.dirty.is_empty());
    }

    #[tokio::test]
    async fn test_unwatched_kinds_are_ignored() {
        let (task, _rx) = task_with(Vec::new(), 1);

        task.classify(Event::DeviceDisconnected { device: device(1) });

        assert!(task.dirty.is_empty());
    }
}
