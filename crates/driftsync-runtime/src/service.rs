//! Folder summary service facade
//!
//! Owns the coordinator's shared state and the two supervised task loops,
//! and exposes the outward lifecycle: start, stop, on-demand summaries,
//! and the consumer liveness signal.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::info;

use driftsync_core::{
    ConfigHandle, DeviceId, DriftsyncError, DriftsyncResult, EventBus, FolderSummary, Model,
    SummaryConfig,
};

use crate::dirty::DirtySet;
use crate::publisher::SummaryPublisher;
use crate::supervisor::Supervised;
use crate::tasks::{ClassifierTask, SchedulerTask};

// ----------------------------------------------------------------------------
// Liveness
// ----------------------------------------------------------------------------

/// Time of the most recent external consumer poll
#[derive(Debug, Default)]
pub struct Liveness {
    last: Mutex<Option<Instant>>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a consumer polled just now
    pub fn touch(&self) {
        *self.lock() = Some(Instant::now());
    }

    /// Whether a consumer polled within the window
    pub fn active(&self, window: Duration) -> bool {
        match *self.lock() {
            Some(last) => last.elapsed() <= window,
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ----------------------------------------------------------------------------
// Folder Summary Service
// ----------------------------------------------------------------------------

/// Event-driven coordinator publishing folder summaries and per-device
/// completion onto the event bus, rate-limited by its own runtime cost.
///
/// Each instance owns its dirty-set and liveness state, so independent
/// instances can coexist under test.
pub struct FolderSummaryService {
    cfg: ConfigHandle,
    bus: EventBus,
    config: SummaryConfig,

    dirty: Arc<DirtySet>,
    liveness: Arc<Liveness>,
    publisher: Arc<SummaryPublisher>,

    immediate_tx: mpsc::Sender<String>,
    immediate_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,

    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<Supervised>,
}

impl FolderSummaryService {
    pub fn new(cfg: ConfigHandle, model: Arc<dyn Model>, id: DeviceId, bus: EventBus) -> Self {
        Self::with_config(cfg, model, id, bus, SummaryConfig::default())
    }

    pub fn with_config(
        cfg: ConfigHandle,
        model: Arc<dyn Model>,
        id: DeviceId,
        bus: EventBus,
        config: SummaryConfig,
    ) -> Self {
        // Single slot: the classifier's fast path either hands off right
        // now or falls back to the dirty-set
        let (immediate_tx, immediate_rx) = mpsc::channel(1);
        let (shutdown_tx, _) = watch::channel(false);
        let publisher = Arc::new(SummaryPublisher::new(cfg.clone(), model, id, bus.clone()));

        Self {
            cfg,
            bus,
            config,
            dirty: Arc::new(DirtySet::new()),
            liveness: Arc::new(Liveness::new()),
            publisher,
            immediate_tx,
            immediate_rx: Arc::new(tokio::sync::Mutex::new(immediate_rx)),
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// On-demand summary computation, outside the periodic loop
    pub async fn summary(&self, folder: &str) -> DriftsyncResult<FolderSummary> {
        self.publisher.summary(folder).await
    }

    /// Record that an external consumer is watching published events.
    /// Scheduled publishing stays suppressed until this has been called
    /// within the configured liveness window.
    pub fn on_event_request(&self) {
        self.liveness.touch();
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Spawn the classifier and scheduler loops under supervision
    pub fn start(&mut self) -> DriftsyncResult<()> {
        if self.is_running() {
            return Err(DriftsyncError::service("summary service already started"));
        }
        info!("starting folder summary service");

        let classifier = {
            let bus = self.bus.clone();
            let cfg = self.cfg.clone();
            let dirty = Arc::clone(&self.dirty);
            let immediate = self.immediate_tx.clone();
            let shutdown = self.shutdown_tx.clone();
            Supervised::spawn(
                "summary-classifier",
                self.config.restart_backoff,
                self.shutdown_tx.subscribe(),
                move || {
                    ClassifierTask::new(
                        bus.clone(),
                        cfg.clone(),
                        Arc::clone(&dirty),
                        immediate.clone(),
                        shutdown.subscribe(),
                    )
                    .run()
                },
            )
        };

        let scheduler = {
            let publisher = Arc::clone(&self.publisher);
            let dirty = Arc::clone(&self.dirty);
            let liveness = Arc::clone(&self.liveness);
            let immediate = Arc::clone(&self.immediate_rx);
            let config = self.config.clone();
            let shutdown = self.shutdown_tx.clone();
            Supervised::spawn(
                "summary-scheduler",
                self.config.restart_backoff,
                self.shutdown_tx.subscribe(),
                move || {
                    SchedulerTask::new(
                        Arc::clone(&publisher),
                        Arc::clone(&dirty),
                        Arc::clone(&liveness),
                        Arc::clone(&immediate),
                        &config,
                        shutdown.subscribe(),
                    )
                    .run()
                },
            )
        };

        self.tasks.push(classifier);
        self.tasks.push(scheduler);
        Ok(())
    }

    /// Request shutdown and wait for both loops to stop. Folders still
    /// dirty are dropped; their next event re-marks them.
    pub async fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        info!("stopping folder summary service");
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.drain(..) {
            task.stop().await;
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
