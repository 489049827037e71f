//! Folder summary assembly and publication
//!
//! Reads folder aggregates through the model seam, shapes them into the
//! published record, and emits the summary followed by per-device
//! completion for every connected remote sharing the folder.

use std::sync::Arc;

use tracing::debug;

use driftsync_core::{
    ConfigHandle, DeviceId, DriftsyncResult, Event, EventBus, FolderSummary, FolderType, Model,
    ModelError, ReceiveOnlyCounts,
};

// ----------------------------------------------------------------------------
// Summary Publisher
// ----------------------------------------------------------------------------

/// Computes summary and completion records one folder at a time.
///
/// The scheduler invokes this strictly serially, so at most one summary
/// computation runs against the model per coordinator.
pub struct SummaryPublisher {
    cfg: ConfigHandle,
    model: Arc<dyn Model>,
    id: DeviceId,
    bus: EventBus,
}

impl SummaryPublisher {
    pub fn new(cfg: ConfigHandle, model: Arc<dyn Model>, id: DeviceId, bus: EventBus) -> Self {
        Self { cfg, model, id, bus }
    }

    /// Assemble the summary record for one folder.
    ///
    /// A failing size or error-list query aborts the record (the database
    /// data cannot be trusted); a failing state query only annotates it.
    pub async fn summary(&self, folder: &str) -> DriftsyncResult<FolderSummary> {
        let snapshot = self.model.snapshot(folder).await?;

        let errors = match self.model.folder_errors(folder).await {
            Ok(errors) => errors.len(),
            // Size data is still usable while the folder is merely paused
            // or not yet running
            Err(ModelError::FolderPaused) | Err(ModelError::FolderNotRunning) => 0,
            Err(e) => return Err(e.into()),
        };

        let mut summary = FolderSummary {
            errors,
            pull_errors: errors,
            ..FolderSummary::default()
        };

        let global = snapshot.global;
        summary.global_files = global.files;
        summary.global_directories = global.directories;
        summary.global_symlinks = global.symlinks;
        summary.global_deleted = global.deleted;
        summary.global_bytes = global.bytes;
        summary.global_total_items = global.total_items();

        let local = snapshot.local;
        summary.local_files = local.files;
        summary.local_directories = local.directories;
        summary.local_symlinks = local.symlinks;
        summary.local_deleted = local.deleted;
        summary.local_bytes = local.bytes;
        summary.local_total_items = local.total_items();

        let mut need = snapshot.need;
        need.bytes -= self.model.progress_bytes_completed(folder).await;
        // Globally needed bytes can shrink while a pull is in flight, when
        // remote deletions land after the pull started
        if need.bytes < 0 {
            need.bytes = 0;
        }
        summary.need_files = need.files;
        summary.need_directories = need.directories;
        summary.need_symlinks = need.symlinks;
        summary.need_deletes = need.deleted;
        summary.need_bytes = need.bytes;
        summary.need_total_items = need.total_items();

        if let Some(fcfg) = self.cfg.folder(folder) {
            if fcfg.ignore_delete {
                summary.need_deletes = 0;
            }
            if fcfg.folder_type == FolderType::ReceiveOnly {
                let ro = snapshot.receive_only_changed;
                summary.receive_only = Some(ReceiveOnlyCounts {
                    receive_only_changed_files: ro.files,
                    receive_only_changed_directories: ro.directories,
                    receive_only_changed_symlinks: ro.symlinks,
                    receive_only_changed_deletes: ro.deleted,
                    receive_only_changed_bytes: ro.bytes,
                    receive_only_total_items: ro.total_items(),
                });
            }
        }

        summary.in_sync_files = global.files - need.files;
        summary.in_sync_bytes = global.bytes - need.bytes;

        match self.model.state(folder).await {
            Ok((state, changed)) => {
                summary.state = Some(state);
                summary.state_changed = changed;
            }
            // Status errors are informational; the summary still goes out
            Err(e) => summary.error = Some(e.to_string()),
        }

        let sequence =
            snapshot.sequence(&DeviceId::LOCAL) + snapshot.sequence(&DeviceId::GLOBAL);
        summary.version = sequence;
        summary.sequence = sequence;

        let patterns = self
            .model
            .ignore_patterns(folder)
            .await
            .unwrap_or_default();
        summary.ignore_patterns = patterns
            .iter()
            .any(|line| !line.is_empty() && !line.starts_with("//"));

        summary.watch_error = self.model.watch_error(folder).await;

        Ok(summary)
    }

    /// Publish the folder's summary, then completion for every connected
    /// remote device sharing it. The summary always goes first.
    pub async fn publish(&self, folder: &str) {
        let summary = match self.summary(folder).await {
            Ok(summary) => summary,
            Err(e) => {
                // Folder-scoped failure; the folder is re-marked by its
                // next event and the publish retried then
                debug!(folder, error = %e, "skipping folder summary");
                return;
            }
        };

        self.bus.publish(Event::FolderSummary {
            folder: folder.to_string(),
            summary: Box::new(summary),
        });

        let Some(fcfg) = self.cfg.folder(folder) else {
            return;
        };
        for device in &fcfg.devices {
            if *device == self.id {
                // We already know about ourselves
                continue;
            }
            if !self.model.is_connected(device).await {
                // Disconnected devices get fresh completion on reconnect
                continue;
            }

            let completion = self.model.completion(device, folder).await;
            self.bus.publish(Event::FolderCompletion {
                folder: folder.to_string(),
                device: *device,
                completion,
            });
        }
    }
}
