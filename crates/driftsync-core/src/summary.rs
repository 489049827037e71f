//! Published record shapes
//!
//! The summary record is assembled fresh on every publish and never
//! persisted. Field names are the established wire names consumed by UIs
//! and API clients, deprecated aliases included.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::model::FolderState;

// ----------------------------------------------------------------------------
// Folder Summary Record
// ----------------------------------------------------------------------------

/// Aggregate size and state metrics for one folder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSummary {
    /// Number of entries currently failing to sync
    pub errors: usize,
    /// Deprecated alias of `errors`
    pub pull_errors: usize,
    /// Deprecated, retained for API compatibility
    pub invalid: String,

    pub global_files: i64,
    pub global_directories: i64,
    pub global_symlinks: i64,
    pub global_deleted: i64,
    pub global_bytes: i64,
    pub global_total_items: i64,

    pub local_files: i64,
    pub local_directories: i64,
    pub local_symlinks: i64,
    pub local_deleted: i64,
    pub local_bytes: i64,
    pub local_total_items: i64,

    pub need_files: i64,
    pub need_directories: i64,
    pub need_symlinks: i64,
    pub need_deletes: i64,
    /// Clamped at zero; globally needed bytes can shrink mid-pull
    pub need_bytes: i64,
    pub need_total_items: i64,

    pub in_sync_files: i64,
    pub in_sync_bytes: i64,

    /// Locally-changed counters, present only for receive-only folders
    #[serde(flatten)]
    pub receive_only: Option<ReceiveOnlyCounts>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<FolderState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_changed: Option<SystemTime>,
    /// Error text of a failed state query; the summary itself is still valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Deprecated alias of `sequence`
    pub version: i64,
    /// Sum of the local and global sequence counters
    pub sequence: i64,

    /// True when at least one effective (non-comment) ignore pattern is set
    pub ignore_patterns: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_error: Option<String>,
}

/// Extra statistics for things that have changed locally in a receive-only
/// folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveOnlyCounts {
    pub receive_only_changed_files: i64,
    pub receive_only_changed_directories: i64,
    pub receive_only_changed_symlinks: i64,
    pub receive_only_changed_deletes: i64,
    pub receive_only_changed_bytes: i64,
    pub receive_only_total_items: i64,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let summary = FolderSummary {
            errors: 2,
            pull_errors: 2,
            need_deletes: 7,
            need_bytes: 512,
            version: 9,
            sequence: 9,
            ..FolderSummary::default()
        };
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["errors"], 2);
        assert_eq!(json["pullErrors"], 2);
        assert_eq!(json["invalid"], "");
        assert_eq!(json["needDeletes"], 7);
        assert_eq!(json["needBytes"], 512);
        // Legacy and current names carry the same value
        assert_eq!(json["version"], 9);
        assert_eq!(json["sequence"], 9);
        assert_eq!(json["ignorePatterns"], false);
    }

    #[test]
    fn test_receive_only_block_flattens() {
        let mut summary = FolderSummary::default();
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("receiveOnlyChangedFiles").is_none());

        summary.receive_only = Some(ReceiveOnlyCounts {
            receive_only_changed_files: 3,
            receive_only_total_items: 4,
            ..ReceiveOnlyCounts::default()
        });
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["receiveOnlyChangedFiles"], 3);
        assert_eq!(json["receiveOnlyTotalItems"], 4);
    }

    #[test]
    fn test_optional_fields_absent_by_default() {
        let json = serde_json::to_value(FolderSummary::default()).unwrap();
        assert!(json.get("state").is_none());
        assert!(json.get("stateChanged").is_none());
        assert!(json.get("error").is_none());
        assert!(json.get("watchError").is_none());
    }

    #[test]
    fn test_state_serializes_in_wire_spelling() {
        let summary = FolderSummary {
            state: Some(FolderState::SyncPreparing),
            ..FolderSummary::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["state"], "sync-preparing");
    }
}
