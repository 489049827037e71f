//! Error types for the driftsync coordinator
//!
//! This module contains the error types used throughout the crate: the
//! errors surfaced by the sync engine's query interface, and the main
//! DriftsyncError type that unifies them with the coordinator's own
//! failure modes.

// ----------------------------------------------------------------------------
// Model Query Errors
// ----------------------------------------------------------------------------

/// Errors surfaced by the sync engine's query interface
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The folder exists but is administratively paused. Size aggregates
    /// can still be read from the database in this state.
    #[error("folder is paused")]
    FolderPaused,
    /// The folder exists but its runner has not started yet. Size
    /// aggregates can still be read from the database in this state.
    #[error("folder is not running")]
    FolderNotRunning,
    #[error("no such folder {folder:?}")]
    FolderMissing { folder: String },
    #[error("database error: {message}")]
    Database { message: String },
}

impl ModelError {
    pub fn folder_missing(folder: impl Into<String>) -> Self {
        Self::FolderMissing {
            folder: folder.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Result type alias using DriftsyncError
pub type DriftsyncResult<T> = Result<T, DriftsyncError>;

/// Top-level error type for coordinator operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriftsyncError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid device id: {message}")]
    InvalidDeviceId { message: String },
    #[error("service error: {message}")]
    Service { message: String },
}

impl DriftsyncError {
    pub fn invalid_device_id(message: impl Into<String>) -> Self {
        Self::InvalidDeviceId {
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
