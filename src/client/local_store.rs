//! # Local Snapshot Store
//!
//! Keeps one JSON snapshot of the live [`ProgressRecord`] on disk so a
//! reload (or a crash) resumes where the participant left off.
//!
//! The snapshot is a best-effort durability aid, not the source of truth:
//! a failed save is logged and the session carries on in memory, and an
//! unreadable snapshot loads as "absent".
//!
//! ## Usage
//!
//! ```rust,no_run
//! use escape_progress::client::local_store::LocalSnapshotStore;
//! use escape_progress::shared::ProgressRecord;
//!
//! let store = LocalSnapshotStore::new("/tmp/escape-progress");
//! store.save(&ProgressRecord::with_identity("Alpha"));
//! assert!(store.load().is_some());
//! ```

use crate::shared::progress::ProgressRecord;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the snapshot inside the snapshot directory
pub const SNAPSHOT_FILE_NAME: &str = "progress.json";

#[derive(Debug, Error)]
enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Synchronous store for the single progress snapshot
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    path: PathBuf,
}

impl LocalSnapshotStore {
    /// Store keeping its snapshot in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SNAPSHOT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the snapshot with `record`. Failures are logged, never returned.
    pub fn save(&self, record: &ProgressRecord) {
        match self.try_save(record) {
            Ok(()) => tracing::debug!(
                "Saved local snapshot for '{}' to {}",
                record.identity,
                self.path.display()
            ),
            Err(e) => tracing::warn!(
                "Failed to save local snapshot to {}: {}",
                self.path.display(),
                e
            ),
        }
    }

    /// Last saved record, or `None` if there is none or it cannot be read
    pub fn load(&self) -> Option<ProgressRecord> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No local snapshot at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read local snapshot {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<ProgressRecord>(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable local snapshot {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Remove the snapshot. A missing file is not an error.
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Cleared local snapshot {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to clear local snapshot {}: {}",
                self.path.display(),
                e
            ),
        }
    }

    fn try_save(&self, record: &ProgressRecord) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(record)?;

        // Write next to the snapshot and rename so a torn write never
        // replaces the previous snapshot.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
