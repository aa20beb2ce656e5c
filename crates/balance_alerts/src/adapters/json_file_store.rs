// Rust guideline compliant 2026-10-19

//! JSON file adapter for the `StateStore` port.
//!
//! The record lives in a single file:
//!
//! ```json
//! {"last_alert_at": 1700000000.0, "current_interval_min": 60.0, "alert_count": 1}
//! ```
//!
//! Writes go to a sibling `*.tmp` file that is then renamed over the target,
//! so a crash mid-write leaves either the old or the new record on disk.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use domain::{AlertState, StateStore, StoreError};

/// `StateStore` adapter backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use the file at `path`. Missing parent directories are created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<Option<AlertState>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Unavailable { reason: e.to_string() }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt { reason: e.to_string() })
    }

    async fn save(&self, state: &AlertState) -> Result<(), StoreError> {
        let unavailable = |e: std::io::Error| StoreError::Unavailable { reason: e.to_string() };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(unavailable)?;
        }
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Unavailable { reason: e.to_string() })?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await.map_err(unavailable)?;
        tokio::fs::rename(&temp, &self.path).await.map_err(unavailable)?;
        tracing::debug!(path = %self.path.display(), "json_store.saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
