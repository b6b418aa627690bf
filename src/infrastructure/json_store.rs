//! JSON-file state store
//!
//! Durable implementation of [`StateStore`] backed by one JSON file. The
//! payload is a single small record, so a keyed document beats a database
//! here. Writes go through a temp file and rename so a crash mid-write
//! never leaves a half-written state behind.

use crate::domain::repositories::state_store::{StateStore, StoreError, StoredState};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-backed [`StateStore`]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn save(&self, state: &StoredState) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec_pretty(state).map_err(|e| StoreError::Io(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, &payload)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        debug!("order state saved to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Option<StoredState>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        match serde_json::from_str::<StoredState>(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!("discarding unreadable state file {}: {e}", self.path.display());
                let _ = tokio::fs::remove_file(&self.path).await;
                Err(StoreError::Corrupt(e.to_string()))
            }
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}
