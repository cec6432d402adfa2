//! Local filesystem storage implementation.
//!
//! Two files under the storage directory: the serialized schedule and a
//! plain-text RFC 3339 timestamp. Both are staged to temp files before
//! either is renamed into place, so a failed write leaves the previous pair
//! untouched. Commit order is schedule, then timestamp.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;
use crate::models::{ScheduleData, StorageConfig};
use crate::storage::{SnapshotStore, StoredSnapshot};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    schedule_key: String,
    updated_key: String,
}

impl LocalStorage {
    /// Create a LocalStorage rooted at the given directory with default keys.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&StorageConfig {
            dir: root_dir.into(),
            ..StorageConfig::default()
        })
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            root_dir: config.dir.clone(),
            schedule_key: config.schedule_key.clone(),
            updated_key: config.updated_key.clone(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes to a temp file next to `key`, returning its path.
    async fn stage(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.path(key);
        let fail = |e: std::io::Error| StorageError::write(key, e);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(fail)?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await.map_err(fail)?;
        file.write_all(bytes).await.map_err(fail)?;
        file.flush().await.map_err(fail)?;
        Ok(tmp)
    }

    /// Move a staged file into place.
    async fn commit(&self, key: &str, tmp: &Path) -> Result<(), StorageError> {
        tokio::fs::rename(tmp, self.path(key))
            .await
            .map_err(|e| StorageError::write(key, e))
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::read(key, e)),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load(&self) -> Result<Option<StoredSnapshot>, StorageError> {
        let Some(schedule_bytes) = self.read_bytes(&self.schedule_key).await? else {
            log::debug!("No stored schedule at {}", self.schedule_key);
            return Ok(None);
        };
        let data: ScheduleData = serde_json::from_slice(&schedule_bytes)
            .map_err(|e| StorageError::read(&self.schedule_key, e))?;

        let Some(updated_bytes) = self.read_bytes(&self.updated_key).await? else {
            log::warn!(
                "Stored schedule has no {} entry, ignoring it",
                self.updated_key
            );
            return Ok(None);
        };
        let updated_text = String::from_utf8_lossy(&updated_bytes);
        let updated_at = DateTime::parse_from_rfc3339(updated_text.trim())
            .map_err(|e| StorageError::read(&self.updated_key, e))?
            .with_timezone(&Utc);

        Ok(Some(StoredSnapshot { data, updated_at }))
    }

    async fn save(&self, data: &ScheduleData, at: DateTime<Utc>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|e| StorageError::write(&self.schedule_key, e))?;
        let stamp = at.to_rfc3339_opts(SecondsFormat::AutoSi, true);

        let schedule_tmp = self.stage(&self.schedule_key, &bytes).await?;
        let updated_tmp = match self.stage(&self.updated_key, stamp.as_bytes()).await {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = tokio::fs::remove_file(&schedule_tmp).await;
                return Err(e);
            }
        };

        self.commit(&self.schedule_key, &schedule_tmp).await?;
        self.commit(&self.updated_key, &updated_tmp).await?;

        log::debug!(
            "Saved snapshot ({} rows) to {}",
            data.queue_schedules.len(),
            self.root_dir.display()
        );
        Ok(())
    }
}
