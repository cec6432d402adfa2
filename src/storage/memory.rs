//! In-process storage, used by one-shot commands and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::models::ScheduleData;
use crate::storage::{SnapshotStore, StoredSnapshot};

/// Snapshot slot held in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<StoredSnapshot>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a snapshot.
    pub fn with_snapshot(data: ScheduleData, at: DateTime<Utc>) -> Self {
        Self {
            slot: Mutex::new(Some(StoredSnapshot {
                data,
                updated_at: at,
            })),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemoryStorage {
    async fn load(&self) -> Result<Option<StoredSnapshot>, StorageError> {
        self.slot
            .lock()
            .map(|slot| slot.clone())
            .map_err(|e| StorageError::read("memory", e))
    }

    async fn save(&self, data: &ScheduleData, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| StorageError::write("memory", e))?;
        *slot = Some(StoredSnapshot {
            data: data.clone(),
            updated_at: at,
        });
        Ok(())
    }
}
