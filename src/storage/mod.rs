//! Snapshot persistence.
//!
//! A single slot holds the last accepted schedule and the time it was
//! accepted. Every save replaces the slot wholesale.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml          # Watcher configuration
//! ├── last_schedule.json   # Last accepted ScheduleData
//! └── last_update          # ISO-8601 timestamp of that acceptance
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::models::ScheduleData;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// The last accepted schedule and when it was accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub data: ScheduleData,
    pub updated_at: DateTime<Utc>,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the slot. `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<StoredSnapshot>, StorageError>;

    /// Replace the slot.
    async fn save(&self, data: &ScheduleData, at: DateTime<Utc>) -> Result<(), StorageError>;
}
