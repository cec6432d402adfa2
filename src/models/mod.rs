// src/models/mod.rs

//! Domain models for the schedule watcher.

mod config;
mod schedule;

// Re-export all public types
pub use config::{
    AlternativePath, Config, FetcherConfig, LoggingConfig, NotifierBackend, NotifierConfig,
    ParserConfig, ServerConfig, StorageConfig, WatchConfig,
};
pub use schedule::{HALF_HOURS_PER_DAY, LightStatus, QueueSchedule, ScheduleData, TimeSlot};
