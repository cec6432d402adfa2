//! Pipeline entry points for the schedule watcher.
//!
//! - `SchedulePipeline::run_cycle`: fetch, parse, compare, notify, persist
//! - `run_watcher`: repeat cycles on a timer with manual refresh

pub mod cycle;
pub mod diff;
pub mod watch;

pub use cycle::{CycleOutcome, CycleStatus, SchedulePipeline};
pub use diff::{QueueDiff, changed};
pub use watch::{RefreshTrigger, refresh_channel, run_watcher};
