//! Service layer for the schedule watcher.
//!
//! This module contains the business logic for:
//! - Page download (`ScheduleFetcher`)
//! - Page extraction (`ScheduleParser`)
//! - Synthetic data when the page is unavailable (`fallback`)
//! - Change notification delivery (`Notifier`)

pub mod fallback;
mod fetcher;
mod notifier;
mod parser;

pub use fallback::fallback;
pub use fetcher::{DIRECT_PATH, ScheduleFetcher};
pub use notifier::{CommandNotifier, LogNotifier, Notification, Notifier, create_notifier};
pub use parser::{ScheduleParser, extract_date, extract_time_slots, status_tokens};

#[cfg(test)]
pub(crate) use notifier::tests::RecordingNotifier;
