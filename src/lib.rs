// src/lib.rs

//! Outage schedule watcher library.
//!
//! Fetches the utility's schedule page, extracts the queue timetable,
//! compares it against the last accepted snapshot and raises a local
//! notification when it changes.

pub mod error;
pub mod models;
pub mod pipeline;
#[cfg(feature = "serve")]
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_support;
