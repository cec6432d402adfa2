//! Outage schedule data structures.

use serde::{Deserialize, Serialize};

use crate::utils::fingerprint;

/// Number of half-hour slots in a day.
pub const HALF_HOURS_PER_DAY: usize = 48;

/// A period of the day with a required number of outage queues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    /// Start of the window, `HH:MM`
    pub start: String,

    /// End of the window, `HH:MM`
    pub end: String,

    /// Number of queues switched off in this window (may be fractional)
    pub queues: f64,
}

impl TimeSlot {
    pub fn new(start: impl Into<String>, end: impl Into<String>, queues: f64) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            queues,
        }
    }
}

/// One row of the per-queue outage timetable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueSchedule {
    /// Queue (group) number
    pub queue: u32,

    /// Subqueue number, 0 when the page has none
    pub subqueue: u32,

    /// Status token per half-hour, as published (`light_1`, `light_2`, ...)
    pub hours: Vec<String>,
}

impl QueueSchedule {
    /// Row label as shown on the page, e.g. `3.2`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.queue, self.subqueue)
    }

    /// Decoded status for a half-hour index. Missing slots are `Unknown`.
    pub fn status_at(&self, index: usize) -> LightStatus {
        self.hours
            .get(index)
            .map(|token| LightStatus::from_token(token))
            .unwrap_or(LightStatus::Unknown)
    }

    /// Whether the row covers exactly one full day.
    pub fn is_complete(&self) -> bool {
        self.hours.len() == HALF_HOURS_PER_DAY
    }
}

/// Decoded half-hour status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightStatus {
    On,
    Off,
    Possible,
    Unknown,
}

impl LightStatus {
    /// Decode a class token. Matching is by substring so that
    /// compound class strings still resolve.
    pub fn from_token(token: &str) -> Self {
        if token.contains("light_1") {
            Self::On
        } else if token.contains("light_2") {
            Self::Off
        } else if token.contains("light_3") {
            Self::Possible
        } else {
            Self::Unknown
        }
    }

    /// Human-readable label in the page's language.
    pub fn label(&self) -> &'static str {
        match self {
            Self::On => "Світло",
            Self::Off => "Відключено",
            Self::Possible => "Можливе відключення",
            Self::Unknown => "",
        }
    }

    /// Single-character cell for terminal rendering.
    pub fn symbol(&self) -> char {
        match self {
            Self::On => '█',
            Self::Off => '·',
            Self::Possible => '?',
            Self::Unknown => ' ',
        }
    }
}

/// The full schedule snapshot for today.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleData {
    /// Date label as published, e.g. `16 жовтня 2026 року`
    pub date: String,

    /// Explanatory prose as published
    pub description: String,

    /// Queue-count windows in document order
    pub time_slots: Vec<TimeSlot>,

    /// Per-queue timetable rows in document order
    pub queue_schedules: Vec<QueueSchedule>,

    /// Original document, kept for auditing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,

    /// Set when the data is synthetic and not taken from the live page
    #[serde(default)]
    pub fallback: bool,
}

impl ScheduleData {
    /// Look up a row by queue and subqueue.
    pub fn find(&self, queue: u32, subqueue: u32) -> Option<&QueueSchedule> {
        self.queue_schedules
            .iter()
            .find(|row| row.queue == queue && row.subqueue == subqueue)
    }

    /// Decoded status for a row and half-hour index.
    pub fn status_at(&self, queue: u32, subqueue: u32, index: usize) -> LightStatus {
        self.find(queue, subqueue)
            .map(|row| row.status_at(index))
            .unwrap_or(LightStatus::Unknown)
    }

    /// Rows whose hour vector does not cover a full day.
    pub fn diagnostics(&self) -> Vec<String> {
        self.queue_schedules
            .iter()
            .filter(|row| !row.is_complete())
            .map(|row| {
                format!(
                    "queue {} has {} half-hour slots, expected {}",
                    row.label(),
                    row.hours.len(),
                    HALF_HOURS_PER_DAY
                )
            })
            .collect()
    }

    /// Short content hash of the queue timetable.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.queue_schedules)
    }

    /// Copy without the raw document, for logging and persistence.
    pub fn without_raw_html(&self) -> Self {
        Self {
            raw_html: None,
            ..self.clone()
        }
    }
}
