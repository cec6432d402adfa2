//! Change detection between schedule snapshots.
//!
//! Only the queue timetable counts. Edits to the date, description or
//! time-slot prose are not notifiable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{QueueSchedule, ScheduleData};

/// Whether `current` differs from `previous` in a notifiable way.
///
/// The first observation is a baseline and never counts as a change.
pub fn changed(previous: Option<&ScheduleData>, current: &ScheduleData) -> bool {
    match previous {
        None => false,
        Some(previous) => previous.queue_schedules != current.queue_schedules,
    }
}

/// Rows that differ between two timetables, keyed by `(queue, subqueue)`.
///
/// Used for notification text. [`changed`] stays the authority on whether a
/// change happened: a pure reordering is a change with an empty keyed diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDiff {
    /// Rows present only in the current timetable
    pub added: Vec<(u32, u32)>,
    /// Rows whose hours differ
    pub changed: Vec<(u32, u32)>,
    /// Rows present only in the previous timetable
    pub removed: Vec<(u32, u32)>,
}

impl QueueDiff {
    /// Compute the keyed diff. For duplicate keys the first row wins.
    pub fn between(previous: &[QueueSchedule], current: &[QueueSchedule]) -> Self {
        let prev_map = keyed(previous);
        let curr_map = keyed(current);

        let added = curr_map
            .keys()
            .filter(|key| !prev_map.contains_key(*key))
            .copied()
            .collect();

        let removed = prev_map
            .keys()
            .filter(|key| !curr_map.contains_key(*key))
            .copied()
            .collect();

        let changed = curr_map
            .iter()
            .filter_map(|(key, hours)| match prev_map.get(key) {
                Some(prev_hours) if prev_hours != hours => Some(*key),
                _ => None,
            })
            .collect();

        Self {
            added,
            changed,
            removed,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// Labels of every affected row, e.g. `["1.1", "3.2"]`, sorted by key.
    pub fn affected_labels(&self) -> Vec<String> {
        let mut keys: Vec<(u32, u32)> = self
            .added
            .iter()
            .chain(&self.changed)
            .chain(&self.removed)
            .copied()
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys.iter().map(|(q, s)| format!("{q}.{s}")).collect()
    }
}

fn keyed(rows: &[QueueSchedule]) -> BTreeMap<(u32, u32), &[String]> {
    let mut map = BTreeMap::new();
    for row in rows {
        map.entry((row.queue, row.subqueue))
            .or_insert(row.hours.as_slice());
    }
    map
}
