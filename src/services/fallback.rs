//! Synthetic schedule used when the live page is unavailable.

use std::ops::Range;

use chrono::{Datelike, Local, NaiveDate};

use crate::models::{HALF_HOURS_PER_DAY, QueueSchedule, ScheduleData, TimeSlot};

const MONTHS_GENITIVE: [&str; 12] = [
    "січня",
    "лютого",
    "березня",
    "квітня",
    "травня",
    "червня",
    "липня",
    "серпня",
    "вересня",
    "жовтня",
    "листопада",
    "грудня",
];

/// Outage windows per (queue, subqueue), as half-hour index ranges.
const CANNED_OUTAGES: [(u32, u32, Range<usize>); 8] = [
    (1, 1, 0..12),
    (1, 2, 24..36),
    (2, 1, 12..24),
    (2, 2, 36..48),
    (3, 1, 0..12),
    (3, 2, 24..36),
    (4, 1, 12..24),
    (4, 2, 36..48),
];

/// Build the fallback schedule for today.
pub fn fallback(reason: &str) -> ScheduleData {
    fallback_for(Local::now().date_naive(), reason)
}

/// Build the fallback schedule for a given day.
pub fn fallback_for(day: NaiveDate, reason: &str) -> ScheduleData {
    ScheduleData {
        date: ukrainian_date(day),
        description: format!(
            "⚠️ Не вдалося завантажити актуальний графік з poe.pl.ua.\n\n\
             Причина: {reason}\n\n\
             Відображаються приблизні дані, це НЕ актуальний графік. \
             Будь ласка, перевірте офіційний сайт: https://www.poe.pl.ua/"
        ),
        time_slots: vec![
            TimeSlot::new("00:00", "06:00", 1.0),
            TimeSlot::new("06:00", "12:00", 0.5),
            TimeSlot::new("12:00", "18:00", 1.0),
            TimeSlot::new("18:00", "23:59", 0.5),
        ],
        queue_schedules: CANNED_OUTAGES
            .iter()
            .map(|(queue, subqueue, off)| QueueSchedule {
                queue: *queue,
                subqueue: *subqueue,
                hours: hours_pattern(off.clone()),
            })
            .collect(),
        raw_html: None,
        fallback: true,
    }
}

/// Date in the page's own style, e.g. `16 жовтня 2026 року`.
pub fn ukrainian_date(day: NaiveDate) -> String {
    let month = MONTHS_GENITIVE[day.month0() as usize];
    format!("{} {} {} року", day.day(), month, day.year())
}

fn hours_pattern(off: Range<usize>) -> Vec<String> {
    (0..HALF_HOURS_PER_DAY)
        .map(|i| if off.contains(&i) { "light_2" } else { "light_1" }.to_string())
        .collect()
}
