// src/services/parser.rs

//! Schedule page parser.
//!
//! Turns the published page into [`ScheduleData`]. Extraction is best
//! effort: a missing marker yields an empty field, never an error. Only
//! input that is not markup at all is rejected.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{AppError, ParseError, Result};
use crate::models::{ParserConfig, QueueSchedule, ScheduleData, TimeSlot};
use crate::utils::parse_leading_u32;

/// `<day> <month> <year> року`
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}\s+\w+\s+\d{4}\s+року)").expect("valid date regex"));

/// `з HH:MM по HH:MM ... в обсязі <b>N</b>`, markup allowed in between.
static TIME_SLOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)з\s+(\d{2}:\d{2})\s+по\s+(\d{2}:\d{2}).*?в обсязі\s+<b>([\d.]+)</b>")
        .expect("valid time slot regex")
});

/// Service for extracting schedules from the upstream page.
pub struct ScheduleParser {
    description_sel: Selector,
    row_sel: Selector,
    cell_sel: Selector,
    queue_sel: Selector,
    subqueue_sel: Selector,
    status_prefix: String,
    retain_raw_html: bool,
}

impl ScheduleParser {
    /// Create a parser for the configured page markers.
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            description_sel: Self::class_selector(&config.description_class)?,
            row_sel: Self::parse_selector("tbody tr")?,
            cell_sel: Self::parse_selector("td")?,
            queue_sel: Self::class_selector(&config.queue_class)?,
            subqueue_sel: Self::class_selector(&config.subqueue_class)?,
            status_prefix: config.status_prefix.clone(),
            retain_raw_html: config.retain_raw_html,
        })
    }

    /// Parse a page into a schedule.
    pub fn parse(&self, html: &str) -> std::result::Result<ScheduleData, ParseError> {
        if html.trim().is_empty() {
            return Err(ParseError::UnparseableDocument("document is empty".into()));
        }
        if !html.contains('<') {
            return Err(ParseError::UnparseableDocument(
                "document contains no markup".into(),
            ));
        }

        let document = Html::parse_document(html);

        let data = ScheduleData {
            date: extract_date(html),
            description: self.extract_description(&document),
            time_slots: extract_time_slots(html),
            queue_schedules: self.extract_queue_schedules(&document),
            raw_html: self.retain_raw_html.then(|| html.to_string()),
            fallback: false,
        };

        log::info!(
            "Parsed schedule for '{}': {} time slots, {} queue rows",
            data.date,
            data.time_slots.len(),
            data.queue_schedules.len()
        );
        for diagnostic in data.diagnostics() {
            log::warn!("Schedule diagnostic: {}", diagnostic);
        }

        Ok(data)
    }

    /// Text of the first description element, minus its nested `div` blocks.
    fn extract_description(&self, document: &Html) -> String {
        let Some(element) = document.select(&self.description_sel).next() else {
            log::debug!("Description element not found");
            return String::new();
        };

        let mut text = String::new();
        for child in element.children() {
            match child.value() {
                Node::Text(t) => text.push_str(t),
                Node::Element(e) if e.name() == "div" => {}
                Node::Element(_) => {
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        text.extend(child_ref.text());
                    }
                }
                _ => {}
            }
        }
        text.trim().to_string()
    }

    fn extract_queue_schedules(&self, document: &Html) -> Vec<QueueSchedule> {
        let mut schedules: Vec<QueueSchedule> = Vec::new();

        for row in document.select(&self.row_sel) {
            let queue_text = first_text(&row, &self.queue_sel);
            let subqueue_text = first_text(&row, &self.subqueue_sel);

            if queue_text.is_empty() && subqueue_text.is_empty() {
                continue;
            }

            let queue = if queue_text.is_empty() {
                schedules.last().map_or(0, |prev| prev.queue)
            } else {
                parse_leading_u32(&queue_text).unwrap_or_else(|| {
                    log::debug!("Unparsable queue '{}', using 0", queue_text);
                    0
                })
            };
            let subqueue = parse_leading_u32(&subqueue_text).unwrap_or(0);

            let hours = status_tokens(
                row.select(&self.cell_sel).map(|cell| cell.value().attr("class")),
                &self.status_prefix,
            );

            schedules.push(QueueSchedule {
                queue,
                subqueue,
                hours,
            });
        }

        schedules
    }

    fn class_selector(class: &str) -> Result<Selector> {
        Self::parse_selector(&format!(".{}", class.trim()))
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::config(format!("Invalid selector '{s}': {e:?}")))
    }
}

/// First `<day> <month> <year> року` match, or empty.
pub fn extract_date(html: &str) -> String {
    DATE_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Every time-slot sentence in document order.
///
/// An unparsable queue count becomes `0.0` so the slot is still reported.
pub fn extract_time_slots(html: &str) -> Vec<TimeSlot> {
    TIME_SLOT_RE
        .captures_iter(html)
        .map(|caps| {
            let queues = caps[3].parse::<f64>().unwrap_or_else(|_| {
                log::debug!("Unparsable queue count '{}', using 0", &caps[3]);
                0.0
            });
            TimeSlot::new(&caps[1], &caps[2], queues)
        })
        .collect()
}

/// Keep the status token of every cell that carries one, in order.
///
/// Each item is a cell's `class` attribute. Cells without a token that
/// starts with `prefix` are skipped, not padded.
pub fn status_tokens<'a, I>(cell_classes: I, prefix: &str) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    cell_classes
        .into_iter()
        .filter_map(|classes| {
            classes?
                .split_whitespace()
                .find(|token| token.starts_with(prefix))
                .map(str::to_string)
        })
        .collect()
}

fn first_text(row: &ElementRef<'_>, selector: &Selector) -> String {
    row.select(selector)
        .next()
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{schedule_page, status_cells};

    fn parser() -> ScheduleParser {
        ScheduleParser::new(&ParserConfig::default()).unwrap()
    }

    fn table(rows: &str) -> String {
        format!("<html><body><table><tbody>{rows}</tbody></table></body></html>")
    }

    #[test]
    fn test_parse_full_page() {
        let html = schedule_page(24..36);
        let data = parser().parse(&html).unwrap();

        assert_eq!(data.date, "16 жовтня 2026 року");
        assert!(data.description.starts_with("16 жовтня 2026 року за командою"));
        assert!(!data.description.contains("Години"));
        assert_eq!(
            data.time_slots,
            vec![
                TimeSlot::new("00:00", "06:00", 1.0),
                TimeSlot::new("18:00", "23:59", 0.5),
            ]
        );
        assert_eq!(data.queue_schedules.len(), 3);
        assert_eq!(data.raw_html.as_deref(), Some(html.as_str()));
        assert!(!data.fallback);
    }

    #[test]
    fn test_queue_carries_forward() {
        let data = parser().parse(&schedule_page(24..36)).unwrap();
        let rows = &data.queue_schedules;

        assert_eq!((rows[0].queue, rows[0].subqueue), (1, 1));
        assert_eq!((rows[1].queue, rows[1].subqueue), (1, 2));
        assert_eq!((rows[2].queue, rows[2].subqueue), (3, 0));
    }

    #[test]
    fn test_blank_queue_after_queue_three() {
        let html = table(&format!(
            r#"<tr><td class="turnoff-scheduleui-table-queue">3</td><td class="turnoff-scheduleui-table-subqueue">1</td>{cells}</tr>
               <tr><td class="turnoff-scheduleui-table-queue"> </td><td class="turnoff-scheduleui-table-subqueue">2</td>{cells}</tr>"#,
            cells = status_cells(0..0)
        ));
        let data = parser().parse(&html).unwrap();
        assert_eq!(data.queue_schedules[1].queue, 3);
        assert_eq!(data.queue_schedules[1].subqueue, 2);
    }

    #[test]
    fn test_first_row_without_queue_defaults_to_zero() {
        let html = table(r#"<tr><td class="turnoff-scheduleui-table-subqueue">2</td><td class="light_1"></td></tr>"#);
        let data = parser().parse(&html).unwrap();
        assert_eq!(data.queue_schedules[0].queue, 0);
        assert_eq!(data.queue_schedules[0].subqueue, 2);
    }

    #[test]
    fn test_rows_without_markers_are_skipped() {
        let html = table(&format!(
            r#"<tr><td>Час</td>{}</tr>
               <tr><td class="turnoff-scheduleui-table-queue">2</td>{}</tr>"#,
            status_cells(0..48),
            status_cells(0..0)
        ));
        let data = parser().parse(&html).unwrap();
        assert_eq!(data.queue_schedules.len(), 1);
        assert_eq!(data.queue_schedules[0].queue, 2);
        assert_eq!(data.queue_schedules[0].subqueue, 0);
    }

    #[test]
    fn test_hours_preserve_order_and_skip_unmarked_cells() {
        let data = parser().parse(&schedule_page(24..36)).unwrap();
        let second = &data.queue_schedules[1];

        assert_eq!(second.hours.len(), 48);
        assert_eq!(second.hours[23], "light_1");
        assert!(second.hours[24..36].iter().all(|h| h == "light_2"));
        assert_eq!(second.hours[36], "light_1");
    }

    #[test]
    fn test_short_rows_are_preserved() {
        let html = table(
            r#"<tr><td class="turnoff-scheduleui-table-queue">1</td><td class="light_1"></td><td class="light_3"></td></tr>"#,
        );
        let data = parser().parse(&html).unwrap();
        assert_eq!(data.queue_schedules[0].hours, vec!["light_1", "light_3"]);
        assert_eq!(data.diagnostics().len(), 1);
    }

    #[test]
    fn test_missing_markers_give_empty_fields() {
        let data = parser().parse("<html><body><p>Нічого</p></body></html>").unwrap();
        assert_eq!(data.date, "");
        assert_eq!(data.description, "");
        assert!(data.time_slots.is_empty());
        assert!(data.queue_schedules.is_empty());
    }

    #[test]
    fn test_unparseable_document() {
        assert!(matches!(
            parser().parse("   "),
            Err(ParseError::UnparseableDocument(_))
        ));
        assert!(matches!(
            parser().parse("plain text, no tags"),
            Err(ParseError::UnparseableDocument(_))
        ));
    }

    #[test]
    fn test_time_slots_count_matches_occurrences() {
        let html = (0..5)
            .map(|i| format!("<p>з {:02}:00 по {:02}:30 <i>x</i> в обсязі <b>{}</b></p>", i, i, i))
            .collect::<String>();
        let slots = extract_time_slots(&html);

        assert_eq!(slots.len(), 5);
        assert_eq!(slots[3], TimeSlot::new("03:00", "03:30", 3.0));
    }

    #[test]
    fn test_malformed_queue_count_is_zero() {
        let slots = extract_time_slots("з 01:00 по 02:00 в обсязі <b>1.2.3</b>");
        assert_eq!(slots, vec![TimeSlot::new("01:00", "02:00", 0.0)]);
    }

    #[test]
    fn test_status_tokens_filter_by_prefix() {
        let cells = [
            Some("turnoff-scheduleui-table-queue"),
            None,
            Some("cell light_2 current"),
            Some(""),
            Some("light_1"),
        ];
        assert_eq!(
            status_tokens(cells, "light_"),
            vec!["light_2".to_string(), "light_1".to_string()]
        );
    }

    #[test]
    fn test_raw_html_not_retained_when_disabled() {
        let config = ParserConfig {
            retain_raw_html: false,
            ..ParserConfig::default()
        };
        let parser = ScheduleParser::new(&config).unwrap();
        let data = parser.parse(&schedule_page(0..0)).unwrap();
        assert!(data.raw_html.is_none());
    }
}
