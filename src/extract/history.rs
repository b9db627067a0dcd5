use crate::config::PlausibilityBounds;
use crate::models::{HistoryEvent, ListingRecord};
use crate::scrapers::ScrollPosition;

use super::page::{ancestor, rendered_text, PageSnapshot};
use super::strategy::squash;
use super::FieldExtractor;

const MAX_EVENTS: usize = 5;
const SECTION_MARKERS: &[&str] = &["price history", "sold", "listed"];

static_regex!(
    EVENT_ROW,
    r"(\d{1,2}/\d{1,2}/\d{4})\s+([A-Za-z][A-Za-z ]*?)\s+(\$\d[\d,]*)"
);

/// Most recent price history rows
pub struct PriceHistory;

impl FieldExtractor for PriceHistory {
    fn name(&self) -> &'static str {
        "history"
    }

    fn region(&self) -> ScrollPosition {
        ScrollPosition::Fraction(0.7)
    }

    fn apply(&self, page: &PageSnapshot, _bounds: &PlausibilityBounds, record: &mut ListingRecord) {
        let mut events = Vec::new();
        for marker in SECTION_MARKERS {
            for element in page.elements_containing(marker) {
                let container = squash(&rendered_text(ancestor(element, 1)));
                collect_events(&container, &mut events);
                if events.len() >= MAX_EVENTS {
                    break;
                }
            }
        }
        if events.is_empty() {
            collect_events(&squash(page.text()), &mut events);
        }
        record.property_history = events;
    }
}

/// Appends rows not seen yet, keeping page order and the overall cap
fn collect_events(text: &str, events: &mut Vec<HistoryEvent>) {
    for caps in EVENT_ROW.captures_iter(text) {
        if events.len() >= MAX_EVENTS {
            return;
        }
        let event = HistoryEvent {
            date: caps[1].to_string(),
            event: caps[2].trim().to_string(),
            price: caps[3].to_string(),
        };
        if !events.contains(&event) {
            events.push(event);
        }
    }
}
