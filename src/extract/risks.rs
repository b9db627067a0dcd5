use crate::config::{Bounds, PlausibilityBounds};
use crate::models::{Field, ListingRecord, RiskLevel, RiskRating};
use crate::scrapers::ScrollPosition;

use super::page::{ancestor, rendered_text, window, PageSnapshot};
use super::strategy::squash;
use super::FieldExtractor;

/// How far above a "<kind> factor" label the rating card starts
const CARD_DEPTH: usize = 3;
/// Bytes of page text read after a label when no card matches
const FALLBACK_WINDOW: usize = 200;
const FACTOR: &str = "factor";

static_regex!(LEVEL, r"(?i)\b(minimal|minor|moderate|major|severe)\b");
static_regex!(OUT_OF_TEN, r"(\d+)\s*/\s*10\b");

/// Climate risk factors from the bottom of the page
pub struct ClimateRisks;

impl FieldExtractor for ClimateRisks {
    fn name(&self) -> &'static str {
        "risks"
    }

    fn region(&self) -> ScrollPosition {
        ScrollPosition::Bottom
    }

    fn apply(&self, page: &PageSnapshot, bounds: &PlausibilityBounds, record: &mut ListingRecord) {
        let rate = |kind: &str| rating(page, kind, bounds.risk_score);
        record.flood_risk = rate("flood");
        record.fire_risk = rate("fire");
        record.wind_risk = rate("wind");
        record.air_risk = rate("air");
        record.heat_risk = rate("heat");
    }
}

fn rating(page: &PageSnapshot, kind: &str, bounds: Bounds) -> Field<RiskRating> {
    let label = format!("{kind} factor");

    let from_cards = page
        .elements_containing(&label)
        .into_iter()
        .map(|element| squash(&rendered_text(ancestor(element, CARD_DEPTH))))
        .find_map(|card| {
            label_sections(&card, &label)
                .into_iter()
                .find_map(|section| parse_rating(section, bounds))
        });
    if from_cards.is_some() {
        return from_cards.into();
    }

    let text = squash(page.text());
    label_sections(&text, &label)
        .into_iter()
        .find_map(|section| parse_rating(window(section, 0, FALLBACK_WINDOW), bounds))
        .into()
}

/// Text from each `label` occurrence up to the next factor label
fn label_sections<'t>(text: &'t str, label: &str) -> Vec<&'t str> {
    let lower = text.to_ascii_lowercase();
    lower
        .match_indices(label)
        .filter_map(|(start, _)| {
            let after = start + label.len();
            let end = lower[after..]
                .find(FACTOR)
                .map_or(text.len(), |offset| after + offset);
            text.get(start..end)
        })
        .collect()
}

/// Needs both a level word and an `n/10` score
fn parse_rating(text: &str, bounds: Bounds) -> Option<RiskRating> {
    let level: RiskLevel = LEVEL.captures(text)?[1].parse().ok()?;
    let score = OUT_OF_TEN
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u8>().ok())
        .find(|score| bounds.contains(f64::from(*score)))?;
    Some(RiskRating { level, score })
}
