use std::sync::LazyLock;

use regex::Regex;

use crate::config::PlausibilityBounds;
use crate::models::{Field, ListingRecord, Parking, Utilities};
use crate::scrapers::{BrowserResult, PageTab, ScrollPosition};

use super::page::{ancestor, rendered_text, PageSnapshot};
use super::strategy::{first_capture, parse_number, squash};
use super::FieldExtractor;

const INTERIOR_CAP: usize = 5;
const ROOMS_CAP: usize = 3;
const APPLIANCES_CAP: usize = 3;

const INTERIOR_TERMS: &[&str] = &[
    r"hardwood\s+floors?",
    r"granite\s+countertops?",
    r"stainless\s+steel",
    r"tile\s+floors?",
    r"carpet",
    r"laminate",
    r"marble",
    r"walk-in\s+closet",
    r"bay\s+window",
    r"skylight",
    r"fireplace",
    r"built-in\s+shelves?",
    r"crown\s+molding",
    r"vaulted\s+ceiling",
];
const ROOM_TERMS: &[&str] = &[
    r"dining\s+room",
    r"family\s+room",
    r"living\s+room",
    r"bonus\s+room",
    r"office",
    r"den",
    r"study",
    r"library",
    r"sunroom",
    r"basement",
    r"attic",
    r"laundry\s+room",
    r"mud\s+room",
    r"pantry",
    r"walk-in\s+pantry",
];
const APPLIANCE_TERMS: &[&str] = &[
    r"dishwasher",
    r"refrigerator",
    r"microwave",
    r"oven",
    r"range",
    r"cooktop",
    r"disposal",
    r"washer",
    r"dryer",
    r"freezer",
    r"wine\s+cooler",
    r"ice\s+maker",
];

static INTERIOR: LazyLock<Vec<Regex>> = LazyLock::new(|| vocabulary(INTERIOR_TERMS));
static ROOMS: LazyLock<Vec<Regex>> = LazyLock::new(|| vocabulary(ROOM_TERMS));
static APPLIANCES: LazyLock<Vec<Regex>> = LazyLock::new(|| vocabulary(APPLIANCE_TERMS));

static_regex!(ELECTRIC, r"(?i)electric:\s*([^<\n]+)");
static_regex!(SEWER, r"(?i)sewer:\s*([^<\n]+)");
static_regex!(WATER, r"(?i)water:\s*([^<\n]+)");
static_regex!(OTHER_UTILITIES, r"(?i)utilities for property:\s*([^<\n]+)");
static_regex!(TOTAL_SPACES, r"(?i)total spaces:\s*(\d+)");
static_regex!(GARAGE_SPACES, r"(?i)garage spaces:\s*(\d+)");
static_regex!(PARKING_FEATURES, r"(?i)parking features:\s*([^<\n]+)");
static_regex!(UNCOVERED_SPACES, r"(?i)has uncovered spaces:\s*([^<\n]+)");
static_regex!(MONTHLY, r"(?i)\$(\d[\d,]*)(?:/mo\b|/month\b|\s+monthly\b)");

fn vocabulary(terms: &[&str]) -> Vec<Regex> {
    terms
        .iter()
        .map(|term| {
            Regex::new(&format!(r"(?i)\b{term}\b")).expect("hardcoded regex pattern is valid")
        })
        .collect()
}

/// Facts and features section: amenities, utilities, parking and the
/// estimated monthly payment
pub struct Features;

impl FieldExtractor for Features {
    fn name(&self) -> &'static str {
        "features"
    }

    fn region(&self) -> ScrollPosition {
        ScrollPosition::Fraction(0.5)
    }

    fn prepare(&self, tab: &dyn PageTab) -> BrowserResult<()> {
        tab.click_buttons_containing("Show more")?;
        Ok(())
    }

    fn apply(&self, page: &PageSnapshot, _bounds: &PlausibilityBounds, record: &mut ListingRecord) {
        let text = page.text();

        record.interior_features = collect_terms(text, &INTERIOR, INTERIOR_CAP);
        record.other_rooms = collect_terms(text, &ROOMS, ROOMS_CAP);
        record.appliances = collect_terms(text, &APPLIANCES, APPLIANCES_CAP);

        let utilities = Utilities {
            electric: labelled(text, &ELECTRIC),
            sewer: labelled(text, &SEWER),
            water: labelled(text, &WATER),
            other: labelled(text, &OTHER_UTILITIES),
        };
        record.utilities = if utilities.is_empty() {
            Field::Unknown
        } else {
            Field::Known(utilities)
        };

        let parking = Parking {
            total_spaces: count(text, &TOTAL_SPACES),
            garage_spaces: count(text, &GARAGE_SPACES),
            features: labelled(text, &PARKING_FEATURES),
            uncovered_spaces: labelled(text, &UNCOVERED_SPACES),
        };
        record.parking = if parking.is_empty() {
            Field::Unknown
        } else {
            Field::Known(parking)
        };

        record.estimated_monthly_payment = monthly_payment(page).into();
    }
}

/// Distinct lowercase matches in vocabulary order, capped at `cap`
fn collect_terms(text: &str, vocabulary: &[Regex], cap: usize) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for pattern in vocabulary {
        for m in pattern.find_iter(text) {
            if found.len() >= cap {
                return found;
            }
            let term = squash(&m.as_str().to_lowercase());
            if !found.contains(&term) {
                found.push(term);
            }
        }
    }
    found
}

fn labelled(text: &str, pattern: &Regex) -> Field<String> {
    first_capture(text, &[pattern]).into()
}

fn count(text: &str, pattern: &Regex) -> Field<u32> {
    first_capture(text, &[pattern])
        .and_then(|raw| raw.parse().ok())
        .into()
}

fn monthly_payment(page: &PageSnapshot) -> Option<u32> {
    ["monthly", "payment"]
        .iter()
        .flat_map(|needle| page.elements_containing(needle))
        .map(|element| rendered_text(ancestor(element, 1)))
        .find_map(|container| first_capture(&squash(&container), &[&MONTHLY]))
        .and_then(|raw| parse_number(&raw))
        .map(|value| value as u32)
}
