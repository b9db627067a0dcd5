use crate::config::PlausibilityBounds;
use crate::models::ListingRecord;
use crate::scrapers::ScrollPosition;

use super::page::{ancestor, rendered_text, select_within, window, PageSnapshot};
use super::strategy::{first_capture, squash};
use super::FieldExtractor;

const MAX_CITIES: usize = 5;
const LINK_SUFFIX: &str = "Real estate";
/// Bytes of text after the "Nearby cities" heading scanned when no links match
const SECTION_WINDOW: usize = 600;

static_regex!(REGION_LABEL, r"(?i)region:\s*([^\n•<]+)");
static_regex!(REGION_LOOSE, r"(?i)region[:\s]+([^\n•<]+)");
static_regex!(CITY_IN_TEXT, r"([A-Za-z][A-Za-z ]*?)\s+Real estate");

/// Region name and neighboring cities
pub struct Nearby;

impl FieldExtractor for Nearby {
    fn name(&self) -> &'static str {
        "nearby"
    }

    fn region(&self) -> ScrollPosition {
        ScrollPosition::Bottom
    }

    fn apply(&self, page: &PageSnapshot, _bounds: &PlausibilityBounds, record: &mut ListingRecord) {
        record.region = region(page).into();
        record.nearby_cities = nearby_cities(page);
    }
}

fn region(page: &PageSnapshot) -> Option<String> {
    let labelled = first_capture(page.text(), &[&REGION_LABEL, &REGION_LOOSE])
        .filter(|region| region.len() > 2);
    if labelled.is_some() {
        return labelled;
    }

    page.elements_containing("location")
        .into_iter()
        .flat_map(|element| [1, 2, 4].map(|levels| rendered_text(ancestor(element, levels))))
        .find_map(|container| first_capture(&container, &[&REGION_LABEL]))
}

fn nearby_cities(page: &PageSnapshot) -> Vec<String> {
    let mut cities = Vec::new();

    if let Some(heading) = page.elements_containing("nearby cities").into_iter().next() {
        for link in select_within(ancestor(heading, 2), "a") {
            let text = squash(&rendered_text(link));
            let Some(city) = text.strip_suffix(LINK_SUFFIX).map(str::trim) else {
                continue;
            };
            push_city(&mut cities, city);
        }
    }

    if cities.is_empty() {
        let text = squash(page.text());
        if let Some(start) = text.to_ascii_lowercase().find("nearby cities") {
            let section = window(&text, start + "nearby cities".len(), SECTION_WINDOW);
            for caps in CITY_IN_TEXT.captures_iter(section) {
                push_city(&mut cities, caps[1].trim());
            }
        }
    }

    cities
}

fn push_city(cities: &mut Vec<String>, city: &str) {
    if cities.len() < MAX_CITIES && city.len() > 2 && !cities.iter().any(|known| known == city) {
        cities.push(city.to_string());
    }
}
