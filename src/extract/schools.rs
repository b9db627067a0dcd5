use regex::Regex;

use crate::config::{Bounds, PlausibilityBounds};
use crate::models::{Field, ListingRecord, School};
use crate::scrapers::ScrollPosition;

use super::page::PageSnapshot;
use super::strategy::{bounded_number, Outcome};
use super::FieldExtractor;

/// Phrases that show up where a school name should be but are boilerplate
const NOT_A_NAME: &[&str] = &[
    "check with",
    "contact",
    "verify",
    "call",
    "please",
    "applicable",
    "district",
    "information",
];

/// Assigned elementary, middle and high schools
pub struct Schools;

#[derive(Clone, Copy)]
enum Level {
    Elementary,
    Middle,
    High,
}

impl Level {
    fn word(self) -> &'static str {
        match self {
            Level::Elementary => "elementary",
            Level::Middle => "middle",
            Level::High => "high",
        }
    }

    fn name_patterns(self) -> Vec<Regex> {
        let word = self.word();
        [
            format!(r"(?i)([A-Z][a-zA-Z ]+?)\s*{word}"),
            format!(r"(?i)([A-Z][a-zA-Z ]+?)\s*School.*?{word}"),
            format!(r"(?i){word}[:\s]*([A-Z][a-zA-Z ]+)"),
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    }

    fn distance_patterns(self, name: Option<&str>) -> Vec<Regex> {
        let word = self.word();
        let mut patterns = Vec::new();
        if let Some(name) = name {
            patterns.push(format!(
                r"(?is){}.*?distance:\s*(\d+\.?\d*)\s*mi",
                regex::escape(name)
            ));
        }
        patterns.push(format!(r"(?is){word}.*?distance:\s*(\d+\.?\d*)\s*mi"));
        patterns.push(format!(r"(?is){word}.*?(\d+\.?\d*)\s*mi\b"));
        if matches!(self, Level::Middle) {
            patterns.push(r"(?is)(?:junior|k-8).*?distance:\s*(\d+\.?\d*)\s*mi".to_string());
        }
        patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    }
}

impl FieldExtractor for Schools {
    fn name(&self) -> &'static str {
        "schools"
    }

    fn region(&self) -> ScrollPosition {
        ScrollPosition::Fraction(0.6)
    }

    fn apply(&self, page: &PageSnapshot, bounds: &PlausibilityBounds, record: &mut ListingRecord) {
        let text = page.text();
        record.elementary_school = school(text, Level::Elementary, bounds.school_distance_mi);
        record.middle_school = school(text, Level::Middle, bounds.school_distance_mi);
        record.high_school = school(text, Level::High, bounds.school_distance_mi);
    }
}

fn school(text: &str, level: Level, bounds: Bounds) -> School {
    let name = level.name_patterns().iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .find(|candidate| plausible_name(candidate))
    });

    let distance = level
        .distance_patterns(name.as_deref())
        .iter()
        .find_map(|pattern| match bounded_number([text], pattern, bounds) {
            Outcome::Found(miles) => Some(format!("{} mi", trim_float(miles))),
            Outcome::NotFound | Outcome::OutOfRange(_) => None,
        });

    School {
        name: name.into(),
        distance: Field::from(distance),
    }
}

fn plausible_name(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    candidate.len() > 3 && candidate.len() < 30 && !NOT_A_NAME.iter().any(|bad| lower.contains(bad))
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
