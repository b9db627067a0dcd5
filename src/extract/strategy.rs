use regex::Regex;
use tracing::debug;

use crate::config::Bounds;
use crate::models::Field;

/// Result of one extraction strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Found(T),
    NotFound,
    /// A candidate matched but fell outside the plausibility bounds
    OutOfRange(f64),
}

impl<T> Outcome<T> {
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Outcome::NotFound, Outcome::Found)
    }
}

/// A named way of finding a value in some extraction context
pub struct Strategy<C: ?Sized, T> {
    pub name: &'static str,
    pub run: fn(&C) -> Outcome<T>,
}

/// Tries strategies in priority order and keeps the first `Found` value
pub fn resolve<C: ?Sized, T>(field: &str, ctx: &C, strategies: &[Strategy<C, T>]) -> Field<T> {
    for strategy in strategies {
        match (strategy.run)(ctx) {
            Outcome::Found(value) => {
                debug!(field, strategy = strategy.name, "Value found");
                return Field::Known(value);
            }
            Outcome::OutOfRange(candidate) => {
                debug!(
                    field,
                    strategy = strategy.name,
                    candidate,
                    "Candidate outside plausibility bounds, discarded"
                );
            }
            Outcome::NotFound => {}
        }
    }
    Field::Unknown
}

/// Parses a number that may carry thousands separators
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().replace(',', "").parse::<f64>().ok()
}

/// First capture (group 1) across `texts` that parses and falls inside
/// `bounds`. Reports the last rejected candidate when nothing fits.
pub fn bounded_number<'t>(
    texts: impl IntoIterator<Item = &'t str>,
    pattern: &Regex,
    bounds: Bounds,
) -> Outcome<f64> {
    let mut rejected = None;
    for text in texts {
        for caps in pattern.captures_iter(text) {
            let Some(value) = caps.get(1).and_then(|m| parse_number(m.as_str())) else {
                continue;
            };
            if bounds.contains(value) {
                return Outcome::Found(value);
            }
            rejected = Some(value);
        }
    }
    rejected.map_or(Outcome::NotFound, Outcome::OutOfRange)
}

/// Same as [`bounded_number`] over several patterns, in order
pub fn bounded_any<'t>(texts: &[&'t str], patterns: &[&Regex], bounds: Bounds) -> Outcome<f64> {
    let mut last = Outcome::NotFound;
    for pattern in patterns {
        match bounded_number(texts.iter().copied(), pattern, bounds) {
            Outcome::Found(value) => return Outcome::Found(value),
            Outcome::OutOfRange(value) => last = Outcome::OutOfRange(value),
            Outcome::NotFound => {}
        }
    }
    last
}

/// First trimmed capture of group 1 for any of the patterns
pub fn first_capture(text: &str, patterns: &[&Regex]) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Collapses runs of whitespace into single spaces
pub fn squash(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
