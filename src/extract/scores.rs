use regex::Regex;

use crate::config::{Bounds, PlausibilityBounds};
use crate::models::{Field, ListingRecord, Score};
use crate::scrapers::ScrollPosition;

use super::page::{rendered_text, PageSnapshot};
use super::strategy::{
    bounded_any, bounded_number, resolve, squash, Outcome, Strategy,
};
use super::FieldExtractor;

const CONTAINER_SELECTORS: &[&str] = &[
    r#"[class*="StyledScoresContainer"] > div"#,
    r#"[class*="ScoresContainer"]"#,
    r#"[data-testid*="scores"]"#,
];
/// Keyword elements inspected per keyword in the last-resort pass
const KEYWORD_SAMPLE: usize = 3;

static_regex!(WALK_LABELLED, r"(?i)walk\s*score\W{0,3}\s*(\d+)");
static_regex!(WALK_OF_100, r"(?i)(\d+)\s*/?\s*100\s*walk");
static_regex!(WALK_BARE, r"(?i)(\d+)\s*walk");
static_regex!(BIKE_LABELLED, r"(?i)bike\s*score\W{0,3}\s*(\d+)");
static_regex!(BIKE_OF_100, r"(?i)(\d+)\s*/?\s*100\s*bike");
static_regex!(BIKE_BARE, r"(?i)(\d+)\s*bike");
static_regex!(TRANSIT_LABELLED, r"(?i)transit\s*score\W{0,3}\s*(\d+)");
static_regex!(TRANSIT_OF_100, r"(?i)(\d+)\s*/?\s*100\s*transit");
static_regex!(TRANSIT_BARE, r"(?i)(\d+)\s*transit");
static_regex!(WALK_PAGE, r"(?i)(?:walk\s*score|walkability)[:\s]*(\d+)");
static_regex!(BIKE_PAGE, r"(?i)(?:bike\s*score|bikeability)[:\s]*(\d+)");
static_regex!(TRANSIT_PAGE, r"(?i)(?:transit\s*score|transit)[:\s]*(\d+)");
static_regex!(ANY_SCORE, r"(\d+)(?:/100)?");

/// Walk, bike and transit scores
pub struct NeighborhoodScores;

struct Ctx<'a> {
    page: &'a PageSnapshot,
    bounds: Bounds,
    container: Option<String>,
    keyword_texts: Vec<String>,
    kind: &'static str,
    patterns: [&'a Regex; 3],
    page_pattern: &'a Regex,
}

impl FieldExtractor for NeighborhoodScores {
    fn name(&self) -> &'static str {
        "scores"
    }

    fn region(&self) -> ScrollPosition {
        ScrollPosition::Fraction(0.65)
    }

    fn apply(&self, page: &PageSnapshot, bounds: &PlausibilityBounds, record: &mut ListingRecord) {
        let container = CONTAINER_SELECTORS
            .iter()
            .find_map(|css| page.select_texts(css).into_iter().next())
            .map(|text| squash(&text));
        let keyword_texts: Vec<String> = ["walk", "bike", "transit", "score"]
            .iter()
            .flat_map(|keyword| {
                page.elements_containing(keyword)
                    .into_iter()
                    .take(KEYWORD_SAMPLE)
                    .map(|element| squash(&rendered_text(element)))
            })
            .collect();

        let strategies: [Strategy<Ctx<'_>, f64>; 3] = [
            Strategy {
                name: "scores container",
                run: |c| match &c.container {
                    Some(text) => bounded_any(&[text.as_str()], &c.patterns, c.bounds),
                    None => Outcome::NotFound,
                },
            },
            Strategy {
                name: "page source",
                run: |c| bounded_number([c.page.text(), c.page.source()], c.page_pattern, c.bounds),
            },
            Strategy {
                name: "keyword elements",
                run: |c| {
                    let texts: Vec<&str> = c
                        .keyword_texts
                        .iter()
                        .map(String::as_str)
                        .filter(|text| text.to_lowercase().contains(c.kind))
                        .collect();
                    bounded_any(&texts, &[&ANY_SCORE], c.bounds)
                },
            },
        ];

        let score = |kind: &'static str,
                     patterns: [&'static Regex; 3],
                     page_pattern: &'static Regex| {
            let ctx = Ctx {
                page,
                bounds: bounds.score,
                container: container.clone(),
                keyword_texts: keyword_texts.clone(),
                kind,
                patterns,
                page_pattern,
            };
            match resolve(kind, &ctx, &strategies) {
                Field::Known(value) => Field::Known(Score(value as u8)),
                Field::Unknown => Field::Unknown,
            }
        };

        record.walk_score = score("walk", [&WALK_LABELLED, &WALK_OF_100, &WALK_BARE], &WALK_PAGE);
        record.bike_score = score("bike", [&BIKE_LABELLED, &BIKE_OF_100, &BIKE_BARE], &BIKE_PAGE);
        record.transit_score = score(
            "transit",
            [&TRANSIT_LABELLED, &TRANSIT_OF_100, &TRANSIT_BARE],
            &TRANSIT_PAGE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> ListingRecord {
        let mut record = ListingRecord::new("u", chrono::Utc::now());
        NeighborhoodScores.apply(
            &PageSnapshot::parse(html),
            &PlausibilityBounds::default(),
            &mut record,
        );
        record
    }

    #[test]
    fn reads_scores_from_container() {
        let record = extract(
            r#"<html><body><div class="StyledScoresContainer-abc"><div>
                <div><a>Walk Score®</a><span>88</span><span>/ 100</span></div>
                <div><a>Bike Score®</a><span>71</span><span>/ 100</span></div>
                <div><a>Transit Score®</a><span>52</span><span>/ 100</span></div>
            </div></div></body></html>"#,
        );
        assert_eq!(record.walk_score, Field::Known(Score(88)));
        assert_eq!(record.bike_score, Field::Known(Score(71)));
        assert_eq!(record.transit_score, Field::Known(Score(52)));
    }

    #[test]
    fn falls_back_to_page_wide_patterns() {
        let record = extract(
            r#"<html><body><p>Walkability: 64</p><script>{"transitScore": 40}</script></body></html>"#,
        );
        assert_eq!(record.walk_score, Field::Known(Score(64)));
        assert_eq!(record.bike_score, Field::Unknown);
        assert_eq!(record.transit_score, Field::Unknown);
    }

    #[test]
    fn scores_above_one_hundred_are_rejected() {
        let record = extract("<html><body><p>Walk Score 140</p></body></html>");
        assert_eq!(record.walk_score, Field::Unknown);
    }
}
