use crate::config::PlausibilityBounds;
use crate::models::{Field, ListingRecord};
use crate::scrapers::ScrollPosition;

use super::page::PageSnapshot;
use super::strategy::{
    bounded_any, first_capture, parse_number, resolve, squash, Outcome, Strategy,
};
use super::FieldExtractor;

const PRICE_SELECTORS: &[&str] = &[
    r#"span[data-testid="price"]"#,
    r#"[data-testid="price"] span"#,
    ".notranslate",
    "h3 span",
];
const FACTS_SELECTOR: &str = r#"[data-testid="bed-bath-sqft-facts"]"#;
const FALLBACK_FACTS_SELECTORS: &[&str] = &[
    r#"[data-testid="property-facts"]"#,
    r#"[data-testid="facts-container"]"#,
    ".summary-container",
    r#"section[aria-label*="facts"]"#,
];
const ADDRESS_SELECTORS: &[&str] = &[r#"h1[data-testid="street-address"]"#, "h1"];

static_regex!(PRICE_EXACT, r"^\$(\d[\d,]*)(?:\.\d{2})?$");
static_regex!(BEDS, r"(?i)\b(\d+)\s*(?:beds?|bds?)\b");
static_regex!(BATHS, r"(?i)\b(\d+(?:\.\d+)?)\s*(?:baths?|ba)\b");
static_regex!(SQFT, r"(?i)\b(\d[\d,]*)\s*(?:sq\.?\s*ft|sqft)\b");
static_regex!(BEDS_JSON, r#""(?:bedrooms|beds)"\s*:\s*(\d+)"#);
static_regex!(BATHS_JSON, r#""(?:bathrooms|baths)"\s*:\s*(\d+(?:\.\d+)?)"#);
static_regex!(SQFT_JSON, r#""(?:livingArea|floorSize)"\s*:\s*(\d+)"#);
static_regex!(
    PROPERTY_TYPE,
    r"(?i)\b(single[\s_-]?family|multi[\s_-]?family|condominium|condo|townhouse|townhome|manufactured|apartment)\b"
);
static_regex!(YEAR_BUILT_IN, r"(?i)built in (\d{4})");
static_regex!(YEAR_BUILT_LABEL, r"(?i)year built:?\s*(\d{4})");
static_regex!(YEAR_BUILT_LOOSE, r"(?i)built:?\s+(\d{4})");
static_regex!(PRICE_PER_SQFT, r"(?i)\$(\d[\d,]*)\s*/\s*sq\.?\s*ft");
static_regex!(PRICE_PER_SQFT_LABEL, r"(?i)price\s*/\s*sqft:?\s*\$(\d[\d,]*)");
static_regex!(
    LOT_SQFT,
    r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(?:square\s*feet|sq\.?\s*ft|sqft)\s*lot"
);
static_regex!(LOT_ACRES, r"(?i)(\d[\d,]*(?:\.\d+)?)\s*acres?\s*lot");
static_regex!(
    LOT_SIZE_LABEL,
    r"(?i)lot\s*size:?\s*(\d[\d,]*(?:\.\d+)?)\s*(acres?|square\s*feet|sq\.?\s*ft|sqft)"
);
static_regex!(ACRES, r"(?i)\b(\d+(?:\.\d+)?)\s*acres?\b");

/// Price, beds/baths/area, address and the other headline facts
pub struct Basics;

struct Ctx<'a> {
    page: &'a PageSnapshot,
    bounds: &'a PlausibilityBounds,
    facts: Vec<String>,
    fallback: Vec<String>,
}

impl<'a> Ctx<'a> {
    fn new(page: &'a PageSnapshot, bounds: &'a PlausibilityBounds) -> Self {
        Self {
            page,
            bounds,
            facts: page.select_texts(FACTS_SELECTOR),
            fallback: FALLBACK_FACTS_SELECTORS
                .iter()
                .flat_map(|css| page.select_texts(css))
                .collect(),
        }
    }

    fn facts(&self) -> Vec<&str> {
        self.facts.iter().map(String::as_str).collect()
    }

    fn fallback(&self) -> Vec<&str> {
        self.fallback.iter().map(String::as_str).collect()
    }

    /// Rendered text first, then raw source
    fn page_wide(&self) -> [&str; 2] {
        [self.page.text(), self.page.source()]
    }
}

impl FieldExtractor for Basics {
    fn name(&self) -> &'static str {
        "basics"
    }

    fn region(&self) -> ScrollPosition {
        ScrollPosition::Top
    }

    fn apply(&self, page: &PageSnapshot, bounds: &PlausibilityBounds, record: &mut ListingRecord) {
        let ctx = Ctx::new(page, bounds);

        let price: [Strategy<Ctx<'_>, u64>; 2] = [
            Strategy {
                name: "price element",
                run: |c| {
                    Outcome::from_option(
                        PRICE_SELECTORS
                            .iter()
                            .flat_map(|css| c.page.select_texts(css))
                            .find_map(|text| exact_price(&text)),
                    )
                },
            },
            Strategy {
                name: "dollar span",
                run: |c| {
                    Outcome::from_option(
                        c.page
                            .select_texts("span")
                            .iter()
                            .find_map(|text| exact_price(text)),
                    )
                },
            },
        ];

        let beds: [Strategy<Ctx<'_>, f64>; 4] = [
            Strategy {
                name: "facts container",
                run: |c| bounded_any(&c.facts(), &[&BEDS], c.bounds.beds),
            },
            Strategy {
                name: "fallback containers",
                run: |c| bounded_any(&c.fallback(), &[&BEDS], c.bounds.beds),
            },
            Strategy {
                name: "page text",
                run: |c| bounded_any(&[c.page.text()], &[&BEDS], c.bounds.beds),
            },
            Strategy {
                name: "embedded json",
                run: |c| bounded_any(&[c.page.source()], &[&BEDS_JSON], c.bounds.beds),
            },
        ];

        let baths: [Strategy<Ctx<'_>, f64>; 4] = [
            Strategy {
                name: "facts container",
                run: |c| bounded_any(&c.facts(), &[&BATHS], c.bounds.baths),
            },
            Strategy {
                name: "fallback containers",
                run: |c| bounded_any(&c.fallback(), &[&BATHS], c.bounds.baths),
            },
            Strategy {
                name: "page text",
                run: |c| bounded_any(&[c.page.text()], &[&BATHS], c.bounds.baths),
            },
            Strategy {
                name: "embedded json",
                run: |c| bounded_any(&[c.page.source()], &[&BATHS_JSON], c.bounds.baths),
            },
        ];

        let sqft: [Strategy<Ctx<'_>, f64>; 4] = [
            Strategy {
                name: "facts container",
                run: |c| bounded_any(&c.facts(), &[&SQFT], c.bounds.sqft),
            },
            Strategy {
                name: "fallback containers",
                run: |c| bounded_any(&c.fallback(), &[&SQFT], c.bounds.sqft),
            },
            Strategy {
                name: "page text",
                run: |c| bounded_any(&[c.page.text()], &[&SQFT], c.bounds.sqft),
            },
            Strategy {
                name: "embedded json",
                run: |c| bounded_any(&[c.page.source()], &[&SQFT_JSON], c.bounds.sqft),
            },
        ];

        let year: [Strategy<Ctx<'_>, f64>; 1] = [Strategy {
            name: "built in",
            run: |c| {
                bounded_any(
                    &c.page_wide(),
                    &[&YEAR_BUILT_IN, &YEAR_BUILT_LABEL, &YEAR_BUILT_LOOSE],
                    c.bounds.year_built,
                )
            },
        }];

        record.price = resolve("price", &ctx, &price);
        record.beds = narrow(resolve("beds", &ctx, &beds), |v| v as u8);
        record.baths = narrow(resolve("baths", &ctx, &baths), |v| v as f32);
        record.sqft = narrow(resolve("sqft", &ctx, &sqft), |v| v as u32);
        record.year_built = narrow(resolve("year_built", &ctx, &year), |v| v as u16);
        record.address = address(page).into();
        record.property_type = property_type(&ctx).into();
        record.price_per_sqft = price_per_sqft(&ctx).into();
        record.sqft_lot = lot_size(&ctx).into();
    }
}

fn narrow<U>(field: Field<f64>, convert: fn(f64) -> U) -> Field<U> {
    match field {
        Field::Known(value) => Field::Known(convert(value)),
        Field::Unknown => Field::Unknown,
    }
}

fn exact_price(text: &str) -> Option<u64> {
    let caps = PRICE_EXACT.captures(text.trim())?;
    parse_number(caps.get(1)?.as_str()).map(|value| value as u64)
}

fn address(page: &PageSnapshot) -> Option<String> {
    ADDRESS_SELECTORS
        .iter()
        .flat_map(|css| page.select_texts(css))
        .map(|text| squash(&text))
        .find(|text| looks_like_address(text))
}

fn looks_like_address(text: &str) -> bool {
    text.len() < 160
        && text.chars().any(|c| c.is_ascii_digit())
        && text.chars().any(|c| c.is_alphabetic())
        && text.contains(' ')
}

fn property_type(ctx: &Ctx<'_>) -> Option<String> {
    ctx.page_wide().iter().find_map(|text| {
        PROPERTY_TYPE.captures(text).map(|caps| {
            caps[1]
                .to_lowercase()
                .replace(['_', '-'], " ")
                .replace("singlefamily", "single family")
                .replace("multifamily", "multi family")
        })
    })
}

fn price_per_sqft(ctx: &Ctx<'_>) -> Option<u32> {
    ctx.page_wide()
        .iter()
        .find_map(|text| first_capture(text, &[&PRICE_PER_SQFT, &PRICE_PER_SQFT_LABEL]))
        .and_then(|raw| parse_number(&raw))
        .map(|value| value as u32)
}

fn lot_size(ctx: &Ctx<'_>) -> Option<String> {
    ctx.page_wide().iter().find_map(|text| lot_size_in(text))
}

fn lot_size_in(text: &str) -> Option<String> {
    if let Some(size) = first_capture(text, &[&LOT_SQFT]) {
        return Some(format!("{size} sqft"));
    }
    if let Some(size) = first_capture(text, &[&LOT_ACRES]) {
        return Some(format!("{size} acres"));
    }
    if let Some(caps) = LOT_SIZE_LABEL.captures(text) {
        let unit = if caps[2].to_lowercase().starts_with("acre") {
            "acres"
        } else {
            "sqft"
        };
        return Some(format!("{} {unit}", &caps[1]));
    }
    first_capture(text, &[&ACRES]).map(|size| format!("{size} acres"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> ListingRecord {
        let page = PageSnapshot::parse(html);
        let mut record = ListingRecord::new("https://example.com/homedetails/1_zpid/", chrono::Utc::now());
        Basics.apply(&page, &PlausibilityBounds::default(), &mut record);
        record
    }

    #[test]
    fn implausible_bed_count_is_discarded() {
        let record = extract("<html><body><p>55 bed, 2 bath, 1200 sqft</p></body></html>");
        assert_eq!(record.beds, Field::Unknown);
        assert_eq!(record.baths, Field::Known(2.0));
        assert_eq!(record.sqft, Field::Known(1200));
    }

    #[test]
    fn facts_container_wins_over_page_text() {
        let record = extract(
            r#"<html><body>
                <div data-testid="bed-bath-sqft-facts"><span>3</span><span>bd</span><span>2.5</span><span>ba</span><span>1,850</span><span>sqft</span></div>
                <p>Compare: 5 beds, 4 baths, 4,000 sqft nearby</p>
            </body></html>"#,
        );
        assert_eq!(record.beds, Field::Known(3));
        assert_eq!(record.baths, Field::Known(2.5));
        assert_eq!(record.sqft, Field::Known(1850));
    }

    #[test]
    fn falls_back_to_embedded_json() {
        let record = extract(
            r#"<html><head><script>{"bedrooms":4,"bathrooms":3,"livingArea":2400}</script></head>
            <body><p>No facts rendered yet</p></body></html>"#,
        );
        assert_eq!(record.beds, Field::Known(4));
        assert_eq!(record.baths, Field::Known(3.0));
        assert_eq!(record.sqft, Field::Known(2400));
    }

    #[test]
    fn headline_facts() {
        let record = extract(
            r#"<html><body>
                <h1 data-testid="street-address">12 Derby St,
                    Salem, MA 01970</h1>
                <span data-testid="price">$649,900</span>
                <ul>
                    <li>Single Family Residence</li>
                    <li>Built in 1925</li>
                    <li>$351/sqft</li>
                    <li>0.31 Acres Lot</li>
                </ul>
            </body></html>"#,
        );
        assert_eq!(record.price, Field::Known(649_900));
        assert_eq!(
            record.address,
            Field::Known("12 Derby St, Salem, MA 01970".to_string())
        );
        assert_eq!(record.property_type, Field::Known("single family".to_string()));
        assert_eq!(record.year_built, Field::Known(1925));
        assert_eq!(record.price_per_sqft, Field::Known(351));
        assert_eq!(record.sqft_lot, Field::Known("0.31 acres".to_string()));
    }

    #[test]
    fn lot_size_in_square_feet() {
        assert_eq!(
            lot_size_in("4,373 Square Feet Lot"),
            Some("4,373 sqft".to_string())
        );
        assert_eq!(
            lot_size_in("Lot size: 6,000 sqft"),
            Some("6,000 sqft".to_string())
        );
        assert_eq!(lot_size_in("no lot here"), None);
    }

    #[test]
    fn empty_page_leaves_everything_unknown() {
        let record = extract("<html><body></body></html>");
        assert_eq!(record.price, Field::Unknown);
        assert_eq!(record.beds, Field::Unknown);
        assert_eq!(record.address, Field::Unknown);
        assert_eq!(record.sqft_lot, Field::Unknown);
    }
}
