use crate::config::PlausibilityBounds;
use crate::models::ListingRecord;
use crate::scrapers::ScrollPosition;

use super::page::PageSnapshot;
use super::FieldExtractor;

const IMAGE_SELECTORS: &[&str] = &[
    r#"img[data-testid*="property-image"]"#,
    r#"img[alt*="property"]"#,
    r#"img[src*="photos.zillowstatic.com"]"#,
    ".media-stream img",
    ".photo-carousel img",
    "picture img",
    "section img",
    "main img",
];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];
const NOT_PHOTOS: &[&str] = &["icon", "logo", "avatar", "blank", "placeholder"];

static_regex!(PHOTO_HOST_URL, r#"https://photos\.zillowstatic\.com/[^"'>\s]+"#);
static_regex!(ANY_ZILLOW_IMAGE, r#"https://[^"'>\s]*zillow[^"'>\s]*\.(?:jpg|webp)"#);

/// Primary listing photo
pub struct Media;

impl FieldExtractor for Media {
    fn name(&self) -> &'static str {
        "media"
    }

    fn region(&self) -> ScrollPosition {
        ScrollPosition::Top
    }

    fn apply(&self, page: &PageSnapshot, _bounds: &PlausibilityBounds, record: &mut ListingRecord) {
        record.image_url = primary_photo(page).into();
    }
}

fn primary_photo(page: &PageSnapshot) -> Option<String> {
    let from_elements = IMAGE_SELECTORS
        .iter()
        .filter_map(|css| page.select_attrs(css, "src").into_iter().next())
        .find(|src| is_listing_photo(src));
    if from_elements.is_some() {
        return from_elements;
    }

    [&*PHOTO_HOST_URL, &*ANY_ZILLOW_IMAGE]
        .iter()
        .flat_map(|pattern| pattern.find_iter(page.source()))
        .map(|m| m.as_str().to_string())
        .find(|src| is_listing_photo(src))
}

fn is_listing_photo(src: &str) -> bool {
    if src.len() <= 30 {
        return false;
    }
    let lower = src.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or(&lower);
    lower.contains("zillow")
        && IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        && !NOT_PHOTOS.iter().any(|word| lower.contains(word))
}
