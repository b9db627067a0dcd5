//! Field extraction for listing pages.
//!
//! Each routine reads one region of the page and fills only its own fields.
//! Routines never fail past their own boundary: the [`Assembler`] logs and
//! swallows browser errors so later routines still run, and values that
//! cannot be found stay unknown.

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        static $name: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
            regex::Regex::new($pattern).expect("hardcoded regex pattern is valid")
        });
    };
}

mod basics;
mod features;
mod history;
mod media;
mod nearby;
pub mod page;
mod risks;
mod schools;
mod scores;
pub mod strategy;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{DelayRange, PlausibilityBounds};
use crate::models::ListingRecord;
use crate::scrapers::{BrowserResult, PageTab, ScrollPosition};

pub use basics::Basics;
pub use features::Features;
pub use history::PriceHistory;
pub use media::Media;
pub use nearby::Nearby;
pub use page::PageSnapshot;
pub use risks::ClimateRisks;
pub use schools::Schools;
pub use scores::NeighborhoodScores;

/// One independent extraction routine
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Where the routine's content renders; the page is scrolled there first
    fn region(&self) -> ScrollPosition;

    /// Interaction needed before reading, such as expanding collapsed sections
    fn prepare(&self, _tab: &dyn PageTab) -> BrowserResult<()> {
        Ok(())
    }

    /// Fills this routine's fields from a snapshot of its region
    fn apply(&self, page: &PageSnapshot, bounds: &PlausibilityBounds, record: &mut ListingRecord);
}

/// Builds a [`ListingRecord`] by running every routine in a fixed order
pub struct Assembler {
    routines: Vec<Box<dyn FieldExtractor>>,
    bounds: PlausibilityBounds,
    settle: DelayRange,
}

impl Assembler {
    /// The standard routine sequence
    pub fn new(bounds: PlausibilityBounds, settle: DelayRange) -> Self {
        Self::with_routines(
            vec![
                Box::new(Media),
                Box::new(Basics),
                Box::new(Features),
                Box::new(NeighborhoodScores),
                Box::new(Schools),
                Box::new(ClimateRisks),
                Box::new(PriceHistory),
                Box::new(Nearby),
            ],
            bounds,
            settle,
        )
    }

    pub fn with_routines(
        routines: Vec<Box<dyn FieldExtractor>>,
        bounds: PlausibilityBounds,
        settle: DelayRange,
    ) -> Self {
        Self {
            routines,
            bounds,
            settle,
        }
    }

    /// Extracts a record from the listing open in `tab`.
    ///
    /// A routine that fails leaves its fields unknown and the rest still run.
    /// When the failure turns out to be the browser going away, the listing is
    /// abandoned and the error returned instead of a half-empty record.
    pub fn assemble(&self, tab: &dyn PageTab) -> BrowserResult<ListingRecord> {
        let url = tab.location().map_err(|err| {
            warn!(error = %err, "Listing page unreadable");
            err
        })?;

        info!(url = %url, "Extracting listing");
        let mut record = ListingRecord::new(url, Utc::now());
        for routine in &self.routines {
            match self.run(routine.as_ref(), tab, &mut record) {
                Ok(()) => debug!(routine = routine.name(), "Extractor done"),
                Err(err) if err.is_session_loss() || tab.location().is_err() => {
                    warn!(
                        routine = routine.name(),
                        error = %err,
                        "Browser lost during extraction, abandoning listing"
                    );
                    return Err(err);
                }
                Err(err) => warn!(
                    routine = routine.name(),
                    error = %err,
                    "Extractor failed, its fields stay unknown"
                ),
            }
        }
        Ok(record)
    }

    fn run(
        &self,
        routine: &dyn FieldExtractor,
        tab: &dyn PageTab,
        record: &mut ListingRecord,
    ) -> BrowserResult<()> {
        tab.scroll_to(routine.region())?;
        routine.prepare(tab)?;
        self.settle.pause();
        let page = PageSnapshot::parse(tab.content()?);
        routine.apply(&page, &self.bounds, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;
    use crate::models::Field;
    use crate::scrapers::BrowserError;

    const LISTING: &str = r#"<html><body>
        <h1 data-testid="street-address">12 Derby St, Salem, MA 01970</h1>
        <span data-testid="price">$649,900</span>
        <div data-testid="bed-bath-sqft-facts">3 bd 2 ba 1,850 sqft</div>
    </body></html>"#;

    /// Serves one static listing; can be told to take the browser down on
    /// the first `content` call
    struct StaticTab {
        alive: Cell<bool>,
        crash_on_content: bool,
    }

    impl StaticTab {
        fn new(crash_on_content: bool) -> Self {
            Self {
                alive: Cell::new(true),
                crash_on_content,
            }
        }

        fn check(&self) -> BrowserResult<()> {
            if self.alive.get() {
                Ok(())
            } else {
                Err(BrowserError::Protocol("connection closed".into()))
            }
        }
    }

    impl PageTab for StaticTab {
        fn navigate(&self, _url: &str) -> BrowserResult<()> {
            self.check()
        }

        fn location(&self) -> BrowserResult<String> {
            self.check()?;
            Ok("https://www.example-homes.com/homedetails/1-1_zpid/".to_string())
        }

        fn content(&self) -> BrowserResult<String> {
            self.check()?;
            if self.crash_on_content {
                self.alive.set(false);
                return Err(BrowserError::Protocol("target crashed".into()));
            }
            Ok(LISTING.to_string())
        }

        fn wait_for(&self, _selector: &str, _timeout: Duration) -> BrowserResult<()> {
            self.check()
        }

        fn count(&self, _selector: &str) -> BrowserResult<usize> {
            self.check().map(|()| 0)
        }

        fn attribute(
            &self,
            selector: &str,
            _name: &str,
            _timeout: Duration,
        ) -> BrowserResult<Option<String>> {
            self.check()?;
            Err(BrowserError::ElementNotFound(selector.to_string()))
        }

        fn scroll_to(&self, _position: ScrollPosition) -> BrowserResult<()> {
            self.check()
        }

        fn scroll_into_view(&self, _selector: &str) -> BrowserResult<()> {
            self.check()
        }

        fn click(&self, _selector: &str) -> BrowserResult<()> {
            self.check()
        }

        fn click_buttons_containing(&self, _label: &str) -> BrowserResult<usize> {
            self.check().map(|()| 0)
        }

        fn activate(&self) -> BrowserResult<()> {
            self.check()
        }

        fn close(&self) -> BrowserResult<()> {
            Ok(())
        }
    }

    /// A routine whose section never expands
    struct Broken;

    impl FieldExtractor for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn region(&self) -> ScrollPosition {
            ScrollPosition::Top
        }

        fn prepare(&self, _tab: &dyn PageTab) -> BrowserResult<()> {
            Err(BrowserError::ElementNotFound("button.expand".into()))
        }

        fn apply(&self, _page: &PageSnapshot, _bounds: &PlausibilityBounds, record: &mut ListingRecord) {
            record.address = Field::Known("never written".into());
        }
    }

    fn assembler(routines: Vec<Box<dyn FieldExtractor>>) -> Assembler {
        Assembler::with_routines(routines, PlausibilityBounds::default(), DelayRange::NONE)
    }

    #[test]
    fn failed_routine_does_not_stop_later_ones() {
        let record = assembler(vec![Box::new(Broken), Box::new(Basics)])
            .assemble(&StaticTab::new(false))
            .unwrap();

        assert_eq!(record.price, Field::Known(649_900));
        assert_eq!(record.beds, Field::Known(3));
        assert_eq!(
            record.address,
            Field::Known("12 Derby St, Salem, MA 01970".to_string())
        );
        assert_eq!(record.image_url, Field::Unknown);
    }

    #[test]
    fn browser_dying_mid_listing_abandons_it() {
        let tab = StaticTab::new(true);
        let result = assembler(vec![Box::new(Basics), Box::new(Media)]).assemble(&tab);

        assert!(matches!(result, Err(BrowserError::Protocol(_))));
        assert!(!tab.alive.get());
    }
}
