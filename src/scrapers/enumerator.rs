use std::collections::HashSet;

use tracing::{debug, info, warn};
use url::Url;

use crate::config::{CrawlConfig, Pacing};

use super::traits::{PageTab, ScrollPosition};

/// Reads listing links off a search results page and turns pages.
///
/// Slots are walked one index at a time: result grids mix in ads and
/// promotions, and a single bulk query silently drops or reorders entries.
pub struct ResultsPage<'a, T: PageTab> {
    tab: &'a T,
    config: &'a CrawlConfig,
    pacing: &'a Pacing,
}

impl<'a, T: PageTab> ResultsPage<'a, T> {
    pub fn new(tab: &'a T, config: &'a CrawlConfig, pacing: &'a Pacing) -> Self {
        Self { tab, config, pacing }
    }

    fn slot_count(&self) -> usize {
        match self.tab.count(&self.config.selectors.slots()) {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "Could not count result slots");
                0
            }
        }
    }

    /// Scrolls down in fixed steps so lazily rendered slots get attached,
    /// stopping early once the slot count stops growing. Returns to the top
    /// and reports the final slot count.
    pub fn load_all_on_page(&self) -> usize {
        let mut count = self.slot_count();
        let mut unchanged = 0;
        debug!(count, "Initial result slots");

        for step in 1..=self.config.scroll_steps {
            let offset = step.saturating_mul(self.config.scroll_step_px);
            if let Err(err) = self.tab.scroll_to(ScrollPosition::Offset(offset)) {
                warn!(error = %err, "Scroll step failed");
                break;
            }
            self.pacing.scroll_settle.pause();

            let current = self.slot_count();
            if current > count {
                debug!(loaded = current - count, "More result slots loaded");
                count = current;
                unchanged = 0;
            } else {
                unchanged += 1;
                if unchanged >= self.config.stable_rounds {
                    break;
                }
            }
        }

        if let Err(err) = self.tab.scroll_to(ScrollPosition::Top) {
            warn!(error = %err, "Could not scroll back to top");
        }
        info!(slots = count, "Results page loaded");
        count
    }

    /// Listing URLs on the current page, deduplicated and in page order.
    /// Slots without a resolvable link (ads, promos) are skipped.
    pub fn enumerate_links(&self) -> Vec<String> {
        let count = self.slot_count();
        let base = self.tab.location().ok().and_then(|href| Url::parse(&href).ok());
        let timeout = self.config.element_timeout();

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for index in 1..=count {
            let slot = self.config.selectors.slot(index);
            // best effort: scrolling the slot in lets its card render
            let _ = self.tab.scroll_into_view(&slot);

            let href = match self
                .tab
                .attribute(&self.config.selectors.slot_link(index), "href", timeout)
            {
                Ok(Some(href)) => href,
                Ok(None) | Err(_) => {
                    debug!(index, "Skipping slot without a listing link");
                    continue;
                }
            };

            let url = resolve(base.as_ref(), &href);
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }

        info!(slots = count, links = links.len(), "Collected listing links");
        links
    }

    /// Advances to the next results page.
    ///
    /// Returns `false` on the last page (control disabled) or when the control
    /// is missing or the next page never renders.
    pub fn next_page(&self) -> bool {
        let selectors = &self.config.selectors;

        let disabled = match self.tab.attribute(
            &selectors.next_page,
            "aria-disabled",
            self.config.control_timeout(),
        ) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(err) => {
                info!(error = %err, "No next page control, assuming end of results");
                return false;
            }
        };
        if disabled {
            info!("Next page control is disabled, this is the last page");
            return false;
        }

        if let Err(err) = self.tab.scroll_into_view(&selectors.next_page) {
            debug!(error = %err, "Could not scroll next page control into view");
        }
        self.pacing.scroll_settle.pause();

        if let Err(err) = self.tab.click(&selectors.next_page) {
            warn!(error = %err, "Clicking next page failed");
            return false;
        }
        self.pacing.page_turn.pause();

        match self
            .tab
            .wait_for(&selectors.results_list, self.config.page_timeout())
        {
            Ok(()) => {
                info!("Moved to the next results page");
                true
            }
            Err(err) => {
                warn!(error = %err, "Next results page never rendered");
                false
            }
        }
    }
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|base| base.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_links_resolve_against_the_page() {
        let base = Url::parse("https://www.zillow.com/salem-ma/2_p/").unwrap();
        assert_eq!(
            resolve(Some(&base), "/homedetails/12_zpid/"),
            "https://www.zillow.com/homedetails/12_zpid/"
        );
        assert_eq!(
            resolve(None, "/homedetails/12_zpid/"),
            "/homedetails/12_zpid/"
        );
    }
}
