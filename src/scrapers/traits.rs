use std::time::Duration;

use async_trait::async_trait;

use super::crawler::{CrawlReport, CrawlState};
use super::error::BrowserResult;
use super::types::CrawlPlan;

/// Where to scroll the viewport before reading lazily rendered content
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollPosition {
    Top,
    Offset(u32),
    /// Fraction of the document height, 0.0 to 1.0
    Fraction(f64),
    Bottom,
}

/// One browsing context (a tab) inside the browser session.
///
/// Every wait takes an explicit timeout; nothing here blocks unboundedly.
pub trait PageTab {
    /// Navigates and waits for the load to finish
    fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// Current `location.href`, doubling as a liveness probe
    fn location(&self) -> BrowserResult<String>;

    /// Serialized DOM of the current document
    fn content(&self) -> BrowserResult<String>;

    fn wait_for(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    fn count(&self, selector: &str) -> BrowserResult<usize>;

    /// Attribute of the first element matching `selector` once it appears.
    /// A missing element is an error, a missing attribute is `None`.
    fn attribute(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> BrowserResult<Option<String>>;

    fn scroll_to(&self, position: ScrollPosition) -> BrowserResult<()>;

    fn scroll_into_view(&self, selector: &str) -> BrowserResult<()>;

    fn click(&self, selector: &str) -> BrowserResult<()>;

    /// Clicks every button whose label contains `label`, returning how many
    fn click_buttons_containing(&self, label: &str) -> BrowserResult<usize>;

    fn activate(&self) -> BrowserResult<()>;

    fn close(&self) -> BrowserResult<()>;
}

/// A controllable browser that can be probed and rebuilt
pub trait BrowserSession {
    type Tab: PageTab;

    /// Probes the session and relaunches it if the probe fails.
    ///
    /// Returns `false` only when no usable session could be obtained. All tabs
    /// are lost on relaunch; [`BrowserSession::generation`] changes when that
    /// happens.
    fn ensure_healthy(&mut self) -> bool;

    /// Incremented every time the session is rebuilt
    fn generation(&self) -> u64;

    /// The long-lived tab holding the search results
    fn home(&self) -> &Self::Tab;

    fn open_tab(&self) -> BrowserResult<Self::Tab>;
}

/// Common trait for listing sources driven from the async entry point.
/// Allows other sites to plug in beside the browser crawler.
#[async_trait]
pub trait ListingSource: Send {
    async fn collect(&mut self, plan: &CrawlPlan, state: CrawlState) -> CrawlReport;

    /// Get the name of the listing source
    fn source_name(&self) -> &'static str;
}
