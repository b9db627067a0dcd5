//! Browser-driven crawling: session management, result pagination,
//! per-listing tabs and the crawl state machine.

pub mod browser;
pub mod crawler;
pub mod enumerator;
pub mod error;
pub mod tab;
pub mod traits;
pub mod types;

pub use browser::{ChromeSession, ChromeTab};
pub use crawler::{CrawlReport, CrawlState, Crawler};
pub use enumerator::ResultsPage;
pub use error::{BrowserError, BrowserResult};
pub use tab::ListingTab;
pub use traits::{BrowserSession, ListingSource, PageTab, ScrollPosition};
pub use types::{CrawlPlan, CrawlSeed, StopReason};
