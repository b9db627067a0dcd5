use std::path::PathBuf;

use serde::Serialize;

use crate::config::SearchTarget;

/// How a crawl finds its listings
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlSeed {
    /// Walk a paginated search results page
    Search(String),
    /// Visit these listing URLs directly, no pagination
    Listings(Vec<String>),
}

/// Everything one crawl run needs besides the browser
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub label: String,
    pub seed: CrawlSeed,
    pub max_listings: usize,
    /// Directory for checkpoint snapshots, none to disable them
    pub checkpoint_dir: Option<PathBuf>,
}

impl CrawlPlan {
    pub fn search(target: &SearchTarget) -> Self {
        Self {
            label: target.label.clone(),
            seed: CrawlSeed::Search(target.search_url.clone()),
            max_listings: target.max_listings,
            checkpoint_dir: None,
        }
    }

    pub fn listings(label: impl Into<String>, urls: Vec<String>) -> Self {
        let max_listings = urls.len();
        Self {
            label: label.into(),
            seed: CrawlSeed::Listings(urls),
            max_listings,
            checkpoint_dir: None,
        }
    }

    pub fn with_checkpoints(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn with_max_listings(mut self, max_listings: usize) -> Self {
        self.max_listings = max_listings;
        self
    }
}

/// Why a crawl stopped. Every variant still returns the records gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    NoMorePages,
    LinksExhausted,
    CircuitBreaker,
    ResultsUnavailable,
    NoListings,
    SessionUnavailable,
}
