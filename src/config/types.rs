use std::path::PathBuf;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub crawl: CrawlConfig,
    pub pacing: Pacing,
    pub bounds: PlausibilityBounds,
    pub output: OutputConfig,
    pub targets: Vec<SearchTarget>,
}

/// One search to crawl: a results URL built for a location plus a target count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTarget {
    pub label: String,
    pub search_url: String,
    #[serde(default = "default_max_listings")]
    pub max_listings: usize,
}

fn default_max_listings() -> usize {
    50
}

/// Launch parameters for the Chrome session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub user_agents: Vec<String>,
    pub window_width: u32,
    pub window_height: u32,
    /// Seconds Chrome may sit idle before the connection is dropped
    pub idle_timeout_secs: u64,
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15".to_string(),
            ],
            window_width: 1366,
            window_height: 900,
            idle_timeout_secs: 300,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Picks an identity string for a fresh session
    pub fn pick_user_agent(&self) -> Option<&str> {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }
}

/// CSS selectors for the search results page.
///
/// Kept in configuration because the site changes them without notice.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    pub results_list: String,
    pub result_slot: String,
    pub listing_link: String,
    pub next_page: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            results_list: "#grid-search-results > ul".to_string(),
            result_slot: "li".to_string(),
            listing_link: r#"a[href*="/homedetails/"]"#.to_string(),
            next_page: r#"a[title="Next page"]"#.to_string(),
        }
    }
}

impl SiteSelectors {
    pub fn slots(&self) -> String {
        format!("{} > {}", self.results_list, self.result_slot)
    }

    /// Selector for the slot at a 1-based position
    pub fn slot(&self, index: usize) -> String {
        format!(
            "{} > {}:nth-of-type({})",
            self.results_list, self.result_slot, index
        )
    }

    pub fn slot_link(&self, index: usize) -> String {
        format!("{} {}", self.slot(index), self.listing_link)
    }
}

/// Crawl loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Consecutive listing failures before the run is abandoned
    pub failure_threshold: u32,
    /// Records between checkpoint snapshots
    pub checkpoint_interval: usize,
    pub scroll_steps: u32,
    pub scroll_step_px: u32,
    /// Steps without new slots before scrolling stops early
    pub stable_rounds: u32,
    pub element_timeout_ms: u64,
    pub control_timeout_ms: u64,
    pub page_timeout_ms: u64,
    pub selectors: SiteSelectors,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            checkpoint_interval: 50,
            scroll_steps: 5,
            scroll_step_px: 800,
            stable_rounds: 2,
            element_timeout_ms: 2_000,
            control_timeout_ms: 5_000,
            page_timeout_ms: 15_000,
            selectors: SiteSelectors::default(),
        }
    }
}

impl CrawlConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }
}

/// Inclusive range of seconds to wait, sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const NONE: DelayRange = DelayRange {
        min_secs: 0.0,
        max_secs: 0.0,
    };

    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn sample(&self) -> Duration {
        if self.max_secs <= 0.0 {
            return Duration::ZERO;
        }
        let secs = if self.max_secs > self.min_secs {
            rand::thread_rng().gen_range(self.min_secs..=self.max_secs)
        } else {
            self.max_secs
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Blocks the current thread for a sampled delay
    pub fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Randomized waits between browser actions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub after_search: DelayRange,
    pub between_listings: DelayRange,
    pub after_navigation: DelayRange,
    pub after_close: DelayRange,
    pub scroll_settle: DelayRange,
    pub extractor_settle: DelayRange,
    pub page_turn: DelayRange,
    pub between_targets: DelayRange,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            after_search: DelayRange::new(3.5, 5.5),
            between_listings: DelayRange::new(3.0, 6.0),
            after_navigation: DelayRange::new(1.0, 1.0),
            after_close: DelayRange::new(0.5, 1.5),
            scroll_settle: DelayRange::new(1.5, 2.0),
            extractor_settle: DelayRange::new(1.0, 2.0),
            page_turn: DelayRange::new(2.5, 3.5),
            between_targets: DelayRange::new(30.0, 90.0),
        }
    }
}

impl Pacing {
    /// No waiting at all, for tests and replays
    pub fn disabled() -> Self {
        Self {
            after_search: DelayRange::NONE,
            between_listings: DelayRange::NONE,
            after_navigation: DelayRange::NONE,
            after_close: DelayRange::NONE,
            scroll_settle: DelayRange::NONE,
            extractor_settle: DelayRange::NONE,
            page_turn: DelayRange::NONE,
            between_targets: DelayRange::NONE,
        }
    }

    pub(crate) fn ranges(&self) -> [(&'static str, DelayRange); 8] {
        [
            ("after_search", self.after_search),
            ("between_listings", self.between_listings),
            ("after_navigation", self.after_navigation),
            ("after_close", self.after_close),
            ("scroll_settle", self.scroll_settle),
            ("extractor_settle", self.extractor_settle),
            ("page_turn", self.page_turn),
            ("between_targets", self.between_targets),
        ]
    }
}

/// Inclusive numeric range a candidate value must fall in to be accepted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Plausibility bounds for extracted numbers.
///
/// These were tuned against observed listings rather than any published rule,
/// so they are configurable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlausibilityBounds {
    pub beds: Bounds,
    pub baths: Bounds,
    pub sqft: Bounds,
    pub score: Bounds,
    pub risk_score: Bounds,
    pub school_distance_mi: Bounds,
    pub year_built: Bounds,
}

impl Default for PlausibilityBounds {
    fn default() -> Self {
        Self {
            beds: Bounds::new(1.0, 10.0),
            baths: Bounds::new(0.5, 10.0),
            sqft: Bounds::new(300.0, 20_000.0),
            score: Bounds::new(0.0, 100.0),
            risk_score: Bounds::new(1.0, 10.0),
            school_distance_mi: Bounds::new(0.1, 50.0),
            year_built: Bounds::new(1700.0, 2100.0),
        }
    }
}

impl PlausibilityBounds {
    pub(crate) fn all(&self) -> [(&'static str, Bounds); 7] {
        [
            ("beds", self.beds),
            ("baths", self.baths),
            ("sqft", self.sqft),
            ("score", self.score),
            ("risk_score", self.risk_score),
            ("school_distance_mi", self.school_distance_mi),
            ("year_built", self.year_built),
        ]
    }
}

/// Where exports land
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            file_prefix: "listings".to_string(),
        }
    }
}
