use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::{Config, CrawlConfig, Pacing};
use crate::export::CheckpointWriter;
use crate::extract::Assembler;
use crate::models::ListingRecord;

use super::enumerator::ResultsPage;
use super::error::BrowserResult;
use super::tab::ListingTab;
use super::traits::{BrowserSession, ListingSource, PageTab};
use super::types::{CrawlPlan, CrawlSeed, StopReason};

/// Where the search crawl currently is
#[derive(Debug)]
enum CrawlPhase {
    AtResultsPage,
    EnumeratingLinks,
    VisitingListing(Vec<String>),
    Paginating,
    Done(StopReason),
}

/// Results page the crawl can return to after a browser relaunch
#[derive(Debug, Clone, Default)]
struct Cursor {
    page: usize,
    url: Option<String>,
}

/// Mutable state of one crawl, owned by the crawler while it runs
#[derive(Debug, Default)]
pub struct CrawlState {
    visited: HashSet<String>,
    records: Vec<ListingRecord>,
    consecutive_failures: u32,
    cursor: Cursor,
    checkpoints: Vec<PathBuf>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues from records saved by an earlier run; their URLs count as
    /// visited
    pub fn resume(records: Vec<ListingRecord>) -> Self {
        Self {
            visited: records.iter().map(|record| record.url.clone()).collect(),
            records,
            ..Self::default()
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    fn into_report(self, stop_reason: StopReason) -> CrawlReport {
        CrawlReport {
            records: self.records,
            stop_reason,
            pages_visited: self.cursor.page,
            checkpoints: self.checkpoints,
        }
    }
}

/// What a finished crawl hands back, whatever stopped it
#[derive(Debug)]
pub struct CrawlReport {
    pub records: Vec<ListingRecord>,
    pub stop_reason: StopReason,
    pub pages_visited: usize,
    pub checkpoints: Vec<PathBuf>,
}

/// Drives a browser session through search results and listing pages
pub struct Crawler<S: BrowserSession> {
    session: S,
    assembler: Assembler,
    config: CrawlConfig,
    pacing: Pacing,
}

impl<S: BrowserSession> Crawler<S> {
    pub fn new(session: S, assembler: Assembler, config: CrawlConfig, pacing: Pacing) -> Self {
        Self {
            session,
            assembler,
            config,
            pacing,
        }
    }

    /// Crawler with the standard extractors, tuned by `config`
    pub fn from_config(session: S, config: &Config) -> Self {
        let assembler = Assembler::new(config.bounds.clone(), config.pacing.extractor_settle);
        Self::new(session, assembler, config.crawl.clone(), config.pacing.clone())
    }

    /// Runs one crawl to completion.
    ///
    /// Never fails: every stop condition ends in a report carrying all
    /// records gathered so far.
    pub fn run(&mut self, plan: &CrawlPlan, mut state: CrawlState) -> CrawlReport {
        let checkpoints = plan.checkpoint_dir.as_ref().map(|dir| {
            CheckpointWriter::new(dir, &plan.label, self.config.checkpoint_interval)
        });

        let stop_reason = if state.records.len() >= plan.max_listings {
            StopReason::TargetReached
        } else if !self.session.ensure_healthy() {
            error!("No usable browser session");
            StopReason::SessionUnavailable
        } else {
            match &plan.seed {
                CrawlSeed::Search(url) => {
                    self.crawl_results(plan, url, &mut state, checkpoints.as_ref())
                }
                CrawlSeed::Listings(urls) => {
                    info!(count = urls.len(), "Visiting listings directly");
                    self.visit_links(plan, urls, &mut state, checkpoints.as_ref())
                        .unwrap_or(StopReason::LinksExhausted)
                }
            }
        };

        info!(
            label = %plan.label,
            collected = state.records.len(),
            requested = plan.max_listings,
            reason = ?stop_reason,
            "🏁 Crawl finished"
        );
        state.into_report(stop_reason)
    }

    fn crawl_results(
        &mut self,
        plan: &CrawlPlan,
        url: &str,
        state: &mut CrawlState,
        checkpoints: Option<&CheckpointWriter>,
    ) -> StopReason {
        info!(url, "🔍 Opening search results");
        if let Err(err) = self.session.home().navigate(url) {
            error!(error = %err, "Search page failed to load");
            return StopReason::ResultsUnavailable;
        }
        state.cursor = Cursor {
            page: 1,
            url: Some(url.to_string()),
        };
        self.pacing.after_search.pause();

        let mut phase = CrawlPhase::AtResultsPage;
        loop {
            debug!(?phase, page = state.cursor.page, "Crawl step");
            phase = match phase {
                CrawlPhase::AtResultsPage => {
                    if state.records.len() >= plan.max_listings {
                        CrawlPhase::Done(StopReason::TargetReached)
                    } else {
                        match self.wait_for_results() {
                            Ok(()) => CrawlPhase::EnumeratingLinks,
                            Err(err) => {
                                error!(error = %err, "Results never rendered");
                                CrawlPhase::Done(StopReason::ResultsUnavailable)
                            }
                        }
                    }
                }
                CrawlPhase::EnumeratingLinks => {
                    let page =
                        ResultsPage::new(self.session.home(), &self.config, &self.pacing);
                    page.load_all_on_page();
                    let links = page.enumerate_links();
                    if links.is_empty() {
                        warn!(page = state.cursor.page, "No listing links on results page");
                        CrawlPhase::Done(StopReason::NoListings)
                    } else {
                        CrawlPhase::VisitingListing(links)
                    }
                }
                CrawlPhase::VisitingListing(links) => {
                    match self.visit_links(plan, &links, state, checkpoints) {
                        Some(reason) => CrawlPhase::Done(reason),
                        None => CrawlPhase::Paginating,
                    }
                }
                CrawlPhase::Paginating => {
                    let home = self.session.home();
                    if ResultsPage::new(home, &self.config, &self.pacing).next_page() {
                        state.cursor.page += 1;
                        state.cursor.url = home.location().ok();
                        state.consecutive_failures = 0;
                        info!(page = state.cursor.page, "📄 Results page");
                        CrawlPhase::AtResultsPage
                    } else {
                        CrawlPhase::Done(StopReason::NoMorePages)
                    }
                }
                CrawlPhase::Done(reason) => return reason,
            };
        }
    }

    fn wait_for_results(&self) -> BrowserResult<()> {
        self.session
            .home()
            .wait_for(&self.config.selectors.results_list, self.config.page_timeout())
    }

    /// Visits `links` in order. Returns the stop reason if the crawl must
    /// end, `None` when every link was handled.
    fn visit_links(
        &mut self,
        plan: &CrawlPlan,
        links: &[String],
        state: &mut CrawlState,
        checkpoints: Option<&CheckpointWriter>,
    ) -> Option<StopReason> {
        for link in links {
            if state.records.len() >= plan.max_listings {
                info!(max = plan.max_listings, "🎯 Target reached");
                return Some(StopReason::TargetReached);
            }
            if !state.visited.insert(link.clone()) {
                debug!(url = %link, "Already visited");
                continue;
            }

            self.pacing.between_listings.pause();
            match self.visit(link) {
                Ok(record) => {
                    state.records.push(record);
                    state.consecutive_failures = 0;
                    info!(
                        "✅ [{}/{}] {}",
                        state.records.len(),
                        plan.max_listings,
                        link
                    );
                    if let Some(path) = checkpoints.and_then(|writer| writer.maybe_write(&state.records)) {
                        state.checkpoints.push(path);
                    }
                }
                Err(err) => {
                    state.consecutive_failures += 1;
                    warn!(
                        url = %link,
                        error = %err,
                        failures = state.consecutive_failures,
                        "❌ Listing failed"
                    );
                    if state.consecutive_failures >= self.config.failure_threshold {
                        error!(
                            failures = state.consecutive_failures,
                            "Too many consecutive failures, stopping"
                        );
                        return Some(StopReason::CircuitBreaker);
                    }
                    if let Err(reason) = self.recover(state) {
                        return Some(reason);
                    }
                }
            }
        }

        (state.records.len() >= plan.max_listings).then_some(StopReason::TargetReached)
    }

    /// One listing in its own tab. The tab is closed before returning.
    fn visit(&self, url: &str) -> BrowserResult<ListingRecord> {
        let tab = ListingTab::open(&self.session)?;
        tab.navigate(url)?;
        self.pacing.after_navigation.pause();
        let record = self.assembler.assemble(&*tab);
        drop(tab);
        self.pacing.after_close.pause();
        record
    }

    /// Checks the session after a failure. A relaunch loses every tab, so the
    /// results page is reloaded from the cursor.
    fn recover(&mut self, state: &CrawlState) -> Result<(), StopReason> {
        let generation = self.session.generation();
        if !self.session.ensure_healthy() {
            error!("Browser session could not be recovered");
            return Err(StopReason::SessionUnavailable);
        }
        if self.session.generation() == generation {
            return Ok(());
        }

        let Some(url) = state.cursor.url.as_deref() else {
            return Ok(());
        };
        info!(url, page = state.cursor.page, "Reloading results page after relaunch");
        let reloaded = self
            .session
            .home()
            .navigate(url)
            .and_then(|()| self.wait_for_results());
        match reloaded {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(error = %err, "Results page lost after relaunch");
                Err(StopReason::ResultsUnavailable)
            }
        }
    }
}

#[async_trait]
impl<S> ListingSource for Crawler<S>
where
    S: BrowserSession + Send,
{
    async fn collect(&mut self, plan: &CrawlPlan, state: CrawlState) -> CrawlReport {
        // browser calls block; keep them off the async workers
        tokio::task::block_in_place(|| self.run(plan, state))
    }

    fn source_name(&self) -> &'static str {
        "browser-crawler"
    }
}
