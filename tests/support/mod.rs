//! In-memory browser for crawl tests.
//!
//! The fake serves a paginated results page and listing pages from plain
//! data, records every tab it hands out and can be told to fail or crash on
//! specific listing URLs.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use listing_scout::config::{Config, CrawlConfig, Pacing, SiteSelectors};
use listing_scout::scrapers::{
    BrowserError, BrowserResult, BrowserSession, Crawler, PageTab, ScrollPosition,
};

pub const SEARCH_URL: &str = "https://www.example-homes.com/salem-ma/";

pub fn listing_url(page: usize, slot: usize) -> String {
    format!("https://www.example-homes.com/homedetails/{page}-{slot}_zpid/")
}

pub fn listing_html(url: &str) -> String {
    format!(
        r#"<html><body>
            <h1 data-testid="street-address">12 Derby St, Salem, MA 01970</h1>
            <span data-testid="price">$649,900</span>
            <div data-testid="bed-bath-sqft-facts">3 bd 2 ba 1,850 sqft</div>
            <a href="{url}">permalink</a>
        </body></html>"#
    )
}

#[derive(Debug, Default)]
pub struct SiteState {
    /// Result slots per results page; `None` is an ad or promo card with no
    /// listing link
    pub pages: Vec<Vec<Option<String>>>,
    pub failing: HashSet<String>,
    /// Navigating here kills the browser once
    pub crash_on: HashSet<String>,
    /// Reading this listing's page kills the browser once
    pub crash_on_content: HashSet<String>,
    /// Results pages never render
    pub results_broken: bool,

    pub alive: bool,
    pub generation: u64,
    pub results_page: usize,
    pub home_loaded: bool,
    pub home_loads: Vec<String>,
    pub tabs_opened: usize,
    pub tabs_closed: usize,
    pub listing_visits: Vec<String>,
}

#[derive(Clone)]
pub struct FakeSite {
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        Self::with_slots(
            pages
                .into_iter()
                .map(|links| links.into_iter().map(Some).collect())
                .collect(),
        )
    }

    pub fn with_slots(pages: Vec<Vec<Option<String>>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SiteState {
                pages,
                alive: true,
                ..SiteState::default()
            })),
        }
    }

    /// `pages` results pages with `per_page` distinct listings each
    pub fn grid(pages: usize, per_page: usize) -> Self {
        Self::new(
            (1..=pages)
                .map(|page| (1..=per_page).map(|slot| listing_url(page, slot)).collect())
                .collect(),
        )
    }

    pub fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    pub fn session(&self) -> FakeSession {
        FakeSession {
            home: FakeTab {
                state: Arc::clone(&self.state),
                selectors: SiteSelectors::default(),
                role: Role::Home,
                location: Mutex::new(String::from("about:blank")),
            },
            state: Arc::clone(&self.state),
        }
    }
}

enum Role {
    Home,
    Listing,
}

pub struct FakeTab {
    state: Arc<Mutex<SiteState>>,
    selectors: SiteSelectors,
    role: Role,
    location: Mutex<String>,
}

impl FakeTab {
    fn lock(&self) -> BrowserResult<MutexGuard<'_, SiteState>> {
        let state = self.state.lock().unwrap();
        if state.alive {
            Ok(state)
        } else {
            Err(BrowserError::SessionLost("fake browser is down".into()))
        }
    }

    fn current_links(state: &SiteState) -> &[Option<String>] {
        if !state.home_loaded {
            return &[];
        }
        state
            .pages
            .get(state.results_page)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn slot_index(&self, selector: &str, count: usize) -> Option<usize> {
        (1..=count).find(|index| self.selectors.slot_link(*index) == selector)
    }
}

impl PageTab for FakeTab {
    fn navigate(&self, url: &str) -> BrowserResult<()> {
        let mut state = self.lock()?;
        match self.role {
            Role::Home => {
                state.home_loads.push(url.to_string());
                state.home_loaded = true;
                if url == SEARCH_URL {
                    state.results_page = 0;
                }
            }
            Role::Listing => {
                state.listing_visits.push(url.to_string());
                if state.crash_on.remove(url) {
                    state.alive = false;
                    return Err(BrowserError::SessionLost("renderer crashed".into()));
                }
                if state.failing.contains(url) {
                    return Err(BrowserError::navigation(url, "net::ERR_CONNECTION_RESET"));
                }
            }
        }
        *self.location.lock().unwrap() = url.to_string();
        Ok(())
    }

    fn location(&self) -> BrowserResult<String> {
        let state = self.lock()?;
        Ok(match self.role {
            Role::Home => format!("{SEARCH_URL}{}_p/", state.results_page + 1),
            Role::Listing => self.location.lock().unwrap().clone(),
        })
    }

    fn content(&self) -> BrowserResult<String> {
        let mut state = self.lock()?;
        match self.role {
            Role::Home => Ok(String::new()),
            Role::Listing => {
                let location = self.location.lock().unwrap().clone();
                if state.crash_on_content.remove(&location) {
                    state.alive = false;
                    return Err(BrowserError::Protocol("target crashed".into()));
                }
                Ok(listing_html(&location))
            }
        }
    }

    fn wait_for(&self, selector: &str, _timeout: Duration) -> BrowserResult<()> {
        let state = self.lock()?;
        if selector == self.selectors.results_list && state.home_loaded && !state.results_broken {
            Ok(())
        } else {
            Err(BrowserError::Timeout(selector.to_string()))
        }
    }

    fn count(&self, selector: &str) -> BrowserResult<usize> {
        let state = self.lock()?;
        if selector == self.selectors.slots() {
            Ok(Self::current_links(&state).len())
        } else {
            Ok(0)
        }
    }

    fn attribute(
        &self,
        selector: &str,
        name: &str,
        _timeout: Duration,
    ) -> BrowserResult<Option<String>> {
        let state = self.lock()?;
        if selector == self.selectors.next_page {
            let last = state.results_page + 1 >= state.pages.len();
            return match name {
                "aria-disabled" => Ok(Some(last.to_string())),
                _ => Ok(None),
            };
        }

        let links = Self::current_links(&state);
        match self.slot_index(selector, links.len()) {
            Some(index) => match &links[index - 1] {
                Some(href) if name == "href" => Ok(Some(href.clone())),
                Some(_) => Ok(None),
                None => Err(BrowserError::ElementNotFound(selector.to_string())),
            },
            None => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    fn scroll_to(&self, _position: ScrollPosition) -> BrowserResult<()> {
        self.lock().map(|_| ())
    }

    fn scroll_into_view(&self, _selector: &str) -> BrowserResult<()> {
        self.lock().map(|_| ())
    }

    fn click(&self, selector: &str) -> BrowserResult<()> {
        let mut state = self.lock()?;
        if selector == self.selectors.next_page && state.results_page + 1 < state.pages.len() {
            state.results_page += 1;
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(selector.to_string()))
        }
    }

    fn click_buttons_containing(&self, _label: &str) -> BrowserResult<usize> {
        self.lock().map(|_| 0)
    }

    fn activate(&self) -> BrowserResult<()> {
        self.lock().map(|_| ())
    }

    fn close(&self) -> BrowserResult<()> {
        // closing works on a dead browser too; the tab is gone either way
        self.state.lock().unwrap().tabs_closed += 1;
        Ok(())
    }
}

pub struct FakeSession {
    home: FakeTab,
    state: Arc<Mutex<SiteState>>,
}

impl BrowserSession for FakeSession {
    type Tab = FakeTab;

    fn ensure_healthy(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.alive {
            state.alive = true;
            state.generation += 1;
            state.home_loaded = false;
        }
        true
    }

    fn generation(&self) -> u64 {
        self.state.lock().unwrap().generation
    }

    fn home(&self) -> &FakeTab {
        &self.home
    }

    fn open_tab(&self) -> BrowserResult<FakeTab> {
        let mut state = self.state.lock().unwrap();
        if !state.alive {
            return Err(BrowserError::SessionLost("fake browser is down".into()));
        }
        state.tabs_opened += 1;
        Ok(FakeTab {
            state: Arc::clone(&self.state),
            selectors: SiteSelectors::default(),
            role: Role::Listing,
            location: Mutex::new(String::from("about:blank")),
        })
    }
}

/// Config with every delay zeroed
pub fn quiet_config() -> Config {
    Config {
        pacing: Pacing::disabled(),
        crawl: CrawlConfig::default(),
        ..Config::default()
    }
}

pub fn crawler(site: &FakeSite) -> Crawler<FakeSession> {
    Crawler::from_config(site.session(), &quiet_config())
}
