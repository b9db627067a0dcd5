mod support;

use listing_scout::config::{CrawlConfig, Pacing};
use listing_scout::scrapers::{BrowserSession, PageTab, ResultsPage};

use support::{listing_url, FakeSite, SEARCH_URL};

#[test]
fn enumerates_slots_in_page_order() {
    let site = FakeSite::grid(1, 6);
    let session = site.session();
    session.home().navigate(SEARCH_URL).unwrap();

    let (config, pacing) = (CrawlConfig::default(), Pacing::disabled());
    let page = ResultsPage::new(session.home(), &config, &pacing);

    assert_eq!(page.load_all_on_page(), 6);
    let links = page.enumerate_links();
    assert_eq!(links.len(), 6);
    assert_eq!(links[0], listing_url(1, 1));
    assert_eq!(links[5], listing_url(1, 6));
}

#[test]
fn duplicate_slots_collapse() {
    let site = FakeSite::new(vec![vec![
        listing_url(1, 1),
        listing_url(1, 2),
        listing_url(1, 1),
    ]]);
    let session = site.session();
    session.home().navigate(SEARCH_URL).unwrap();

    let (config, pacing) = (CrawlConfig::default(), Pacing::disabled());
    let links = ResultsPage::new(session.home(), &config, &pacing).enumerate_links();
    assert_eq!(links, vec![listing_url(1, 1), listing_url(1, 2)]);
}

#[test]
fn ad_slot_in_the_middle_is_skipped() {
    let site = FakeSite::with_slots(vec![vec![
        Some(listing_url(1, 1)),
        None,
        Some(listing_url(1, 3)),
    ]]);
    let session = site.session();
    session.home().navigate(SEARCH_URL).unwrap();

    let (config, pacing) = (CrawlConfig::default(), Pacing::disabled());
    let page = ResultsPage::new(session.home(), &config, &pacing);

    assert_eq!(page.load_all_on_page(), 3);
    assert_eq!(page.enumerate_links(), vec![listing_url(1, 1), listing_url(1, 3)]);
}

#[test]
fn next_page_is_refused_on_the_last_page() {
    let site = FakeSite::grid(2, 2);
    let session = site.session();
    session.home().navigate(SEARCH_URL).unwrap();

    let (config, pacing) = (CrawlConfig::default(), Pacing::disabled());
    let page = ResultsPage::new(session.home(), &config, &pacing);

    assert!(page.next_page());
    assert_eq!(site.state().results_page, 1);
    assert!(!page.next_page());
    assert_eq!(site.state().results_page, 1);
}

#[test]
fn dead_session_is_replaced_with_a_new_generation() {
    let site = FakeSite::grid(1, 1);
    let mut session = site.session();
    assert!(session.ensure_healthy());
    assert_eq!(session.generation(), 0);

    site.state().alive = false;
    assert!(session.home().location().is_err());
    assert!(session.ensure_healthy());
    assert_eq!(session.generation(), 1);
    assert!(session.home().location().is_ok());
}
