//! Listing Scout: a browser-driven crawler for real-estate listing sites.
//!
//! The crawl walks paginated search results, opens every listing in its own
//! tab, extracts what it can field by field and exports the accumulated
//! records as JSON and flattened CSV.

pub mod config;
pub mod export;
pub mod extract;
pub mod models;
pub mod scrapers;
