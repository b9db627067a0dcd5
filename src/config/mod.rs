//! Run configuration.
//!
//! Everything lives in one TOML file whose sections all have defaults, so an
//! empty file (or none at all) is a valid configuration. Command-line flags
//! override individual values in `main`.

mod types;

use std::path::Path;

use anyhow::{bail, Context, Result};

pub use types::{
    Bounds, BrowserConfig, Config, CrawlConfig, DelayRange, OutputConfig, Pacing,
    PlausibilityBounds, SearchTarget, SiteSelectors,
};

/// Reads, parses and validates a configuration file
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse_config(&raw)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

pub fn parse_config(raw: &str) -> Result<Config> {
    let config: Config = toml::from_str(raw).context("Failed to parse TOML")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let mut problems = Vec::new();

    if config.crawl.failure_threshold == 0 {
        problems.push("crawl.failure_threshold must be at least 1".to_string());
    }
    if config.crawl.checkpoint_interval == 0 {
        problems.push("crawl.checkpoint_interval must be at least 1".to_string());
    }
    if config.crawl.scroll_steps == 0 {
        problems.push("crawl.scroll_steps must be at least 1".to_string());
    }
    for (name, range) in config.pacing.ranges() {
        if range.min_secs < 0.0 || range.min_secs > range.max_secs {
            problems.push(format!(
                "pacing.{name} must satisfy 0 <= min_secs <= max_secs"
            ));
        }
    }
    for (name, bounds) in config.bounds.all() {
        if bounds.min > bounds.max {
            problems.push(format!("bounds.{name} has min greater than max"));
        }
    }
    for target in &config.targets {
        if target.max_listings == 0 {
            problems.push(format!("target '{}' asks for zero listings", target.label));
        }
        if url::Url::parse(&target.search_url).is_err() {
            problems.push(format!(
                "target '{}' has an invalid search_url",
                target.label
            ));
        }
    }

    if !problems.is_empty() {
        bail!("{}", problems.join("; "));
    }
    Ok(())
}

/// Round-robin share of the targets for one queue.
///
/// Queue `queue` of `queues` takes every target whose index satisfies
/// `index % queues == queue`, keeping the original index for reporting.
pub fn partition(
    targets: &[SearchTarget],
    queue: usize,
    queues: usize,
) -> Vec<(usize, &SearchTarget)> {
    let queues = queues.max(1);
    targets
        .iter()
        .enumerate()
        .filter(|(index, _)| index % queues == queue)
        .collect()
}
