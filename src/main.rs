use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use listing_scout::config::{load_config, partition, Config};
use listing_scout::export::{export_all, load_checkpoint, write_summary, RunSummary};
use listing_scout::scrapers::{
    ChromeSession, CrawlPlan, CrawlSeed, CrawlState, Crawler, ListingSource,
};

/// Listing Scout: crawls real-estate search results into JSON and CSV
#[derive(Parser, Debug)]
#[command(name = "listing-scout")]
#[command(version)]
#[command(about = "Browser-driven real-estate listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Which queue this process runs, counting from 0
    #[arg(long, default_value_t = 0)]
    queue_id: usize,

    /// Number of queues the targets are spread over
    #[arg(long, default_value_t = 1)]
    queues: usize,

    /// Override the listing count of every target
    #[arg(long)]
    max: Option<usize>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Seed the first crawl with records from a checkpoint file
    #[arg(long, value_name = "CHECKPOINT")]
    resume: Option<PathBuf>,

    /// Visit these listing URLs directly instead of crawling searches
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Label used for direct runs
    #[arg(long, default_value = "direct")]
    label: String,

    /// Show the crawl plan and exit without launching a browser
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(output) = &cli.output {
        config.output.directory = output.clone();
    }
    if cli.queue_id >= cli.queues.max(1) {
        bail!(
            "queue id {} is out of range for {} queue(s)",
            cli.queue_id,
            cli.queues
        );
    }

    let plans = build_plans(&cli, &config)?;

    info!("🏠 Listing Scout");
    info!("==========================================");
    info!(
        "Queue {}/{}: {} crawl(s) planned",
        cli.queue_id + 1,
        cli.queues.max(1),
        plans.len()
    );

    if cli.dry_run {
        print_plan(&plans);
        return Ok(());
    }

    let mut resume = match &cli.resume {
        Some(path) => {
            let records = load_checkpoint(path)?;
            info!("♻️  Resuming with {} records from {}", records.len(), path.display());
            Some(records)
        }
        None => None,
    };

    let session = ChromeSession::launch(config.browser.clone()).context("Failed to launch Chrome")?;
    let mut crawler = Crawler::from_config(session, &config);
    let queue_dir = config
        .output
        .directory
        .join(format!("queue_{}", cli.queue_id));

    let mut summaries = Vec::new();
    for (position, plan) in plans.into_iter().enumerate() {
        if position > 0 {
            let pause = config.pacing.between_targets.sample();
            info!("Waiting {:.0}s before the next target", pause.as_secs_f64());
            tokio::time::sleep(pause).await;
        }

        let dir = queue_dir.join(&plan.label);
        let plan = plan.with_checkpoints(&dir);
        let state = resume.take().map(CrawlState::resume).unwrap_or_default();

        match run_target(&mut crawler, &plan, state, &dir, &config.output.file_prefix).await {
            Ok(summary) => summaries.push(summary),
            Err(err) => error!("Target '{}' failed: {:#}", plan.label, err),
        }
    }

    let collected: usize = summaries.iter().map(|summary| summary.collected).sum();
    info!("");
    info!(
        "✅ Finished {} target(s), {} listings collected",
        summaries.len(),
        collected
    );
    for summary in &summaries {
        info!(
            "   {}: {}/{} ({:.1}%), stopped: {:?}",
            summary.label,
            summary.collected,
            summary.requested,
            summary.success_rate,
            summary.stop_reason
        );
    }

    Ok(())
}

fn setup_logging(verbose: u8) {
    let default = match verbose {
        0 => "listing_scout=info,warn",
        1 => "listing_scout=debug,info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Direct URLs win over configured targets; otherwise this queue's share of
/// the targets
fn build_plans(cli: &Cli, config: &Config) -> Result<Vec<CrawlPlan>> {
    if !cli.urls.is_empty() {
        let mut plan = CrawlPlan::listings(cli.label.clone(), cli.urls.clone());
        if let Some(max) = cli.max {
            plan = plan.with_max_listings(max);
        }
        return Ok(vec![plan]);
    }

    if config.targets.is_empty() {
        bail!("No search targets configured; add [[targets]] to the config or pass --url");
    }

    let plans: Vec<CrawlPlan> = partition(&config.targets, cli.queue_id, cli.queues)
        .into_iter()
        .map(|(index, target)| {
            info!("Target #{index}: {} ({})", target.label, target.search_url);
            let plan = CrawlPlan::search(target);
            match cli.max {
                Some(max) => plan.with_max_listings(max),
                None => plan,
            }
        })
        .collect();
    if plans.is_empty() {
        warn!("Queue {} has no targets assigned", cli.queue_id);
    }
    Ok(plans)
}

fn print_plan(plans: &[CrawlPlan]) {
    println!("=== Listing Scout Dry Run ===\n");
    for plan in plans {
        match &plan.seed {
            CrawlSeed::Search(url) => {
                println!("  {} -> {} listings from {}", plan.label, plan.max_listings, url)
            }
            CrawlSeed::Listings(urls) => {
                println!("  {} -> {} direct listing URL(s)", plan.label, urls.len())
            }
        }
    }
}

async fn run_target(
    source: &mut dyn ListingSource,
    plan: &CrawlPlan,
    state: CrawlState,
    dir: &Path,
    prefix: &str,
) -> Result<RunSummary> {
    let started_at = Utc::now();
    info!("");
    info!(
        "🔎 [{}] collecting up to {} listings via {}",
        plan.label,
        plan.max_listings,
        source.source_name()
    );

    let report = source.collect(plan, state).await;

    let exports = export_all(&report.records, dir, prefix)
        .await
        .with_context(|| format!("Export failed for '{}'", plan.label))?;
    let (json_export, csv_export) = match exports {
        Some((json, csv)) => (Some(json), Some(csv)),
        None => (None, None),
    };

    let summary = RunSummary {
        label: plan.label.clone(),
        source: match &plan.seed {
            CrawlSeed::Search(url) => url.clone(),
            CrawlSeed::Listings(urls) => format!("{} direct URL(s)", urls.len()),
        },
        requested: plan.max_listings,
        collected: report.records.len(),
        success_rate: RunSummary::success_rate(report.records.len(), plan.max_listings),
        stop_reason: report.stop_reason,
        pages_visited: report.pages_visited,
        json_export,
        csv_export,
        checkpoints: report.checkpoints,
        started_at,
        finished_at: Utc::now(),
    };
    let path = write_summary(&summary, dir).await?;
    info!("📊 Summary written to {}", path.display());

    Ok(summary)
}
