//! Persistence of collected listings: final JSON and CSV exports, periodic
//! checkpoints and per-target run summaries.

mod checkpoint;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::info;

use crate::models::ListingRecord;
use crate::scrapers::StopReason;

pub use checkpoint::{load_checkpoint, CheckpointWriter};

/// Pretty JSON of the nested records
pub fn to_structured(records: &[ListingRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("Failed to serialize records")
}

/// CSV of the flattened records, one row per record under a fixed header
pub fn to_tabular(records: &[ListingRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ListingRecord::columns())?;
    for record in records {
        writer.write_record(record.flatten().into_iter().map(|(_, value)| value))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Failed to finish CSV: {}", err.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Writes `<prefix>_<timestamp>.json` and `.csv` into `dir`.
///
/// Returns `None` without touching the filesystem when there is nothing to
/// export.
pub async fn export_all(
    records: &[ListingRecord],
    dir: &Path,
    prefix: &str,
) -> Result<Option<(PathBuf, PathBuf)>> {
    if records.is_empty() {
        info!("Nothing to export");
        return Ok(None);
    }

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let stamp = stamp();
    let json_path = dir.join(format!("{prefix}_{stamp}.json"));
    let csv_path = dir.join(format!("{prefix}_{stamp}.csv"));

    tokio::fs::write(&json_path, to_structured(records)?)
        .await
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    info!("💾 Saved {} listings to {}", records.len(), json_path.display());

    tokio::fs::write(&csv_path, to_tabular(records)?)
        .await
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;
    info!("💾 Saved flattened rows to {}", csv_path.display());

    Ok(Some((json_path, csv_path)))
}

/// Outcome of one target, written next to its exports
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub source: String,
    pub requested: usize,
    pub collected: usize,
    /// Collected as a percentage of requested
    pub success_rate: f64,
    pub stop_reason: StopReason,
    pub pages_visited: usize,
    pub json_export: Option<PathBuf>,
    pub csv_export: Option<PathBuf>,
    pub checkpoints: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn success_rate(collected: usize, requested: usize) -> f64 {
        if requested == 0 {
            return 0.0;
        }
        let rate = collected as f64 / requested as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    }
}

/// Writes `summary_<label>_<timestamp>.json` into `dir`
pub async fn write_summary(summary: &RunSummary, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("summary_{}_{}.json", summary.label, stamp()));
    let json = serde_json::to_string_pretty(summary)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, HistoryEvent, Score};

    fn sample(n: usize) -> Vec<ListingRecord> {
        (0..n)
            .map(|i| {
                let mut record = ListingRecord::new(
                    format!("https://example.com/homedetails/{i}_zpid/"),
                    Utc::now(),
                );
                record.price = Field::Known(500_000 + i as u64);
                record.walk_score = Field::Known(Score(80));
                record.appliances = vec!["dishwasher".into(), "range".into()];
                record.property_history = vec![HistoryEvent {
                    date: "6/12/2024".into(),
                    event: "Listed for sale".into(),
                    price: "$649,900".into(),
                }];
                record
            })
            .collect()
    }

    #[test]
    fn csv_has_one_row_per_record_under_the_fixed_header() {
        let csv = to_tabular(&sample(4)).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());

        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, ListingRecord::columns());

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 4);
        let column = |name: &str| header.iter().position(|c| c == name).unwrap();
        assert_eq!(&rows[0][column("price")], "500000");
        assert_eq!(&rows[0][column("walk_score")], "80/100");
        assert_eq!(&rows[0][column("appliances")], "dishwasher; range");
        assert_eq!(
            &rows[0][column("property_history")],
            "6/12/2024 Listed for sale $649,900"
        );
        assert_eq!(&rows[0][column("utilities_water")], "N/A");
    }

    #[tokio::test]
    async fn export_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let records = sample(7);

        let (json_path, csv_path) = export_all(&records, dir.path(), "salem")
            .await
            .unwrap()
            .unwrap();

        let json: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json.len(), records.len());
        assert!(json.iter().all(|record| record["beds"] == "N/A"));

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        let rows = csv::Reader::from_reader(csv.as_bytes()).records().count();
        assert_eq!(rows, records.len());

        let name = json_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("salem_") && name.ends_with(".json"), "{name}");
    }

    #[tokio::test]
    async fn empty_collection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        assert!(export_all(&[], &target, "salem").await.unwrap().is_none());
        assert!(!target.exists());
    }

    #[test]
    fn success_rate_is_a_rounded_percentage() {
        assert_eq!(RunSummary::success_rate(3, 4), 75.0);
        assert_eq!(RunSummary::success_rate(1, 3), 33.3);
        assert_eq!(RunSummary::success_rate(5, 0), 0.0);
    }
}
