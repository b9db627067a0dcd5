use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::models::ListingRecord;

/// Periodic snapshots of everything collected so far
pub struct CheckpointWriter {
    dir: PathBuf,
    label: String,
    interval: usize,
}

impl CheckpointWriter {
    pub fn new(dir: impl Into<PathBuf>, label: impl Into<String>, interval: usize) -> Self {
        Self {
            dir: dir.into(),
            label: label.into(),
            interval: interval.max(1),
        }
    }

    /// Writes a snapshot when the record count lands on the interval.
    ///
    /// Failures are logged and skipped; a missed checkpoint never ends a run.
    pub fn maybe_write(&self, records: &[ListingRecord]) -> Option<PathBuf> {
        if records.is_empty() || records.len() % self.interval != 0 {
            return None;
        }
        match self.write(records) {
            Ok(path) => {
                info!(path = %path.display(), count = records.len(), "💾 Checkpoint saved");
                Some(path)
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "Checkpoint failed");
                None
            }
        }
    }

    fn write(&self, records: &[ListingRecord]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(format!(
            "checkpoint_{}_{}props_{}.json",
            self.label,
            records.len(),
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Records saved by an earlier run, for resuming
pub fn load_checkpoint(path: &Path) -> Result<Vec<ListingRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read checkpoint {}", path.display()))?;
    let records = serde_json::from_str(&raw)
        .with_context(|| format!("Checkpoint {} is not a record list", path.display()))?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn records(n: usize) -> Vec<ListingRecord> {
        (0..n)
            .map(|i| {
                ListingRecord::new(
                    format!("https://example.com/homedetails/{i}_zpid/"),
                    Utc::now(),
                )
            })
            .collect()
    }

    #[test]
    fn writes_only_on_the_interval() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CheckpointWriter::new(dir.path(), "salem", 3);

        assert!(writer.maybe_write(&records(0)).is_none());
        assert!(writer.maybe_write(&records(2)).is_none());
        let path = writer.maybe_write(&records(3)).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("checkpoint_salem_3props_"), "{name}");
        assert!(name.ends_with(".json"));
        let urls: Vec<String> = load_checkpoint(&path)
            .unwrap()
            .into_iter()
            .map(|record| record.url)
            .collect();
        let expected: Vec<String> = records(3).into_iter().map(|record| record.url).collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn garbage_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_checkpoint(&path).is_err());
        assert!(load_checkpoint(&dir.path().join("missing.json")).is_err());
    }
}
