//! Run summaries and statistics about saved output
//!
//! This module provides the end-of-run summary printed by the CLI and the
//! `--stats` view over the files a previous run left behind.

use crate::harvester::{HarvestCounts, HarvestReport};
use crate::site::Column;
use crate::storage::{keys, Checkpoint, RecordStore};
use chrono::{DateTime, Utc};
use std::path::Path;

/// End-of-run summary
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub profile: String,
    pub target_url: String,
    pub config_hash: String,
    pub termination: String,
    pub error: Option<String>,
    pub counts: HarvestCounts,
    pub total_records: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HarvestSummary {
    /// Builds a summary from a finished run
    ///
    /// # Arguments
    ///
    /// * `report` - The run's report
    /// * `profile` - Site profile name
    /// * `target_url` - The harvested category page
    /// * `config_hash` - Hash of the configuration file used
    pub fn from_report(
        report: &HarvestReport,
        profile: &str,
        target_url: &str,
        config_hash: &str,
    ) -> Self {
        Self {
            profile: profile.to_string(),
            target_url: target_url.to_string(),
            config_hash: config_hash.to_string(),
            termination: report.termination.as_str().to_string(),
            error: report.termination.error().map(|e| e.to_string()),
            counts: report.counts,
            total_records: report.records.len(),
            started_at: report.started_at,
            finished_at: report.finished_at,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds().max(0)
    }

    /// New records per minute of wall time
    pub fn records_per_minute(&self) -> f64 {
        let seconds = self.duration_seconds();
        if seconds == 0 {
            return 0.0;
        }
        self.counts.added as f64 * 60.0 / seconds as f64
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Run:");
    println!("  Profile: {}", summary.profile);
    println!("  Target: {}", summary.target_url);
    println!("  Config hash: {}", summary.config_hash);
    println!("  Started: {}", summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Duration: {}s", summary.duration_seconds());
    println!("  Outcome: {}", summary.termination);
    if let Some(error) = &summary.error {
        println!("  Error: {}", error);
    }
    println!();

    println!("Records:");
    println!("  Total: {}", summary.total_records);
    println!("  Carried over: {}", summary.counts.seeded);
    println!(
        "  New: {} ({:.1}/min)",
        summary.counts.added,
        summary.records_per_minute()
    );
    println!("  Duplicates skipped: {}", summary.counts.skipped);
    println!("  Noise discarded: {}", summary.counts.discarded);
    println!();

    println!("Pagination:");
    println!("  Advances: {}", summary.counts.advances);
    println!("  Failed attempts: {}", summary.counts.failures);
}

/// What the output files of a previous run contain
#[derive(Debug, Clone, Default)]
pub struct SavedStatistics {
    pub record_count: usize,
    pub last_name: Option<String>,
    pub with_profile_url: usize,
    pub with_phone: usize,
    pub enriched: usize,
    pub checkpoint: u32,
}

/// Loads statistics from the saved files and checkpoint
///
/// Uses the same CSV-then-XLSX order as a resumed run.
pub fn load_saved_statistics(
    csv_path: &Path,
    xlsx_path: &Path,
    checkpoint_path: &Path,
    columns: &[Column],
) -> SavedStatistics {
    let store = RecordStore::load(csv_path, xlsx_path, columns);
    let records = store.records();

    SavedStatistics {
        record_count: records.len(),
        last_name: store.last().and_then(|r| r.name()).map(str::to_string),
        with_profile_url: records.iter().filter(|r| r.profile_url().is_some()).count(),
        with_phone: records
            .iter()
            .filter(|r| !r.get(keys::PHONE).is_missing())
            .count(),
        enriched: records
            .iter()
            .filter(|r| r.value(keys::ENRICHED) == Some("yes"))
            .count(),
        checkpoint: Checkpoint::new(checkpoint_path).load(),
    }
}

/// Prints saved-output statistics to stdout
pub fn print_saved_statistics(stats: &SavedStatistics) {
    println!("=== Saved Output ===\n");
    println!("  Records: {}", stats.record_count);
    println!(
        "  Last record: {}",
        stats.last_name.as_deref().unwrap_or("-")
    );
    println!("  With profile URL: {}", stats.with_profile_url);
    println!("  With phone: {}", stats.with_phone);
    println!("  Enriched: {}", stats.enriched);
    println!("  Checkpoint: {} advances", stats.checkpoint);
}
