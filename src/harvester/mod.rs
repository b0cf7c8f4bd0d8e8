//! Harvest engine: the pagination driver and its collaborators
//!
//! This module contains the core collection logic, including:
//! - Interruptible, randomized pacing between page interactions
//! - The page collector (one extraction pass over the rendered page)
//! - The pagination driver state machine
//! - `run_harvest`, the entry point used by the CLI and by embedding callers

mod collector;
mod driver;
pub mod pacing;

pub use collector::{CollectOutcome, Collector};
pub use driver::locate_control;

use crate::browser::BrowserPage;
use crate::config::{Config, TimingConfig};
use crate::site::SiteProfile;
use crate::state::{RunGuard, Termination};
use crate::storage::{Checkpoint, Record, RecordStore};
use chrono::{DateTime, Utc};
use driver::Driver;
use std::path::PathBuf;

/// Everything a single run needs besides the page and the site profile
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub target_url: String,

    /// Seed the store from the previous output and fast-forward the page
    pub resume: bool,

    pub max_advances: Option<u32>,
    pub save_interval: usize,
    pub failure_threshold: u32,
    pub max_idle_advances: Option<u32>,
    pub verbose: bool,
    pub timing: TimingConfig,
    pub csv_path: PathBuf,
    pub xlsx_path: PathBuf,
    pub checkpoint_path: PathBuf,
}

impl HarvestOptions {
    /// Options from a loaded configuration; a fresh run unless changed
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_url: config.site.target_url.clone(),
            resume: false,
            max_advances: config.harvest.max_advances,
            save_interval: config.harvest.save_interval.max(1),
            failure_threshold: config.harvest.failure_threshold.max(1),
            max_idle_advances: config.harvest.max_idle_advances,
            verbose: config.harvest.verbose,
            timing: config.timing.clone(),
            csv_path: PathBuf::from(&config.output.csv_path),
            xlsx_path: PathBuf::from(&config.output.xlsx_path),
            checkpoint_path: PathBuf::from(&config.output.checkpoint_path),
        }
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_max_advances(mut self, max_advances: Option<u32>) -> Self {
        self.max_advances = max_advances;
        self
    }
}

/// Running totals of one harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestCounts {
    /// Completed "load more" advances, including replayed ones
    pub advances: u32,

    /// Records carried over from the previous run
    pub seeded: usize,

    pub added: usize,
    pub skipped: usize,
    pub discarded: usize,

    /// Failed loop iterations over the whole run
    pub failures: u32,
}

impl HarvestCounts {
    pub(crate) fn absorb(&mut self, outcome: &CollectOutcome) {
        self.added += outcome.added;
        self.skipped += outcome.skipped;
        self.discarded += outcome.discarded;
    }
}

/// What a run hands back on every terminal path
#[derive(Debug)]
pub struct HarvestReport {
    /// Every record in the store, seeded ones first
    pub records: Vec<Record>,
    pub counts: HarvestCounts,
    pub termination: Termination,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HarvestReport {
    pub fn is_failed(&self) -> bool {
        self.termination.is_failed()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Runs one harvest to completion
///
/// Seeds the store when resuming (or clears the checkpoint for a fresh run),
/// then drives the page until it is exhausted, cancelled or failed. The page
/// is closed and the store flushed to both output files on every path.
///
/// # Arguments
///
/// * `page` - Browser page, owned by the run until it returns
/// * `profile` - Site locators, layout and extractor
/// * `options` - Run options
/// * `run` - Proof that this caller holds the single active-run slot
///
/// # Returns
///
/// A `HarvestReport`; a failed run is reported through
/// `Termination::Failed` together with whatever was collected.
pub async fn run_harvest<P: BrowserPage>(
    page: P,
    profile: &SiteProfile,
    options: &HarvestOptions,
    run: &RunGuard,
) -> HarvestReport {
    let status = run.status();
    let checkpoint = Checkpoint::new(&options.checkpoint_path);

    let store = if options.resume {
        let store = RecordStore::load(&options.csv_path, &options.xlsx_path, &profile.columns);
        if store.is_empty() {
            status.log("No saved records found, starting from the first page");
        } else {
            let last = store
                .last()
                .and_then(|r| r.name())
                .unwrap_or("-")
                .to_string();
            status.log(format!(
                "Resuming with {} saved records (last: {})",
                store.size(),
                last
            ));
        }
        store
    } else {
        checkpoint.clear();
        RecordStore::new()
    };

    Driver::new(page, profile, options, status, store, checkpoint)
        .run()
        .await
}
