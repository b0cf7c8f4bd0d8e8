//! Integration tests for the harvest engine
//!
//! These tests drive `run_harvest` against a scripted page and check the
//! records, counters, checkpoint and output files each run leaves behind.

mod mock_page;

use listing_harvest::config::TimingConfig;
use listing_harvest::output::{load_records, persist_records};
use listing_harvest::site::{profile_by_name, SiteProfile};
use listing_harvest::storage::keys;
use listing_harvest::{
    run_harvest, Checkpoint, HarvestOptions, HarvestReport, Phase, Record, RecordStore, RunStatus,
    Termination,
};
use mock_page::{advert, batch, card, MockPage};
use std::path::Path;
use std::sync::Arc;

const TARGET: &str = "https://trustoo.nl/nederland/elektricien/";

fn trustoo() -> SiteProfile {
    profile_by_name("trustoo", TARGET).expect("trustoo profile")
}

fn options(dir: &Path) -> HarvestOptions {
    HarvestOptions {
        target_url: TARGET.to_string(),
        resume: false,
        max_advances: None,
        save_interval: 10,
        failure_threshold: 5,
        max_idle_advances: None,
        verbose: false,
        timing: TimingConfig::immediate(),
        csv_path: dir.join("listings.csv"),
        xlsx_path: dir.join("listings.xlsx"),
        checkpoint_path: dir.join("checkpoint.txt"),
    }
}

async fn harvest(
    page: MockPage,
    profile: &SiteProfile,
    options: &HarvestOptions,
    status: &Arc<RunStatus>,
) -> HarvestReport {
    let run = status.try_begin().expect("no other run active");
    run_harvest(page, profile, options, &run).await
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.name().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_single_page_is_exhausted_without_clicking() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let options = options(dir.path());
    std::fs::write(&options.checkpoint_path, "7").unwrap();

    let page = MockPage::new(&profile, vec![batch("Volt", 3)]);
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options, &status).await;

    assert!(matches!(report.termination, Termination::Exhausted));
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.counts.added, 3);
    assert_eq!(report.counts.advances, 0);
    assert_eq!(page.click_attempts(), 0);

    // The final pass over the same page adds nothing
    assert_eq!(report.counts.skipped, 3);

    // A fresh run never consults the old checkpoint
    assert!(!options.checkpoint_path.exists());

    assert!(page.is_closed());
    assert!(!page.consent_visible());
    assert_eq!(status.phase(), Phase::Finished);
    assert_eq!(status.collected(), 3);

    let saved = RecordStore::load(&options.csv_path, &options.xlsx_path, &profile.columns);
    assert_eq!(names(saved.records()), names(&report.records));
    assert!(options.xlsx_path.exists());
}

#[tokio::test]
async fn test_profile_url_decides_identity() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let url = "https://trustoo.nl/utrecht/elektricien/volt-bv/";

    let page = MockPage::new(
        &profile,
        vec![vec![
            card("Volt BV", "Markt 1, Utrecht", Some(url)),
            // Renamed and moved, same profile
            card("Volt B.V.", "Markt 9, Utrecht", Some(url)),
            // No link, same name and address as a linked record
            card("Volt BV", "Markt 1, Utrecht", None),
            card("Stroom", "Kerkstraat 2, Ede", None),
            card("Stroom", "Kerkstraat 2, Ede", None),
        ]],
    );
    let status = Arc::new(RunStatus::new());
    let report = harvest(page, &profile, &options(dir.path()), &status).await;

    assert_eq!(names(&report.records), vec!["Volt BV", "Stroom"]);
    assert_eq!(report.records[0].profile_url(), Some(url));
    assert!(report.records[1].profile_url().is_none());
}

#[tokio::test]
async fn test_adverts_are_never_stored() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();

    let mut listings = batch("Volt", 2);
    listings.insert(1, advert());
    let page = MockPage::new(&profile, vec![listings]);
    let status = Arc::new(RunStatus::new());
    let report = harvest(page, &profile, &options(dir.path()), &status).await;

    assert_eq!(report.records.len(), 2);
    assert!(report.records.iter().all(|r| !r.is_noise()));
    // Discarded on both passes
    assert_eq!(report.counts.discarded, 2);
}

#[tokio::test]
async fn test_each_advance_collects_the_new_batch() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let options = options(dir.path());

    let page = MockPage::new(&profile, vec![batch("A", 3), batch("B", 3), batch("C", 2)]);
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options, &status).await;

    assert!(matches!(report.termination, Termination::Exhausted));
    assert_eq!(report.records.len(), 8);
    assert_eq!(report.counts.advances, 2);
    assert_eq!(page.successful_clicks(), 2);
    assert_eq!(Checkpoint::new(&options.checkpoint_path).load(), 2);
    assert_eq!(names(&report.records)[..3], ["A 0", "A 1", "A 2"]);
}

#[tokio::test]
async fn test_advance_budget_ends_run() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let mut options = options(dir.path());
    options.max_advances = Some(1);

    let page = MockPage::new(&profile, vec![batch("A", 2), batch("B", 2), batch("C", 2)]);
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options, &status).await;

    assert!(matches!(report.termination, Termination::Exhausted));
    assert_eq!(report.counts.advances, 1);
    assert_eq!(report.records.len(), 4);
    assert_eq!(page.successful_clicks(), 1);
}

#[tokio::test]
async fn test_resume_replays_checkpoint_then_continues() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let batches = vec![batch("A", 3), batch("B", 3), batch("C", 3), batch("D", 3)];

    // First run stops after two advances
    let mut first = options(dir.path());
    first.max_advances = Some(2);
    let status = Arc::new(RunStatus::new());
    let report = harvest(
        MockPage::new(&profile, batches.clone()),
        &profile,
        &first,
        &status,
    )
    .await;
    assert_eq!(report.records.len(), 9);
    assert_eq!(Checkpoint::new(&first.checkpoint_path).load(), 2);

    // Second run picks up where the first left off
    let resumed = options(dir.path()).with_resume(true);
    let page = MockPage::new(&profile, batches);
    let report = harvest(page.clone(), &profile, &resumed, &status).await;

    assert!(matches!(report.termination, Termination::Exhausted));
    assert_eq!(report.counts.seeded, 9);
    assert_eq!(report.counts.added, 3);
    assert_eq!(report.counts.advances, 3);
    assert_eq!(page.successful_clicks(), 3);
    assert_eq!(report.records.len(), 12);
    assert_eq!(report.records[11].name(), Some("D 2"));
    assert_eq!(Checkpoint::new(&resumed.checkpoint_path).load(), 3);

    let saved = load_records(&resumed.csv_path, &profile.columns).unwrap();
    assert_eq!(saved.len(), 12);
}

#[tokio::test]
async fn test_seeded_profile_url_is_not_collected_again() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let options = options(dir.path()).with_resume(true);
    let url = "https://trustoo.nl/utrecht/elektricien/volt-bv/";

    let seeded = vec![Record::new()
        .with(keys::NAME, "Volt BV")
        .with(keys::ADDRESS, "Markt 1, Utrecht")
        .with(keys::PROFILE_URL, url)];
    persist_records(&seeded, &profile.columns, &options.csv_path, &options.xlsx_path).unwrap();

    let page = MockPage::new(
        &profile,
        vec![vec![
            card("Volt Installaties", "Markt 1, Utrecht", Some(url)),
            card(
                "Nieuw BV",
                "Kerkstraat 2, Ede",
                Some("https://trustoo.nl/ede/elektricien/nieuw-bv/"),
            ),
        ]],
    );
    let status = Arc::new(RunStatus::new());
    let report = harvest(page, &profile, &options, &status).await;

    assert_eq!(report.counts.seeded, 1);
    assert_eq!(report.counts.added, 1);
    assert_eq!(names(&report.records), vec!["Volt BV", "Nieuw BV"]);
}

#[tokio::test]
async fn test_resume_without_saved_records_starts_over() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let options = options(dir.path()).with_resume(true);
    std::fs::write(&options.checkpoint_path, "4").unwrap();

    let page = MockPage::new(&profile, vec![batch("A", 2), batch("B", 2)]);
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options, &status).await;

    // One real advance, no replay of the stale checkpoint
    assert_eq!(page.successful_clicks(), 1);
    assert_eq!(report.counts.advances, 1);
    assert_eq!(report.records.len(), 4);
    assert_eq!(Checkpoint::new(&options.checkpoint_path).load(), 1);
}

#[tokio::test]
async fn test_stop_request_saves_collected_records() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let options = options(dir.path());
    let status = Arc::new(RunStatus::new());
    let run = status.try_begin().unwrap();

    let page = MockPage::new(
        &profile,
        vec![batch("A", 3), batch("B", 3), batch("C", 3), batch("D", 3)],
    )
    .endless()
    .stop_after(2, status.stop_signal());
    let report = run_harvest(page.clone(), &profile, &options, &run).await;
    drop(run);

    assert!(matches!(report.termination, Termination::Cancelled));
    assert!(!report.is_failed());
    assert_eq!(report.records.len(), 6);
    assert_eq!(report.counts.advances, 1);
    assert!(page.is_closed());
    assert!(status.error().is_none());
    assert!(!status.is_running());

    let saved = load_records(&options.csv_path, &profile.columns).unwrap();
    assert_eq!(names(&saved), names(&report.records));
}

#[tokio::test]
async fn test_stop_during_fast_forward_keeps_seeded_records() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let batches = vec![batch("A", 3), batch("B", 3), batch("C", 3), batch("D", 3)];

    let mut first = options(dir.path());
    first.max_advances = Some(2);
    let status = Arc::new(RunStatus::new());
    harvest(MockPage::new(&profile, batches.clone()), &profile, &first, &status).await;

    let resumed = options(dir.path()).with_resume(true);
    let run = status.try_begin().unwrap();
    let page = MockPage::new(&profile, batches).stop_after(1, status.stop_signal());
    let report = run_harvest(page.clone(), &profile, &resumed, &run).await;
    drop(run);

    assert!(matches!(report.termination, Termination::Cancelled));
    assert_eq!(report.counts.seeded, 9);
    assert_eq!(report.counts.added, 0);
    assert_eq!(report.records.len(), 9);
    assert_eq!(page.successful_clicks(), 1);
    assert!(page.is_closed());

    // An interrupted replay leaves the checkpoint for the next resume
    assert_eq!(Checkpoint::new(&resumed.checkpoint_path).load(), 2);
    let saved = load_records(&resumed.csv_path, &profile.columns).unwrap();
    assert_eq!(names(&saved), names(&report.records));
}

#[tokio::test]
async fn test_stop_while_reading_listings_saves_store() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let options = options(dir.path());
    let status = Arc::new(RunStatus::new());
    let run = status.try_begin().unwrap();

    // Reads 1-3 are the first pass, 4-9 the pass after the first click
    let page = MockPage::new(&profile, vec![batch("A", 3), batch("B", 3)])
        .stop_on_read(8, status.stop_signal());
    let report = run_harvest(page.clone(), &profile, &options, &run).await;
    drop(run);

    assert!(matches!(report.termination, Termination::Cancelled));
    assert_eq!(page.listing_reads(), 8);
    assert_eq!(report.counts.advances, 1);
    assert_eq!(names(&report.records), vec!["A 0", "A 1", "A 2"]);
    assert_eq!(status.collected(), 3);
    assert!(page.is_closed());

    let saved = load_records(&options.csv_path, &profile.columns).unwrap();
    assert_eq!(names(&saved), names(&report.records));
}

#[tokio::test]
async fn test_intermediate_save_is_written_silently() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let mut options = options(dir.path());
    options.save_interval = 2;

    let page = MockPage::new(&profile, vec![batch("A", 1), batch("B", 1), batch("C", 1)])
        .watch_file(options.csv_path.clone());
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options, &status).await;

    assert_eq!(report.records.len(), 3);
    // The second record crosses the interval before the second click
    assert_eq!(page.file_seen_at_clicks(), vec![false, true]);

    let saves: Vec<String> = status
        .log_lines()
        .into_iter()
        .filter(|line| line.starts_with("Saved "))
        .collect();
    assert_eq!(saves, vec![format!(
        "Saved 3 records to {} and {}",
        options.csv_path.display(),
        options.xlsx_path.display()
    )]);
}

#[tokio::test]
async fn test_failed_final_pass_still_exhausts() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let options = options(dir.path());

    // Scripts 1-2 scroll the first pass, 3 precedes the control lookup,
    // 4 opens the final pass
    let page = MockPage::new(&profile, vec![batch("Volt", 3)]).failing_scripts([4]);
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options, &status).await;

    assert!(matches!(report.termination, Termination::Exhausted));
    assert!(!report.is_failed());
    assert!(status.error().is_none());
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.counts.skipped, 0);

    let saved = load_records(&options.csv_path, &profile.columns).unwrap();
    assert_eq!(saved.len(), 3);
}

#[tokio::test]
async fn test_fast_forward_past_last_batch_rewrites_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let batches = vec![batch("A", 3), batch("B", 3), batch("C", 3)];

    let first = options(dir.path());
    let status = Arc::new(RunStatus::new());
    let report = harvest(MockPage::new(&profile, batches.clone()), &profile, &first, &status).await;
    assert_eq!(report.records.len(), 9);

    // Checkpoint from a run against a longer list
    std::fs::write(&first.checkpoint_path, "5").unwrap();

    let resumed = options(dir.path()).with_resume(true);
    let page = MockPage::new(&profile, batches);
    let report = harvest(page.clone(), &profile, &resumed, &status).await;

    assert!(matches!(report.termination, Termination::Exhausted));
    assert_eq!(page.successful_clicks(), 2);
    assert_eq!(report.counts.advances, 2);
    assert_eq!(report.records.len(), 9);
    assert_eq!(Checkpoint::new(&resumed.checkpoint_path).load(), 2);
}

#[tokio::test]
async fn test_consecutive_failures_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let options = options(dir.path());

    let page = MockPage::new(&profile, vec![batch("A", 3), batch("B", 3)]).fail_every_click();
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options, &status).await;

    assert!(report.is_failed());
    assert_eq!(page.click_attempts(), 5);
    assert_eq!(report.counts.failures, 5);
    assert!(status.error().is_some());
    assert!(page.is_closed());

    // What was collected before the failures is still saved
    let saved = load_records(&options.csv_path, &profile.columns).unwrap();
    assert_eq!(saved.len(), 3);
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();

    let page = MockPage::new(&profile, vec![batch("A", 3), batch("B", 3), batch("C", 3)])
        .failing_attempts([1, 2, 3, 4, 6, 7, 8, 9]);
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options(dir.path()), &status).await;

    assert!(matches!(report.termination, Termination::Exhausted));
    assert_eq!(report.counts.failures, 8);
    assert_eq!(report.counts.advances, 2);
    assert_eq!(report.records.len(), 9);
}

#[tokio::test]
async fn test_idle_advances_end_run() {
    let dir = tempfile::tempdir().unwrap();
    let profile = trustoo();
    let mut options = options(dir.path());
    options.max_idle_advances = Some(3);

    let page = MockPage::new(&profile, vec![batch("A", 2)]).endless();
    let status = Arc::new(RunStatus::new());
    let report = harvest(page.clone(), &profile, &options, &status).await;

    assert!(matches!(report.termination, Termination::Exhausted));
    assert_eq!(report.counts.advances, 3);
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn test_second_run_is_rejected_while_first_is_active() {
    let status = Arc::new(RunStatus::new());
    let _run = status.try_begin().unwrap();

    assert!(status.try_begin().is_err());
    assert!(status.is_running());
}
