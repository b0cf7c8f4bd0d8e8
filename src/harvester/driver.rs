//! Pagination driver - the harvest state machine
//!
//! `INITIAL_LOAD -> RESUMING (optional) -> ADVANCING -> finished`, where a
//! run finishes as exhausted, cancelled or failed. Whatever the outcome, the
//! store is flushed and the page closed before the report is returned.

use crate::browser::{BrowserPage, READY_STATE_JS, SCROLL_TO_BOTTOM_JS};
use crate::harvester::pacing::{pause, pause_between};
use crate::harvester::{Collector, HarvestCounts, HarvestOptions, HarvestReport};
use crate::output::persist_records;
use crate::site::{ControlLocator, SiteProfile};
use crate::state::{Phase, RunStatus, StopSignal, Termination};
use crate::storage::{Checkpoint, RecordStore};
use crate::{BrowserError, BrowserResult, HarvestError, Result};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Reloads of the target before location drift is given up on
const MAX_RELOCATIONS: u32 = 10;

/// Poll interval while waiting for `document.readyState`
const READY_POLL: Duration = Duration::from_millis(250);

/// Result of one loop iteration that did not fail
enum Step {
    Advanced { added: usize },
    NoControl,
}

pub(crate) struct Driver<'a, P: BrowserPage> {
    page: P,
    profile: &'a SiteProfile,
    options: &'a HarvestOptions,
    status: &'a RunStatus,
    stop: StopSignal,
    store: RecordStore,
    checkpoint: Checkpoint,
    counts: HarvestCounts,
    flushed_at: usize,
}

impl<'a, P: BrowserPage> Driver<'a, P> {
    pub(crate) fn new(
        page: P,
        profile: &'a SiteProfile,
        options: &'a HarvestOptions,
        status: &'a RunStatus,
        store: RecordStore,
        checkpoint: Checkpoint,
    ) -> Self {
        let seeded = store.size();
        Self {
            page,
            profile,
            options,
            status,
            stop: status.stop_signal(),
            store,
            checkpoint,
            counts: HarvestCounts {
                seeded,
                ..HarvestCounts::default()
            },
            flushed_at: seeded,
        }
    }

    /// Drives the page to a terminal outcome, then saves and releases it
    pub(crate) async fn run(mut self) -> HarvestReport {
        let started_at = Utc::now();
        self.status.set_collected(self.store.size());

        let termination = match self.drive().await {
            Ok(termination) => termination,
            Err(e) => Termination::from_error(e),
        };
        self.status.set_phase(Phase::Finished);

        if let Termination::Failed(e) = &termination {
            error!("Harvest failed: {}", e);
            self.status.set_error(e.to_string());
        }

        self.flush(false);

        if let Err(e) = self.page.close().await {
            warn!("Closing the page failed: {}", e);
        }

        self.status.log(format!(
            "Harvest {}: {} records ({} new) after {} advances",
            termination,
            self.store.size(),
            self.counts.added,
            self.counts.advances
        ));

        HarvestReport {
            records: self.store.into_records(),
            counts: self.counts,
            termination,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drive(&mut self) -> Result<Termination> {
        self.initial_load().await?;
        self.resume().await?;
        self.advance_loop().await
    }

    async fn initial_load(&mut self) -> Result<()> {
        self.status.set_phase(Phase::InitialLoad);
        self.stop.check()?;
        self.status
            .log(format!("Opening {}", self.options.target_url));

        self.open_target().await?;
        self.ensure_location().await?;
        pause(ms(self.options.timing.initial_settle_ms), &self.stop).await?;

        self.collect_best_effort("initial").await?;
        Ok(())
    }

    /// Replays the checkpointed advances without collecting, then collects once
    ///
    /// Only meaningful when the store was seeded from a previous run; otherwise
    /// the stale checkpoint is dropped.
    async fn resume(&mut self) -> Result<()> {
        if !self.options.resume {
            return Ok(());
        }

        if self.counts.seeded == 0 {
            self.checkpoint.clear();
            return Ok(());
        }

        let target = self.checkpoint.load();
        if target == 0 {
            return Ok(());
        }

        self.status.set_phase(Phase::Resuming);
        self.status
            .log(format!("Fast-forwarding {} advances", target));

        let mut replayed = 0;
        for _ in 0..target {
            self.stop.check()?;

            match locate_control(&self.page, &self.profile.load_more).await {
                Ok(Some(control)) => match self.click(&control).await {
                    Ok(()) => replayed += 1,
                    Err(e) if e.is_stop() => return Err(e),
                    Err(e) => debug!("Fast-forward click failed: {}", e),
                },
                Ok(None) => {
                    warn!(
                        "Load-more control gone after {} of {} replayed advances",
                        replayed, target
                    );
                    break;
                }
                Err(e) => debug!("Locating control during fast-forward failed: {}", e),
            }

            pause(ms(self.options.timing.fast_forward_ms), &self.stop).await?;
        }

        self.counts.advances = replayed;
        self.checkpoint.save(replayed);
        self.status
            .log(format!("Fast-forward done at advance {}", replayed));

        self.collect_best_effort("post fast-forward").await?;
        Ok(())
    }

    async fn advance_loop(&mut self) -> Result<Termination> {
        self.status.set_phase(Phase::Advancing);
        let threshold = self.options.failure_threshold.max(1);
        let mut failures = 0;
        let mut idle = 0;

        loop {
            self.stop.check()?;

            if let Some(max) = self.options.max_advances {
                if self.counts.advances >= max {
                    self.status
                        .log(format!("Advance budget of {} reached", max));
                    return Ok(Termination::Exhausted);
                }
            }

            match self.advance_once().await {
                Ok(Step::Advanced { added }) => {
                    failures = 0;
                    self.flush_if_due();

                    if added == 0 {
                        idle += 1;
                        self.status.log(format!(
                            "Advance {} added no new records ({} in a row)",
                            self.counts.advances, idle
                        ));
                        if let Some(max_idle) = self.options.max_idle_advances {
                            if idle >= max_idle {
                                self.status.log(format!(
                                    "Stopping after {} advances without new records",
                                    idle
                                ));
                                return Ok(Termination::Exhausted);
                            }
                        }
                    } else {
                        idle = 0;
                    }
                }
                Ok(Step::NoControl) => {
                    self.status
                        .log("No load-more control left, collecting once more");
                    self.collect_best_effort("final").await?;
                    return Ok(Termination::Exhausted);
                }
                Err(e) if e.is_stop() => return Err(e),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    failures += 1;
                    self.counts.failures += 1;
                    warn!(
                        "Advance attempt failed ({}/{}): {}",
                        failures, threshold, e
                    );
                    if failures >= threshold {
                        self.status.log(format!(
                            "Giving up after {} consecutive failures",
                            failures
                        ));
                        return Err(e);
                    }
                    pause_between(
                        self.options.timing.backoff_min_ms,
                        self.options.timing.backoff_max_ms,
                        &self.stop,
                    )
                    .await?;
                }
            }
        }
    }

    async fn advance_once(&mut self) -> Result<Step> {
        let options = self.options;
        let timing = &options.timing;

        self.ensure_location().await?;
        self.page.execute_script(SCROLL_TO_BOTTOM_JS).await?;
        pause_between(timing.scroll_settle_min_ms, timing.scroll_settle_max_ms, &self.stop)
            .await?;

        let Some(control) = locate_control(&self.page, &self.profile.load_more).await? else {
            return Ok(Step::NoControl);
        };

        self.page.scroll_into_view(&control).await?;
        pause_between(timing.pre_click_min_ms, timing.pre_click_max_ms, &self.stop).await?;
        self.click(&control).await?;

        self.counts.advances += 1;
        self.checkpoint.save(self.counts.advances);
        self.status
            .log(format!("Advance {}: loading more results", self.counts.advances));

        pause_between(timing.post_click_min_ms, timing.post_click_max_ms, &self.stop).await?;
        self.wait_until_ready().await?;
        pause_between(timing.render_settle_min_ms, timing.render_settle_max_ms, &self.stop)
            .await?;

        let added = self.collect().await?;
        Ok(Step::Advanced { added })
    }

    /// Programmatic click with a stop check on both sides
    async fn click(&self, control: &P::Element) -> Result<()> {
        self.stop.check()?;
        self.page.click(control).await?;
        self.stop.check()
    }

    async fn collect(&mut self) -> Result<usize> {
        let collector = Collector::new(
            self.profile,
            self.status,
            ms(self.options.timing.lazy_load_ms),
            self.options.verbose,
        );

        let result = collector.collect(&self.page, &mut self.store).await;
        let outcome = result?;
        self.counts.absorb(&outcome);
        Ok(outcome.added)
    }

    /// A collection pass outside the advance loop
    ///
    /// Transient page errors are logged and the pass is skipped, so records
    /// already in the store still count toward the outcome. Stop requests and
    /// fatal errors propagate.
    async fn collect_best_effort(&mut self, pass: &str) -> Result<usize> {
        match self.collect().await {
            Ok(added) => Ok(added),
            Err(e) if e.is_stop() || !e.is_transient() => Err(e),
            Err(e) => {
                warn!("Skipping {} collection pass: {}", pass, e);
                self.status
                    .log(format!("Collection pass ({}) failed: {}", pass, e));
                Ok(0)
            }
        }
    }

    /// Clears state, loads the target and dismisses the consent banner
    async fn open_target(&self) -> Result<()> {
        if let Err(e) = self.page.delete_cookies().await {
            debug!("Clearing cookies failed: {}", e);
        }

        self.page.navigate(&self.options.target_url).await?;
        pause_between(
            self.options.timing.scroll_settle_min_ms,
            self.options.timing.scroll_settle_max_ms,
            &self.stop,
        )
        .await?;

        match locate_control(&self.page, &self.profile.consent).await {
            Ok(Some(button)) => {
                if self.page.click(&button).await.is_ok() {
                    debug!("Cookie banner dismissed");
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Looking for a cookie banner failed: {}", e),
        }

        Ok(())
    }

    /// Re-opens the target while the page has wandered off the guarded path
    async fn ensure_location(&self) -> Result<()> {
        let Some(fragment) = self.profile.guarded_path(&self.options.target_url) else {
            return Ok(());
        };

        for attempt in 1..=MAX_RELOCATIONS {
            let current = self.page.current_url().await?;
            if current.contains(fragment) {
                return Ok(());
            }

            warn!(
                "Page drifted to {} (attempt {}/{}), reopening target",
                current, attempt, MAX_RELOCATIONS
            );
            self.open_target().await?;
            pause(ms(self.options.timing.initial_settle_ms), &self.stop).await?;
        }

        let actual = self.page.current_url().await?;
        if actual.contains(fragment) {
            Ok(())
        } else {
            Err(HarvestError::Navigation {
                expected: fragment.to_string(),
                actual,
            })
        }
    }

    /// Polls `document.readyState` until it is "complete"
    async fn wait_until_ready(&self) -> Result<()> {
        let timeout = ms(self.options.timing.ready_timeout_ms);
        let started = Instant::now();

        loop {
            self.stop.check()?;
            let state = self.page.execute_script(READY_STATE_JS).await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(BrowserError::Timeout("document ready state".to_string()).into());
            }
            pause(READY_POLL.min(timeout - elapsed), &self.stop).await?;
        }
    }

    /// Writes both output files whenever the store crosses another
    /// multiple of the save interval
    fn flush_if_due(&mut self) {
        let interval = self.options.save_interval.max(1);
        if self.store.size() / interval > self.flushed_at / interval {
            self.flush(true);
        }
    }

    /// Best-effort write of both output files
    fn flush(&mut self, silent: bool) {
        match persist_records(
            self.store.records(),
            &self.profile.columns,
            &self.options.csv_path,
            &self.options.xlsx_path,
        ) {
            Ok(()) => {
                self.flushed_at = self.store.size();
                if silent {
                    debug!("Intermediate save: {} records", self.store.size());
                } else {
                    self.status.log(format!(
                        "Saved {} records to {} and {}",
                        self.store.size(),
                        self.options.csv_path.display(),
                        self.options.xlsx_path.display()
                    ));
                }
            }
            Err(e) => warn!("Saving records failed: {}", e),
        }
    }
}

/// Finds a visible, enabled control: by selector first, then by text
///
/// Elements that go stale while being inspected are passed over.
pub async fn locate_control<P: BrowserPage>(
    page: &P,
    locator: &ControlLocator,
) -> BrowserResult<Option<P::Element>> {
    for element in page.find(locator.selector).await? {
        if matches!(page.is_interactable(&element).await, Ok(true)) {
            return Ok(Some(element));
        }
    }

    for element in page.find(locator.text_selector).await? {
        let text = match page.text(&element).await {
            Ok(text) => text,
            Err(_) => continue,
        };
        if locator.matches_text(&text) && matches!(page.is_interactable(&element).await, Ok(true))
        {
            return Ok(Some(element));
        }
    }

    Ok(None)
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
