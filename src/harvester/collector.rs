//! One collection pass over the currently rendered page

use crate::browser::{BrowserPage, SCROLL_TO_BOTTOM_JS, SCROLL_TO_TOP_JS};
use crate::harvester::pacing::pause;
use crate::site::SiteProfile;
use crate::state::{RunStatus, StopSignal};
use crate::storage::RecordStore;
use crate::Result;
use std::time::Duration;
use tracing::debug;

/// Tallies of a single collection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectOutcome {
    /// Listing elements that passed the locator filter
    pub found: usize,

    /// New records appended to the store
    pub added: usize,

    /// Duplicates, plus elements that vanished before they could be read
    pub skipped: usize,

    /// Elements with neither a name nor an address
    pub discarded: usize,
}

/// Turns the rendered page into new `RecordStore` entries
pub struct Collector<'a> {
    profile: &'a SiteProfile,
    status: &'a RunStatus,
    stop: StopSignal,
    lazy_load: Duration,
    verbose: bool,
}

impl<'a> Collector<'a> {
    pub fn new(
        profile: &'a SiteProfile,
        status: &'a RunStatus,
        lazy_load: Duration,
        verbose: bool,
    ) -> Self {
        Self {
            profile,
            status,
            stop: status.stop_signal(),
            lazy_load,
            verbose,
        }
    }

    /// Runs one pass: materialize lazy content, locate listings, extract,
    /// deduplicate and append
    ///
    /// The stop signal is checked between elements. When it trips, records
    /// added so far stay in the store and `Err(Stopped)` is returned.
    ///
    /// One summary line is logged per pass, plus one line per new record in
    /// verbose mode.
    pub async fn collect<P: BrowserPage>(
        &self,
        page: &P,
        store: &mut RecordStore,
    ) -> Result<CollectOutcome> {
        let mut outcome = CollectOutcome::default();
        let result = self.collect_into(page, store, &mut outcome).await;

        self.status.set_collected(store.size());
        self.status.log(format!(
            "Pass complete: {} new, {} skipped, {} discarded of {} listings ({} total)",
            outcome.added,
            outcome.skipped,
            outcome.discarded,
            outcome.found,
            store.size()
        ));

        result.map(|_| outcome)
    }

    async fn collect_into<P: BrowserPage>(
        &self,
        page: &P,
        store: &mut RecordStore,
        outcome: &mut CollectOutcome,
    ) -> Result<()> {
        page.execute_script(SCROLL_TO_BOTTOM_JS).await?;
        pause(self.lazy_load, &self.stop).await?;
        page.execute_script(SCROLL_TO_TOP_JS).await?;

        let listings = self.locate_listings(page, outcome).await?;
        let page_url = page.current_url().await?;
        let extractor = &self.profile.extractor;

        for html in &listings {
            self.stop.check()?;
            outcome.found += 1;

            let record = extractor.extract(html, &page_url);
            if record.is_noise() {
                outcome.discarded += 1;
                continue;
            }

            let label = record.identity_key().to_string();
            let name = record.name().unwrap_or_default().to_string();
            if store.add_if_new(record) {
                outcome.added += 1;
                if self.verbose {
                    self.status
                        .log(format!("[{}] {} ({})", store.size(), name, label));
                }
            } else {
                outcome.skipped += 1;
            }
        }

        Ok(())
    }

    /// Outer HTML of the listings the locator accepts
    ///
    /// Selectors are tried in order (primary, then each fallback) and the
    /// first one with at least one accepted candidate wins. Unreadable nodes
    /// of the winning selector count as skipped.
    async fn locate_listings<P: BrowserPage>(
        &self,
        page: &P,
        outcome: &mut CollectOutcome,
    ) -> Result<Vec<String>> {
        let locator = &self.profile.listings;
        let selectors = std::iter::once(locator.primary).chain(locator.fallbacks.iter().copied());

        for (i, selector) in selectors.enumerate() {
            let elements = page.find(selector).await?;
            if elements.is_empty() {
                continue;
            }

            let mut accepted = Vec::new();
            let mut unreadable = 0;
            for element in &elements {
                self.stop.check()?;
                match page.outer_html(element).await {
                    Ok(html) if locator.accepts(&html) => accepted.push(html),
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Listing element unreadable: {}", e);
                        unreadable += 1;
                    }
                }
            }

            if !accepted.is_empty() {
                if i > 0 {
                    debug!("Using fallback listing selector '{}'", selector);
                }
                outcome.skipped += unreadable;
                return Ok(accepted);
            }
            debug!(
                "Listing selector '{}' matched {} elements, none accepted",
                selector,
                elements.len()
            );
        }

        Ok(Vec::new())
    }
}
