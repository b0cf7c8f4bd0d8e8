//! Listing enrichment against a third-party business register
//!
//! Enrichment never fails a run: every lookup problem degrades to a status
//! value on the record, and a stop request leaves the remaining records as
//! they were.

mod adhoc;

pub use adhoc::{AdHocDataClient, API_KEY_ENV};

use crate::harvester::pacing;
use crate::state::StopSignal;
use crate::storage::Record;
use async_trait::async_trait;
use std::time::Duration;

/// Status written when a record was enriched
pub const STATUS_YES: &str = "yes";
pub const STATUS_MISSING_NAME: &str = "no (missing name)";
pub const STATUS_MISSING_ADDRESS: &str = "no (missing address)";
pub const STATUS_NO_MATCH: &str = "no (no name+address match)";
pub const STATUS_LOOKUP_FAILED: &str = "no (lookup failed)";

/// Adds fields to a record from an external source
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Returns the enriched record, or the original annotated with a
    /// "no (...)" status
    async fn enrich(&self, record: &Record) -> Record;
}

/// Enriches every record in order
///
/// Sleeps `delay` between lookups. Once `stop` trips, the rest of the records
/// are returned untouched.
pub async fn enrich_records<E: Enricher + ?Sized>(
    enricher: &E,
    records: Vec<Record>,
    delay: Duration,
    stop: &StopSignal,
) -> Vec<Record> {
    let total = records.len();
    let mut enriched = Vec::with_capacity(total);
    let mut remaining = records.into_iter();
    let mut processed = 0;

    tracing::info!("Enriching {} records", total);

    for record in remaining.by_ref() {
        if stop.is_tripped() {
            enriched.push(record);
            break;
        }

        enriched.push(enricher.enrich(&record).await);
        processed += 1;

        if processed % 10 == 0 {
            tracing::info!("Enriched {}/{} records", processed, total);
        }

        if processed < total && pacing::pause(delay, stop).await.is_err() {
            break;
        }
    }

    enriched.extend(remaining);
    if processed < total {
        tracing::warn!(
            "Enrichment stopped after {}/{} records",
            processed,
            total
        );
    } else {
        tracing::info!("Enriched {} records", total);
    }

    enriched
}
