//! Storage module for collected listings
//!
//! This module holds everything a run keeps between advances:
//! - `Record` / `FieldValue`: one listing with explicit "missing" fields
//! - `RecordStore`: ordered records with URL and (name, address) indexes
//! - `Checkpoint`: the persisted advance count used when resuming

mod checkpoint;
mod record;
mod record_store;

pub use checkpoint::Checkpoint;
pub use record::{keys, FieldValue, IdentityKey, Record};
pub use record_store::RecordStore;
