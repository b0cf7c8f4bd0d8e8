//! In-memory, insertion-ordered record store with duplicate detection

use crate::output::load_records;
use crate::site::Column;
use crate::storage::{IdentityKey, Record};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// All records of one run plus the indexes used for deduplication
///
/// Every stored record contributes its URL (when it has one) to the URL
/// index and its (name, address) pair to the pair index; nothing else is
/// ever indexed.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
    urls: HashSet<String>,
    pairs: HashSet<IdentityKey>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already collected records, dropping duplicates
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut store = Self::new();
        for record in records {
            if !store.would_be_duplicate(&record) {
                store.insert(record);
            }
        }
        store
    }

    /// Seeds a store from the files of a previous run
    ///
    /// The CSV file is tried first and the XLSX file second. A missing or
    /// unreadable file is not an error: the result is simply an empty store.
    ///
    /// # Arguments
    ///
    /// * `csv_path` - Delimited-text output of the previous run
    /// * `xlsx_path` - Spreadsheet output of the previous run
    /// * `columns` - Layout used to map headers back to field keys
    pub fn load(csv_path: &Path, xlsx_path: &Path, columns: &[Column]) -> Self {
        for path in [csv_path, xlsx_path] {
            if !path.exists() {
                debug!("No previous output at {}", path.display());
                continue;
            }

            match load_records(path, columns) {
                Ok(records) if !records.is_empty() => {
                    let store = Self::from_records(records);
                    debug!("Loaded {} records from {}", store.size(), path.display());
                    return store;
                }
                Ok(_) => debug!("{} holds no records", path.display()),
                Err(e) => warn!("Could not read {}: {}", path.display(), e),
            }
        }

        Self::new()
    }

    /// Returns true if a record with the same identity key is already stored
    pub fn would_be_duplicate(&self, record: &Record) -> bool {
        match record.identity_key() {
            IdentityKey::Url(url) => self.urls.contains(&url),
            pair => self.pairs.contains(&pair),
        }
    }

    /// Appends the record unless it is a duplicate or extraction noise
    ///
    /// # Returns
    ///
    /// * `true` - The record was appended
    /// * `false` - The record was rejected and the store is unchanged
    pub fn add_if_new(&mut self, record: Record) -> bool {
        if record.is_noise() || self.would_be_duplicate(&record) {
            return false;
        }
        self.insert(record);
        true
    }

    fn insert(&mut self, record: Record) {
        if let Some(url) = record.profile_url() {
            self.urls.insert(url.to_string());
        }
        self.pairs.insert(record.name_address_key());
        self.records.push(record);
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The most recently added record
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
