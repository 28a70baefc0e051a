//! In-memory record store
//!
//! Records are append-only: a record, once inserted, keeps its index for the
//! rest of the crawl and only its address may change afterwards. The
//! duplicate check and the append happen under one lock.

use crate::config::DedupIdentity;
use crate::output::csv_output::write_records;
use crate::record::Record;
use crate::OutputError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Key a record is deduplicated on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RecordKey {
    Id(String),
    Full(Record),
}

impl RecordKey {
    fn of(record: &Record, identity: DedupIdentity) -> Self {
        match identity {
            DedupIdentity::Id => Self::Id(record.id.clone()),
            DedupIdentity::FullRecord => Self::Full(record.clone()),
        }
    }
}

#[derive(Debug)]
struct Entry {
    record: Record,
    enriched: bool,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    keys: HashSet<RecordKey>,
}

/// Concurrency-safe, deduplicated collection of crawl results
#[derive(Debug)]
pub struct RecordStore {
    identity: DedupIdentity,
    output_path: PathBuf,
    inner: Mutex<Inner>,
    // Length of the longest snapshot written; also serializes file writes.
    written: Mutex<usize>,
}

impl RecordStore {
    /// Creates an empty store persisting to `output_path`
    pub fn new(identity: DedupIdentity, output_path: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            output_path: output_path.into(),
            inner: Mutex::new(Inner::default()),
            written: Mutex::new(0),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn identity(&self) -> DedupIdentity {
        self.identity
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a record unless an equal one is already held
    ///
    /// Returns the store size after the insert, or `None` for a duplicate.
    pub fn insert(&self, record: Record) -> Option<usize> {
        let key = RecordKey::of(&record, self.identity);
        let mut inner = self.lock();
        if !inner.keys.insert(key) {
            return None;
        }
        inner.entries.push(Entry {
            record,
            enriched: false,
        });
        Some(inner.entries.len())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies every record held so far, in insertion order
    pub fn snapshot(&self) -> Vec<Record> {
        self.lock()
            .entries
            .iter()
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Index and detail URL of every record not yet enriched
    pub fn pending_enrichment(&self) -> Vec<(usize, String)> {
        self.lock()
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.enriched)
            .map(|(index, entry)| (index, entry.record.url.clone()))
            .collect()
    }

    /// Replaces the address of the record at `index`
    ///
    /// Returns false if no record has that index.
    pub fn set_address(&self, index: usize, address: String) -> bool {
        let mut inner = self.lock();
        match inner.entries.get_mut(index) {
            Some(entry) => {
                entry.record.address = address;
                entry.enriched = true;
                true
            }
            None => false,
        }
    }

    pub fn enriched_count(&self) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.enriched)
            .count()
    }

    /// Writes every record held so far; returns the rows written
    pub fn checkpoint(&self) -> Result<usize, OutputError> {
        self.persist(None, "Checkpoint")
    }

    /// Writes the first `len` records; returns the rows written
    ///
    /// Skipped (returning 0) when a longer snapshot has already been
    /// written, so checkpoints finishing out of order never shrink the file.
    pub fn checkpoint_prefix(&self, len: usize) -> Result<usize, OutputError> {
        self.persist(Some(len), "Checkpoint")
    }

    /// Writes the final results file
    pub fn finalize(&self) -> Result<usize, OutputError> {
        self.persist(None, "Final results")
    }

    fn persist(&self, len: Option<usize>, what: &str) -> Result<usize, OutputError> {
        // Held from snapshot to write: the file only ever grows.
        let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());

        let records: Vec<Record> = {
            let inner = self.lock();
            let take = len.unwrap_or(inner.entries.len()).min(inner.entries.len());
            if take < *written {
                tracing::debug!(
                    "Skipping checkpoint of {} records, {} already saved",
                    take,
                    *written
                );
                return Ok(0);
            }
            inner
                .entries
                .iter()
                .take(take)
                .map(|entry| entry.record.clone())
                .collect()
        };

        let rows = write_records(&self.output_path, &records)?;
        *written = records.len();
        tracing::info!(
            "{}: {} records saved to {}",
            what,
            rows,
            self.output_path.display()
        );
        Ok(rows)
    }
}
