//! CSV persistence for crawl results
//!
//! Every write produces a complete file: the header row followed by one row
//! per unique record. Checkpoints and the final write target the same dated
//! file, so the last write wins.

use crate::record::Record;
use crate::OutputError;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the results file path for the given day
pub fn results_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("results_{}.csv", date.format("%Y-%m-%d")))
}

/// Returns the results file path for today (local time)
pub fn todays_results_path(dir: &Path) -> PathBuf {
    results_path(dir, chrono::Local::now().date_naive())
}

/// Removes repeated records, keeping the first occurrence of each
pub fn dedup_records(records: &[Record]) -> Vec<&Record> {
    let mut seen = HashSet::with_capacity(records.len());
    records.iter().filter(|record| seen.insert(*record)).collect()
}

/// Writes `records` to `path` as CSV, creating parent directories
///
/// Duplicates are dropped before writing. Returns the number of data rows.
pub fn write_records(path: &Path, records: &[Record]) -> Result<usize, OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let unique = dedup_records(records);

    let mut writer = csv::Writer::from_path(path)?;
    if unique.is_empty() {
        writer.write_record(crate::record::COLUMNS)?;
    }
    for record in &unique {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(unique.len())
}

/// Reads records back from a results file
///
/// The `state` field is not stored in the file and is left empty.
pub fn read_records(path: &Path) -> Result<Vec<Record>, OutputError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}
