//! Splits a results file into one file per state
//!
//! Each row's state is the first uppercase token of its address, the same
//! rule the listing parser uses. One worker per state drains a shared queue
//! of state names and writes `<STATE>_combined_.csv`.

use crate::crawler::queue::WorkQueue;
use crate::output::csv_output::{read_records, write_records};
use crate::record::{find_state, Record};
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Path of the split file for `state` under `dir`
pub fn state_file_path(dir: &Path, state: &str) -> PathBuf {
    dir.join(format!("{}_combined_.csv", state))
}

/// Groups records by the state token in their address
///
/// Records without a state token are skipped with a warning.
pub fn group_by_state(records: Vec<Record>) -> HashMap<String, Vec<Record>> {
    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    for record in records {
        match find_state(&record.address) {
            Some(state) => groups.entry(state.to_string()).or_default().push(record),
            None => tracing::warn!("No state in address of record {}, skipping", record.id),
        }
    }
    groups
}

/// Splits `input` into per-state files under `output_dir`
///
/// Returns the number of rows written for each state.
pub async fn split_by_state(input: &Path, output_dir: &Path) -> Result<BTreeMap<String, usize>> {
    tracing::info!("Reading the file >>> {}", input.display());
    let records = read_records(input)?;
    tracing::info!("Number of schools found: {}", records.len());

    let groups = Arc::new(group_by_state(records));
    tracing::info!(
        "Number of states found: {} || Filtering schools for each state...",
        groups.len()
    );

    let queue = Arc::new(WorkQueue::new());
    let mut workers = JoinSet::new();

    for _ in 0..groups.len() {
        let queue = Arc::clone(&queue);
        let groups = Arc::clone(&groups);
        let output_dir = output_dir.to_path_buf();

        workers.spawn(async move {
            let mut written = Vec::new();
            let mut failure = None;
            // Keep draining after a failed write so the queue join still completes.
            while let Some(state) = queue.get().await {
                let state: &String = &state;
                let rows = groups.get(state).map(Vec::as_slice).unwrap_or_default();
                let path = state_file_path(&output_dir, state);
                match write_records(&path, rows) {
                    Ok(count) => {
                        tracing::info!("{} records saved to {}", count, path.display());
                        written.push((state.clone(), count));
                    }
                    Err(e) => {
                        tracing::error!("Failed to write {}: {}", path.display(), e);
                        failure.get_or_insert(e);
                    }
                }
            }
            match failure {
                Some(e) => Err(e),
                None => Ok(written),
            }
        });
    }

    queue.put_all_and_join(groups.keys().cloned()).await;
    queue.close();

    let mut counts = BTreeMap::new();
    while let Some(result) = workers.join_next().await {
        counts.extend(result??);
    }

    tracing::info!("Done.");
    Ok(counts)
}
