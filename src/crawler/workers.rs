//! Page and enrichment worker pools
//!
//! Both pools are fixed-size sets of tokio tasks draining a [`WorkQueue`].
//! A job that fails is logged and still marked done, so a queue join never
//! waits on a failed fetch.

use crate::config::{Config, Variant};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::params::ParamSet;
use crate::crawler::parser::{parse_canonical_address, parse_listing};
use crate::crawler::queue::WorkQueue;
use crate::record::Record;
use crate::storage::RecordStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Search URL and parameters shared by every page of one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassTarget {
    pub url: String,
    pub params: ParamSet,
}

/// One listing page to crawl
#[derive(Debug, Clone)]
pub struct PageJob {
    pub page: u32,
    pub target: Arc<PassTarget>,
}

/// One record whose detail page holds the canonical address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressJob {
    pub index: usize,
    pub url: String,
}

/// Completion counters, used for progress logging
#[derive(Debug, Default)]
pub struct PoolStats {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl PoolStats {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    fn record(&self, ok: bool) -> usize {
        if !ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Everything a worker needs besides its queue
#[derive(Debug)]
pub struct WorkerContext {
    pub config: Arc<Config>,
    pub fetcher: Fetcher,
    pub store: Arc<RecordStore>,
}

/// Applies the variant's post-processing to freshly parsed records
///
/// `sector-level` keeps only the lower-cased first character of the level
/// code. `single-sector` drops records whose level code or school type is
/// blacklisted.
pub fn post_process(records: Vec<Record>, config: &Config) -> Vec<Record> {
    match config.variant {
        Variant::SectorLevel => records
            .into_iter()
            .map(|mut record| {
                record.level_code = level_initial(&record.level_code);
                record
            })
            .collect(),
        Variant::SingleSector => records
            .into_iter()
            .filter(|record| {
                !config.level_code_blacklist.contains(&record.level_code)
                    && !config.school_type_blacklist.contains(&record.category)
            })
            .collect(),
    }
}

fn level_initial(level_code: &str) -> String {
    level_code
        .chars()
        .next()
        .map(|c| c.to_lowercase().collect())
        .unwrap_or_default()
}

/// Returns true if inserting into a store of `len` records should checkpoint
pub fn checkpoint_due(config: &Config, len: usize) -> bool {
    let interval = config.output.checkpoint_interval;
    config.variant == Variant::SectorLevel && interval > 0 && len % interval == 0
}

/// Spawns `count` page workers into `workers`
pub fn spawn_page_workers(
    workers: &mut JoinSet<()>,
    count: usize,
    queue: Arc<WorkQueue<PageJob>>,
    context: Arc<WorkerContext>,
    stats: Arc<PoolStats>,
) {
    for id in 0..count {
        let queue = Arc::clone(&queue);
        let context = Arc::clone(&context);
        let stats = Arc::clone(&stats);
        workers.spawn(async move {
            page_worker(id, &queue, &context, &stats).await;
        });
    }
}

/// Spawns `count` enrichment workers into `workers`
pub fn spawn_address_workers(
    workers: &mut JoinSet<()>,
    count: usize,
    queue: Arc<WorkQueue<AddressJob>>,
    context: Arc<WorkerContext>,
    stats: Arc<PoolStats>,
) {
    for id in 0..count {
        let queue = Arc::clone(&queue);
        let context = Arc::clone(&context);
        let stats = Arc::clone(&stats);
        workers.spawn(async move {
            address_worker(id, &queue, &context, &stats).await;
        });
    }
}

async fn page_worker(
    id: usize,
    queue: &WorkQueue<PageJob>,
    context: &WorkerContext,
    stats: &PoolStats,
) {
    tracing::debug!("Page worker {} started", id);

    while let Some(job) = queue.get().await {
        let ok = match crawl_page(&job, context).await {
            Ok(inserted) => {
                tracing::debug!("Page {}: {} new records", job.page, inserted);
                true
            }
            Err(e) => {
                tracing::warn!("Page {} of {} failed: {}", job.page, job.target.url, e);
                false
            }
        };

        let crawled = stats.record(ok);
        tracing::info!(
            "Queued pages: {} || Crawled pages: {} || Records found: {}",
            queue.unfinished().saturating_sub(1),
            crawled,
            context.store.len()
        );
    }

    tracing::debug!("Page worker {} stopped", id);
}

/// Fetches, parses and stores one listing page; returns new records
async fn crawl_page(job: &PageJob, context: &WorkerContext) -> crate::Result<usize> {
    let query = job.target.params.with_page(job.page);
    let document = context.fetcher.fetch(&job.target.url, &query).await?;
    let records = post_process(parse_listing(&document)?, &context.config);

    let mut inserted = 0;
    for record in records {
        let Some(len) = context.store.insert(record) else {
            continue;
        };
        inserted += 1;

        if checkpoint_due(&context.config, len) {
            let store = Arc::clone(&context.store);
            match tokio::task::spawn_blocking(move || store.checkpoint_prefix(len)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!("Checkpoint at {} records failed: {}", len, e),
                Err(e) => tracing::error!("Checkpoint task at {} records failed: {}", len, e),
            }
        }
    }

    Ok(inserted)
}

async fn address_worker(
    id: usize,
    queue: &WorkQueue<AddressJob>,
    context: &WorkerContext,
    stats: &PoolStats,
) {
    tracing::debug!("Address worker {} started", id);

    while let Some(job) = queue.get().await {
        let ok = match enrich(&job, context).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Could not fetch full address from {}: {}", job.url, e);
                false
            }
        };

        let fetched = stats.record(ok);
        tracing::info!(
            "Queued addresses: {} || Fetched addresses: {}",
            queue.unfinished().saturating_sub(1),
            fetched
        );
    }

    tracing::debug!("Address worker {} stopped", id);
}

async fn enrich(job: &AddressJob, context: &WorkerContext) -> crate::Result<()> {
    let document = context.fetcher.fetch(&job.url, &[]).await?;
    let address = parse_canonical_address(&document)?;
    if !context.store.set_address(job.index, address) {
        tracing::warn!("No record at index {} for {}", job.index, job.url);
    }
    Ok(())
}
