//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives a crawl through its passes:
//! - Starting the page and enrichment worker pools once
//! - Fetching each pass's landing page and deriving its parameters
//! - Seeding and draining the page queue, then the address queue
//! - Writing the final results file

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::params::{build_params, ParamSet};
use crate::crawler::parser::parse_page_count;
use crate::crawler::passes::{plan_passes, Pass};
use crate::crawler::queue::WorkQueue;
use crate::crawler::workers::{
    spawn_address_workers, spawn_page_workers, AddressJob, PageJob, PassTarget, PoolStats,
    WorkerContext,
};
use crate::output::todays_results_path;
use crate::state::{PassState, PassTracker};
use crate::storage::RecordStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Summary of a finished crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub passes_completed: usize,
    pub passes_failed: usize,
    pub records: usize,
    pub enriched: usize,
    pub output_path: PathBuf,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    context: Arc<WorkerContext>,
    pages: Arc<WorkQueue<PageJob>>,
    addresses: Arc<WorkQueue<AddressJob>>,
    page_stats: Arc<PoolStats>,
    address_stats: Arc<PoolStats>,
    workers: JoinSet<()>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Builds the HTTP client and an empty record store writing to today's
    /// results file. No worker is started until [`run`](Self::run).
    pub fn new(config: Config) -> crate::Result<Self> {
        let fetcher = Fetcher::from_config(&config.fetch)?;
        let output_path = todays_results_path(&config.output.dir);
        let store = Arc::new(RecordStore::new(config.dedup, output_path));
        let config = Arc::new(config);

        let context = Arc::new(WorkerContext {
            config: Arc::clone(&config),
            fetcher,
            store,
        });

        Ok(Self {
            config,
            context,
            pages: Arc::new(WorkQueue::new()),
            addresses: Arc::new(WorkQueue::new()),
            page_stats: Arc::new(PoolStats::default()),
            address_stats: Arc::new(PoolStats::default()),
            workers: JoinSet::new(),
        })
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.context.store
    }

    /// Runs every planned pass, then writes the final results file
    ///
    /// A failed pass is logged and does not stop later passes. Records
    /// already stored always reach the final file.
    pub async fn run(mut self) -> crate::Result<CrawlReport> {
        let passes = plan_passes(&self.config);
        if passes.is_empty() {
            tracing::error!("Please specify the levels in the filter settings!");
        }

        let start_time = Instant::now();
        self.start_workers();

        let mut passes_completed = 0;
        let mut passes_failed = 0;
        for pass in &passes {
            tracing::info!("Scraping schools from {}", pass.label());
            match self.run_pass(pass).await {
                Ok(()) => passes_completed += 1,
                Err(e) => {
                    tracing::error!("Pass '{}' failed: {}", pass.slug, e);
                    passes_failed += 1;
                }
            }
        }

        self.shutdown().await;

        let store = Arc::clone(&self.context.store);
        let writer = Arc::clone(&store);
        let records = tokio::task::spawn_blocking(move || writer.finalize()).await??;

        let report = CrawlReport {
            passes_completed,
            passes_failed,
            records,
            enriched: store.enriched_count(),
            output_path: store.output_path().to_path_buf(),
        };

        tracing::info!(
            "Crawl completed: {} records ({} enriched) from {} passes in {:?}",
            report.records,
            report.enriched,
            report.passes_completed,
            start_time.elapsed()
        );

        Ok(report)
    }

    fn start_workers(&mut self) {
        let count = self.config.thread_num;

        spawn_page_workers(
            &mut self.workers,
            count,
            Arc::clone(&self.pages),
            Arc::clone(&self.context),
            Arc::clone(&self.page_stats),
        );

        if self.config.full_address {
            spawn_address_workers(
                &mut self.workers,
                count,
                Arc::clone(&self.addresses),
                Arc::clone(&self.context),
                Arc::clone(&self.address_stats),
            );
        }

        tracing::debug!("Started {} workers", self.workers.len());
    }

    /// Closes both queues and waits for every worker to exit
    async fn shutdown(&mut self) {
        self.pages.close();
        self.addresses.close();

        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
            }
        }
    }

    async fn run_pass(&self, pass: &Pass) -> crate::Result<()> {
        let mut tracker = PassTracker::new(pass.slug.as_str());
        let result = self.drive_pass(pass, &mut tracker).await;
        if result.is_err() {
            tracker.fail();
        }
        result
    }

    async fn drive_pass(&self, pass: &Pass, tracker: &mut PassTracker) -> crate::Result<()> {
        let url = pass.url(&self.config.site.base_url);
        let base = ParamSet::base(self.config.site.distance.as_deref());

        let landing = self.context.fetcher.fetch(&url, &base.with_page(1)).await?;
        let params = build_params(&landing, &self.config.filter, &base)?;
        tracker.advance(PassState::ParamsReady)?;

        let page_count = parse_page_count(&landing)?;
        tracing::info!("Found {} pages for {}", page_count, pass.label());

        let target = Arc::new(PassTarget { url, params });
        let jobs = (1..=page_count).map(|page| PageJob {
            page,
            target: Arc::clone(&target),
        });

        tracker.advance(PassState::PagesQueued)?;
        self.pages.put_all_and_join(jobs).await;
        tracker.advance(PassState::PagesDrained)?;

        if self.config.full_address {
            let pending = self.context.store.pending_enrichment();
            tracing::info!("Fetching full addresses for {} records...", pending.len());

            tracker.advance(PassState::AddressesQueued)?;
            self.addresses
                .put_all_and_join(
                    pending
                        .into_iter()
                        .map(|(index, url)| AddressJob { index, url }),
                )
                .await;
            tracker.advance(PassState::AddressesDrained)?;
        }

        tracker.advance(PassState::PassComplete)
    }
}

/// Runs the main crawl operation
///
/// # Example
///
/// ```no_run
/// use school_crawler::config::load_config;
/// use school_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} records", report.records);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> crate::Result<CrawlReport> {
    Coordinator::new(config)?.run().await
}
