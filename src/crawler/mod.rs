//! Crawler module for listing and detail page processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry policies
//! - Listing, pagination and detail page parsing
//! - Filter parameter derivation and pass planning
//! - Work queues and the page/enrichment worker pools
//! - Overall crawl coordination

mod coordinator;
pub mod fetcher;
pub mod params;
pub mod parser;
pub mod passes;
pub mod queue;
pub mod workers;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, Backoff, Document, Fetcher, RetryPolicy};
pub use params::{build_params, ParamSet};
pub use parser::{parse_canonical_address, parse_listing, parse_page_count};
pub use passes::{plan_passes, Pass};
pub use queue::WorkQueue;

use crate::config::Config;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and an empty record store
/// 2. Start the worker pools
/// 3. Walk every planned pass: landing page, listing pages, detail pages
/// 4. Write the deduplicated results file
pub async fn crawl(config: Config) -> crate::Result<CrawlReport> {
    run_crawl(config).await
}
