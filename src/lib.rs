//! School-Crawler: a concurrent crawler for paginated school directories
//!
//! This crate walks the search listing of a school directory, extracts one
//! record per listing block, optionally enriches each record with the
//! canonical address from its detail page, and writes the deduplicated result
//! to a dated CSV file.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid pass transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PassState,
        to: state::PassState,
    },

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid header in config: {0}")]
    InvalidHeader(String),
}

/// Errors surfaced by the fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: ::url::ParseError,
    },
}

/// Errors raised while reading values out of a fetched document
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    #[error("Missing attribute '{attr}' on {element}")]
    MissingAttribute {
        element: &'static str,
        attr: &'static str,
    },

    #[error("No state abbreviation in address '{0}'")]
    MissingState(String),

    #[error("No numeric id in URL '{0}'")]
    MissingId(String),

    #[error("Invalid link: {0}")]
    InvalidLink(#[from] ::url::ParseError),

    #[error("Unreadable page count: {0}")]
    Pagination(String),
}

/// Errors raised while writing or reading tabular output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for document parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlReport};
pub use record::Record;
pub use state::PassState;
pub use storage::RecordStore;
