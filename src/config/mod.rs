//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use school_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("settings.toml")).unwrap();
//! println!("Enrichment enabled: {}", config.full_address);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DedupIdentity, FetchConfig, FilterConfig, LevelCode, OutputConfig, RetryMode,
    SectorCode, SiteConfig, Variant,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
