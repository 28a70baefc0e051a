//! Output module for crawl results
//!
//! This module handles:
//! - Writing the dated results file at checkpoints and at the end of a crawl
//! - Reading results back
//! - Splitting a results file into one file per state

pub mod csv_output;
pub mod states;

pub use csv_output::{read_records, results_path, todays_results_path, write_records};
pub use states::split_by_state;
