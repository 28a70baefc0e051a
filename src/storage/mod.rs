//! Storage for crawl results
//!
//! Results are held in memory for the whole crawl and persisted to CSV at
//! checkpoints and once more at the end.

mod store;

pub use store::RecordStore;
