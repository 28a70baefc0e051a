//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PassState`: the lifecycle of one crawl pass (landing page, listing
//!   pages, optional detail pages)
//! - `PassTracker`: walks a pass through its states and rejects illegal moves

mod pass_state;

// Re-export main types
pub use pass_state::{PassState, PassTracker};
