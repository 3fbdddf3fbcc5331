// src/crawl/mod.rs
// =============================================================================
// This module handles walking the region tree.
//
// Features:
// - Recursive descent from the root listing down to polling units
// - A per-region cap on how many children are processed at once
// - Accepted results are handed to the sink over a bounded channel
//
// Submodules:
// - group: BoundedGroup, the per-region concurrency limiter
// - layout: UrlLayout, how listing and result URLs are built
// - engine: CrawlEngine, the traversal itself
// =============================================================================

mod engine;
mod group;
mod layout;

pub use engine::{CrawlEngine, CrawlSettings, DEFAULT_BRANCH_LIMIT, DEFAULT_TERMINAL_LEVEL};
pub use layout::{UrlLayout, DEFAULT_BASE_URL, DEFAULT_LISTING_SEGMENT, DEFAULT_RESULT_SEGMENT};
