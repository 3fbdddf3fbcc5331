// src/sink/mod.rs
// =============================================================================
// This module is the write side of the pipeline.
//
// Submodules:
// - store: RecordStore, the SQLite-backed collection with a unique id index
// - writer: ResultSink, the one task that drains the crawl channel into it
//
// Many crawl tasks send records; exactly one ResultSink receives them, so
// inserts never race each other.
// =============================================================================

mod store;
mod writer;

pub use store::{RecordStore, StoreError};
pub use writer::{ResultSink, SinkReport};
