// src/fetch/mod.rs
// =============================================================================
// This module retrieves and decodes documents from the results API.
//
// Submodules:
// - error: FetchError, the single failure type for one node
// - http: the reqwest-backed fetcher used in production
//
// The crawler talks to a `NodeSource` trait instead of reqwest directly so the
// tests can feed it an in-memory hierarchy.
// =============================================================================

mod error;
mod http;

#[cfg(test)]
pub mod fixture;

pub use error::FetchError;
pub use http::HttpFetcher;

use async_trait::async_trait;

use crate::model::{Descriptor, ResultRecord};

// Anything that can answer "what is at this URL?"
//
// One call = one retrieval. Implementations must not retry: a failure is
// reported for that single node and the caller drops the branch.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Fetches a region listing
    async fn fetch(&self, url: &str) -> Result<Vec<Descriptor>, FetchError>;

    /// Fetches the result document of one polling unit
    async fn fetch_leaf(&self, url: &str) -> Result<ResultRecord, FetchError>;
}
