// src/fetch/http.rs
// =============================================================================
// The production NodeSource: plain HTTP GET with reqwest.
//
// Key functionality:
// - One shared Client (connection pooling across all crawl tasks)
// - Reads the whole body, then decodes it with serde_json
// - Non-2xx statuses and undecodable bodies are errors for that node only
//
// No retries: a failed node is reported once and the crawler skips it.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{FetchError, NodeSource};
use crate::model::{Descriptor, ResultRecord};

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    // Builds the shared HTTP client
    //
    // Parameters:
    //   timeout: per-request timeout (connect + body)
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    // GETs a URL and returns the full body
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| transport_error(url, e))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl NodeSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Descriptor>, FetchError> {
        let body = self.get_bytes(url).await?;
        decode(url, &body)
    }

    async fn fetch_leaf(&self, url: &str) -> Result<ResultRecord, FetchError> {
        let body = self.get_bytes(url).await?;
        decode(url, &body)
    }
}

// Decodes a response body into the expected shape
pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

// Turns a reqwest error into a readable transport failure
//
// Buckets: timeout, redirect loop, connection failure, anything else.
fn transport_error(url: &str, error: reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };

    FetchError::Transport {
        url: url.to_string(),
        message,
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why bytes() and not .json()?
//    - .json() folds decode failures into a reqwest::Error
//    - Reading the body first keeps "the network failed" and "the payload was
//      wrong" as two different FetchError variants
//
// 2. Why is HttpFetcher Clone?
//    - reqwest::Client is an Arc internally, so cloning is cheap
//    - The crawler only ever needs one, behind an Arc, but tests and callers
//      are free to copy it
// -----------------------------------------------------------------------------
