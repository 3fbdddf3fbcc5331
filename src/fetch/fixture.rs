// src/fetch/fixture.rs
// =============================================================================
// In-memory NodeSource for tests.
//
// Maps URL -> JSON body. URLs can be marked as failing, and every call is
// counted so tests can check how many requests were in flight at once.
// =============================================================================

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::http::decode;
use super::{FetchError, NodeSource};
use crate::model::{Descriptor, ResultRecord};

#[derive(Default)]
pub struct FixtureSource {
    bodies: HashMap<String, String>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` at `url`
    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Makes `url` fail with a transport error
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Adds latency to every request so concurrent calls overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Highest number of simultaneous requests observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Every URL requested so far, in call order
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    async fn body(&self, url: &str) -> Result<String, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing.contains(url) {
            Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection reset".to_string(),
            })
        } else {
            self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl NodeSource for FixtureSource {
    async fn fetch(&self, url: &str) -> Result<Vec<Descriptor>, FetchError> {
        let body = self.body(url).await?;
        decode(url, body.as_bytes())
    }

    async fn fetch_leaf(&self, url: &str) -> Result<ResultRecord, FetchError> {
        let body = self.body(url).await?;
        decode(url, body.as_bytes())
    }
}

/// JSON listing body for `(code, level)` pairs
pub fn listing(nodes: &[(&str, u32)]) -> String {
    let entries: Vec<serde_json::Value> = nodes
        .iter()
        .enumerate()
        .map(|(i, (code, level))| {
            serde_json::json!({
                "nama": format!("NODE {}", code),
                "id": i as i64 + 1,
                "kode": code,
                "tingkat": level,
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

/// JSON result document body
pub fn result_doc(confirmed: bool, tally: &[(&str, i64)]) -> String {
    let chart: serde_json::Map<String, serde_json::Value> = tally
        .iter()
        .map(|(label, votes)| (label.to_string(), serde_json::Value::from(*votes)))
        .collect();
    serde_json::json!({
        "mode": "hhcw",
        "chart": chart,
        "images": ["https://img/c1.jpg"],
        "administrasi": {"suara_sah": tally.iter().map(|(_, v)| v).sum::<i64>()},
        "psu": null,
        "ts": "2024-02-15 08:00:00",
        "status_suara": confirmed,
        "status_adm": false,
    })
    .to_string()
}
