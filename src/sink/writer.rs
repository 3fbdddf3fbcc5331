// src/sink/writer.rs
// =============================================================================
// ResultSink: the single consumer of the crawl's output channel.
//
// Lifecycle:
// 1. start(): connect to the store and make sure the unique id index exists.
//    Any failure here is fatal for the whole run; the caller aborts.
// 2. run(): insert every received record, one at a time, until every sender
//    has been dropped and the channel is empty.
// 3. Close the store and hand back a SinkReport.
//
// An insert that fails does not stop the loop. Producers may be blocked on a
// full channel, so the sink must keep receiving until the very end.
// =============================================================================

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{RecordStore, StoreError};
use crate::model::ResultRecord;

// What happened to the records the sink received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Records taken off the channel
    pub received: u64,
    /// Records newly stored
    pub inserted: u64,
    /// Records skipped because their id was already stored
    pub duplicates: u64,
    /// Records lost to any other storage error
    pub failed: u64,
    /// Records in the store after draining
    pub stored_total: i64,
}

pub struct ResultSink {
    store: RecordStore,
}

impl ResultSink {
    // Connects to the store and prepares the unique index
    pub async fn start(store_url: &str) -> Result<Self, StoreError> {
        let store = RecordStore::connect(store_url).await?;
        store.ensure_unique_index("id").await?;
        Ok(Self { store })
    }

    #[cfg(test)]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    // Drains the channel into the store, then closes the store
    pub async fn run(self, records: mpsc::Receiver<ResultRecord>) -> SinkReport {
        let report = self.drain(records).await;
        self.store.close().await;
        info!(
            received = report.received,
            inserted = report.inserted,
            duplicates = report.duplicates,
            failed = report.failed,
            "Result sink finished"
        );
        report
    }

    // Inserts records until the channel is closed and empty
    pub async fn drain(&self, mut records: mpsc::Receiver<ResultRecord>) -> SinkReport {
        let mut report = SinkReport::default();

        while let Some(record) = records.recv().await {
            report.received += 1;
            let id = record.id;

            match self.store.insert_one(&record).await {
                Ok(()) => {
                    report.inserted += 1;
                    debug!(id, "Stored result");
                }
                Err(StoreError::DuplicateKey(id)) => {
                    report.duplicates += 1;
                    warn!(id, "Result already stored, skipping");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(id, error = %e, "Failed to store result");
                }
            }
        }

        report.stored_total = match self.store.count().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Could not count stored results");
                -1
            }
        };
        report
    }
}
