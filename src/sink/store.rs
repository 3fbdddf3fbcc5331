// src/sink/store.rs
// =============================================================================
// RecordStore: the durable collection of result records.
//
// Backed by SQLite through an sqlx pool. The only contract the crawler relies
// on is:
// - ensure_unique_index("id") can run on every start without harm
// - insert_one() either stores the record, or reports DuplicateKey when a
//   record with the same id is already there (never overwrites)
//
// Each record is kept twice: a few scalar columns for querying, plus the full
// JSON document so nothing the source sent is lost.
// =============================================================================

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;

use crate::model::ResultRecord;

const TABLE: &str = "result_records";

// Columns that can carry an index
const INDEXABLE: &[&str] = &["id", "mode", "ts", "suara_confirmed", "adm_confirmed"];

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this id is already stored
    #[error("record {0} already exists")]
    DuplicateKey(i64),

    #[error("cannot index unknown field '{0}'")]
    UnknownField(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    // Opens (or creates) the store behind `url` and makes sure the table exists
    //
    // Examples:
    //   sqlite:tally.db?mode=rwc   file on disk, created if missing
    //   sqlite::memory:            throwaway, for tests
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        // Every connection to :memory: is its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER NOT NULL,
                mode TEXT NOT NULL,
                ts TEXT NOT NULL,
                suara_confirmed INTEGER NOT NULL,
                adm_confirmed INTEGER NOT NULL,
                document TEXT NOT NULL
            )",
            TABLE
        ))
        .execute(&pool)
        .await?;

        info!(max_connections, "Connected to result store");
        Ok(Self { pool })
    }

    // Creates a descending unique index on `field` if it is not there yet
    pub async fn ensure_unique_index(&self, field: &str) -> Result<(), StoreError> {
        if !INDEXABLE.contains(&field) {
            return Err(StoreError::UnknownField(field.to_string()));
        }

        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {table}_{field}_unique ON {table} ({field} DESC)",
            table = TABLE,
            field = field
        ))
        .execute(&self.pool)
        .await?;

        info!(field, "Unique index ready");
        Ok(())
    }

    // Stores one record
    //
    // Returns StoreError::DuplicateKey if the unique index rejects it.
    pub async fn insert_one(&self, record: &ResultRecord) -> Result<(), StoreError> {
        let document = serde_json::to_string(record)?;

        let result = sqlx::query(&format!(
            "INSERT INTO {} (id, mode, ts, suara_confirmed, adm_confirmed, document)
             VALUES (?, ?, ?, ?, ?, ?)",
            TABLE
        ))
        .bind(record.id)
        .bind(record.mode.as_str())
        .bind(record.timestamp.as_str())
        .bind(record.suara_confirmed)
        .bind(record.adm_confirmed)
        .bind(document)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateKey(record.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", TABLE))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Loads the stored record with this id
    #[cfg(test)]
    pub async fn find(&self, id: i64) -> Result<Option<ResultRecord>, StoreError> {
        use sqlx::Row;

        let row = sqlx::query(&format!("SELECT document FROM {} WHERE id = ?", TABLE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let document: String = row.try_get("document")?;
                Ok(Some(serde_json::from_str(&document)?))
            }
            None => Ok(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(id: i64, votes: i64) -> ResultRecord {
        let mut tally = BTreeMap::new();
        tally.insert("A".to_string(), votes);
        ResultRecord {
            id,
            mode: "hhcw".to_string(),
            tally,
            attachments: vec!["https://img/1.jpg".to_string()],
            stats: Default::default(),
            auxiliary: serde_json::Value::Null,
            timestamp: "2024-02-15 08:00:00".to_string(),
            suara_confirmed: true,
            adm_confirmed: false,
            extra: Default::default(),
        }
    }

    async fn memory_store() -> RecordStore {
        let store = RecordStore::connect("sqlite::memory:").await.unwrap();
        store.ensure_unique_index("id").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = memory_store().await;
        store.insert_one(&record(42, 10)).await.unwrap();

        let found = store.find(42).await.unwrap().unwrap();
        assert_eq!(found, record(42, 10));
        assert!(store.find(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_reported_not_overwritten() {
        let store = memory_store().await;
        store.insert_one(&record(42, 10)).await.unwrap();

        let err = store.insert_one(&record(42, 99)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(42)));

        assert_eq!(store.count().await.unwrap(), 1);
        let kept = store.find(42).await.unwrap().unwrap();
        assert_eq!(kept.tally["A"], 10);
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let store = memory_store().await;
        store.ensure_unique_index("id").await.unwrap();
        store.ensure_unique_index("id").await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_index_field() {
        let store = memory_store().await;
        let err = store.ensure_unique_index("id; DROP TABLE x").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownField(_)));
    }

    #[tokio::test]
    async fn test_connect_to_bad_url_fails() {
        let result = RecordStore::connect("sqlite:/nonexistent-dir/nested/tally.db").await;
        assert!(result.is_err());
    }
}
