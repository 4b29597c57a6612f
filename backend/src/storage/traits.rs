//! Storage abstraction for daily records and the scrape log.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::models::{DailyRecord, ScrapeLogEntry, ScrapeResult};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored record no longer deserializes to the current event model
    #[error("corrupt record for {child_id} on {date}: {source}")]
    CorruptRecord {
        child_id: String,
        date: NaiveDate,
        source: serde_json::Error,
    },
}

/// Persistence for per-(child, date) records.
#[async_trait]
pub trait DailyRecordStorage: Send + Sync {
    async fn load(
        &self,
        child_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, StorageError>;

    /// Upsert: a record for the same (child, date) is replaced wholesale
    async fn save(&self, record: &DailyRecord) -> Result<(), StorageError>;

    async fn load_all_for_date(&self, date: NaiveDate) -> Result<Vec<DailyRecord>, StorageError>;

    /// Distinct dates with stored records, newest first
    async fn list_dates(&self, limit: u32) -> Result<Vec<NaiveDate>, StorageError>;
}

/// Append-only log of scrape pass outcomes.
#[async_trait]
pub trait ScrapeLogStorage: Send + Sync {
    async fn log_pass(&self, result: &ScrapeResult) -> Result<(), StorageError>;

    async fn last_pass(&self) -> Result<Option<ScrapeLogEntry>, StorageError>;

    /// Most recent entries, newest first
    async fn history(&self, limit: u32) -> Result<Vec<ScrapeLogEntry>, StorageError>;
}
