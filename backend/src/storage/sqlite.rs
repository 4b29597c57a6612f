//! SQLite-backed storage.
//!
//! Daily records are persisted as one JSON document per (child, date); the
//! engine always rewrites the whole record, so row-level event storage would
//! buy nothing. The scrape log is a plain append-only table.

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use tracing::debug;

use crate::domain::models::{DailyRecord, ScrapeLogEntry, ScrapeResult};

use super::traits::{DailyRecordStorage, ScrapeLogStorage, StorageError};

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect, creating the database file and schema if missing
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }
        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;
        debug!(url, "storage ready");
        Ok(Self { pool })
    }

    /// Fresh in-memory database, one per call
    #[cfg(test)]
    pub async fn connect_test() -> Result<Self, StorageError> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::connect(&format!("file:memdb_{id}?mode=memory&cache=shared")).await
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_records (
                child_id   TEXT NOT NULL,
                date       TEXT NOT NULL,
                data       TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (child_id, date)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scrape_log (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp    TEXT NOT NULL,
                success      INTEGER NOT NULL,
                message      TEXT,
                events_count INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_daily_records_date
            ON daily_records(date DESC);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    fn decode_record(
        child_id: &str,
        date: NaiveDate,
        data: &str,
    ) -> Result<DailyRecord, StorageError> {
        serde_json::from_str(data).map_err(|source| StorageError::CorruptRecord {
            child_id: child_id.to_string(),
            date,
            source,
        })
    }
}

#[async_trait]
impl DailyRecordStorage for SqliteStore {
    async fn load(
        &self,
        child_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, StorageError> {
        let row = sqlx::query("SELECT data FROM daily_records WHERE child_id = ? AND date = ?")
            .bind(child_id)
            .bind(date.format(DATE_FMT).to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.get("data");
                Ok(Some(Self::decode_record(child_id, date, &data)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, record: &DailyRecord) -> Result<(), StorageError> {
        let data = serde_json::to_string(record).map_err(|source| StorageError::CorruptRecord {
            child_id: record.child_id.clone(),
            date: record.date,
            source,
        })?;
        sqlx::query(
            r#"
            INSERT INTO daily_records (child_id, date, data)
            VALUES (?, ?, ?)
            ON CONFLICT (child_id, date)
            DO UPDATE SET data = excluded.data, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&record.child_id)
        .bind(record.date.format(DATE_FMT).to_string())
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_all_for_date(&self, date: NaiveDate) -> Result<Vec<DailyRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT child_id, data FROM daily_records WHERE date = ? ORDER BY child_id",
        )
        .bind(date.format(DATE_FMT).to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let child_id: String = row.get("child_id");
                let data: String = row.get("data");
                Self::decode_record(&child_id, date, &data)
            })
            .collect()
    }

    async fn list_dates(&self, limit: u32) -> Result<Vec<NaiveDate>, StorageError> {
        let rows = sqlx::query(
            "SELECT DISTINCT date FROM daily_records ORDER BY date DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let raw: String = row.get("date");
                NaiveDate::parse_from_str(&raw, DATE_FMT).ok()
            })
            .collect())
    }
}

#[async_trait]
impl ScrapeLogStorage for SqliteStore {
    async fn log_pass(&self, result: &ScrapeResult) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO scrape_log (timestamp, success, message, events_count)
            VALUES (?, ?, ?, ?)
            "#,
        )
        // Wall-clock, same frame as event timestamps and the scheduler's
        // notion of "today"
        .bind(Local::now().naive_local().format(TIMESTAMP_FMT).to_string())
        .bind(result.success)
        .bind(&result.message)
        .bind(result.total_events() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn last_pass(&self) -> Result<Option<ScrapeLogEntry>, StorageError> {
        Ok(self.history(1).await?.into_iter().next())
    }

    async fn history(&self, limit: u32) -> Result<Vec<ScrapeLogEntry>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, success, message, events_count
            FROM scrape_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let raw: String = row.get("timestamp");
                ScrapeLogEntry {
                    id: row.get("id"),
                    timestamp: NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FMT)
                        .unwrap_or_default(),
                    success: row.get("success"),
                    message: row.get("message"),
                    events_count: row.get("events_count"),
                }
            })
            .collect())
    }
}
