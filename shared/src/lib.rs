//! Shared API types for KidPulse.
//!
//! These are the wire shapes returned by the backend REST layer. They are
//! deliberately flat and stringly-timestamped so any frontend (or plain
//! `curl`) can consume them without pulling in the backend's domain model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Scraper status, returned by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always "running" while the process is alive
    pub status: String,
    pub last_scrape: Option<ScrapeLogEntryDto>,
    /// Next scheduled pass, local wall-clock, if the scheduler is active
    pub next_scheduled: Option<String>,
    pub ai_parsing_enabled: bool,
    pub scrape_interval_minutes: u64,
}

/// One row of the bounded scrape log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeLogEntryDto {
    pub timestamp: String,
    pub success: bool,
    pub message: Option<String>,
    pub events_count: i64,
}

/// A full day's data for every child, returned by the summary endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub date: NaiveDate,
    pub children: Vec<ChildSummaryDto>,
    /// When the underlying record was last written, RFC 3339
    pub updated_at: Option<String>,
}

/// One child's events and derived totals for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSummaryDto {
    pub child_id: String,
    pub events: Vec<EventDto>,
    pub totals: DailyTotalsDto,
}

/// A single normalized event in API form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDto {
    /// Event kind tag: `bottle`, `diaper`, `nap`, `fluids`, `meal`, `attendance`
    pub kind: String,
    /// Wall-clock event time, `HH:MM`
    pub time: String,
    /// Human-readable one-line description
    pub description: String,
    /// Stable dedup identity of the event
    pub fingerprint: String,
}

/// Aggregates derived from a day's event sequence.
///
/// Always recomputed from the events server-side; clients must not treat
/// them as independently updatable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotalsDto {
    /// Bottle consumed + fluid ounces
    pub total_ounces: f64,
    pub bottle_ounces: f64,
    pub fluid_ounces: f64,
    pub wet_diapers: u32,
    pub bm_diapers: u32,
    pub nap_minutes: i64,
    pub meal_count: u32,
    /// `HH:MM` of the first check-in, if any
    pub first_check_in: Option<String>,
    /// `HH:MM` of the last check-out, if any
    pub last_check_out: Option<String>,
}

/// Dates that have stored data, newest first. `GET /api/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub dates: Vec<NaiveDate>,
    pub count: usize,
}

/// Recent scrape passes, newest first. `GET /api/scrape-log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeLogResponse {
    pub history: Vec<ScrapeLogEntryDto>,
}

/// Acknowledgement for a manually triggered pass. `POST /api/scrape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerScrapeResponse {
    pub message: String,
    pub notify: bool,
}
