//! REST surface over the engine's stored state.
//!
//! Thin layer: handlers read storage (or trigger a pass) and map domain
//! types to the `shared` DTOs. No business logic lives here.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::error;

use shared::{
    ChildSummaryDto, DailyTotalsDto, EventDto, HistoryResponse, ScrapeLogEntryDto,
    ScrapeLogResponse, StatusResponse, SummaryResponse, TriggerScrapeResponse,
};

use crate::domain::models::{DailyRecord, ScrapeLogEntry};
use crate::domain::ScrapeService;
use crate::storage::{DailyRecordStorage, ScrapeLogStorage, StorageError};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScrapeService>,
    pub records: Arc<dyn DailyRecordStorage>,
    pub log: Arc<dyn ScrapeLogStorage>,
    pub ai_parsing_enabled: bool,
    pub scrape_interval_minutes: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/summary/today", get(summary_today))
        .route("/api/summary/:date", get(summary_for_date))
        .route("/api/history", get(history))
        .route("/api/scrape-log", get(scrape_log))
        .route("/api/scrape", post(trigger_scrape))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

enum ApiError {
    Storage(StorageError),
    BadDate(String),
    Busy,
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Storage(err) => {
                error!(%err, "storage failure while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage failure".to_string(),
                )
            }
            ApiError::BadDate(raw) => (
                StatusCode::BAD_REQUEST,
                format!("'{raw}' is not a YYYY-MM-DD date"),
            ),
            ApiError::Busy => (
                StatusCode::CONFLICT,
                "a scrape pass is already in flight".to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn log_entry_dto(entry: ScrapeLogEntry) -> ScrapeLogEntryDto {
    ScrapeLogEntryDto {
        timestamp: entry.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
        success: entry.success,
        message: entry.message,
        events_count: entry.events_count,
    }
}

fn child_summary_dto(record: DailyRecord) -> ChildSummaryDto {
    let events = record
        .events
        .iter()
        .map(|event| EventDto {
            kind: event.kind().as_str().to_string(),
            time: event.timestamp.format("%H:%M").to_string(),
            description: event.describe(),
            fingerprint: event.fingerprint(),
        })
        .collect();
    let totals = &record.totals;
    ChildSummaryDto {
        child_id: record.child_id.clone(),
        events,
        totals: DailyTotalsDto {
            total_ounces: totals.total_ounces,
            bottle_ounces: totals.bottle_ounces,
            fluid_ounces: totals.fluid_ounces,
            wet_diapers: totals.wet_diapers,
            bm_diapers: totals.bm_diapers,
            nap_minutes: totals.nap_minutes,
            meal_count: totals.meal_count,
            first_check_in: totals
                .first_check_in
                .map(|t| t.format("%H:%M").to_string()),
            last_check_out: totals
                .last_check_out
                .map(|t| t.format("%H:%M").to_string()),
        },
    }
}

async fn build_summary(state: &AppState, date: NaiveDate) -> Result<SummaryResponse, ApiError> {
    let records = state.records.load_all_for_date(date).await?;
    let updated_at = state
        .log
        .last_pass()
        .await?
        .map(|entry| entry.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string());
    Ok(SummaryResponse {
        date,
        children: records.into_iter().map(child_summary_dto).collect(),
        updated_at,
    })
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let last = state.log.last_pass().await?;
    let next_scheduled = last.as_ref().map(|entry| {
        (entry.timestamp + Duration::minutes(state.scrape_interval_minutes as i64))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string()
    });
    Ok(Json(StatusResponse {
        status: "running".to_string(),
        last_scrape: last.map(log_entry_dto),
        next_scheduled,
        ai_parsing_enabled: state.ai_parsing_enabled,
        scrape_interval_minutes: state.scrape_interval_minutes,
    }))
}

async fn summary_today(
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let today = chrono::Local::now().date_naive();
    Ok(Json(build_summary(&state, today).await?))
}

async fn summary_for_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| ApiError::BadDate(date.clone()))?;
    Ok(Json(build_summary(&state, date).await?))
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let dates = state
        .records
        .list_dates(query.limit.unwrap_or(30))
        .await?;
    Ok(Json(HistoryResponse {
        count: dates.len(),
        dates,
    }))
}

async fn scrape_log(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ScrapeLogResponse>, ApiError> {
    let entries = state.log.history(query.limit.unwrap_or(20)).await?;
    Ok(Json(ScrapeLogResponse {
        history: entries.into_iter().map(log_entry_dto).collect(),
    }))
}

#[derive(Debug, Deserialize)]
struct TriggerQuery {
    notify: Option<bool>,
}

async fn trigger_scrape(
    State(state): State<AppState>,
    Query(query): Query<TriggerQuery>,
) -> Result<Json<TriggerScrapeResponse>, ApiError> {
    // Manual passes notify by default; `?notify=false` opts out
    let notify = query.notify.unwrap_or(true);
    let today = chrono::Local::now().date_naive();
    let result = state
        .service
        .try_run_pass(today, notify)
        .await
        .map_err(|_| ApiError::Busy)?;

    let message = if result.success {
        format!(
            "scrape completed: {} events, {} changed",
            result.total_events(),
            result.changed_events()
        )
    } else {
        format!(
            "scrape failed: {}",
            result.message.as_deref().unwrap_or("unknown error")
        )
    };
    Ok(Json(TriggerScrapeResponse { message, notify }))
}
