//! Route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use wishline_core::types::{ReminderLog, RunSummary};

use super::server::AppState;

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error": message })),
    )
}

fn internal(e: wishline_core::error::WishlineError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "ok": false, "error": e.to_string() })),
    )
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now().to_rfc3339() }))
}

/// POST /api/reminders/run, the external trigger. Runs one dispatch pass
/// and returns the summary; the run itself never fails.
pub async fn run_reminders(State(state): State<Arc<AppState>>) -> Json<RunSummary> {
    let summary = state.scheduler.run().await;
    Json(summary)
}

/// GET /api/reminders/logs/{date}
pub async fn logs_for_date(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> std::result::Result<Json<Vec<ReminderLog>>, ApiError> {
    let date = parse_date(&date).ok_or_else(|| bad_request("invalid date, want YYYY-MM-DD"))?;
    state.store.logs_for_date(date).map(Json).map_err(internal)
}

#[derive(Deserialize)]
pub struct LogsQuery {
    pub days: Option<i64>,
}

/// GET /api/reminders/logs?days=N
pub async fn recent_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> std::result::Result<Json<Vec<ReminderLog>>, ApiError> {
    let days = query.days.unwrap_or(7).clamp(1, 90);
    state
        .store
        .recent_logs(days, Utc::now().date_naive())
        .map(Json)
        .map_err(internal)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
