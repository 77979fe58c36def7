//! REST API endpoints for the fogger-service.
//!
//! # Concurrency
//!
//! - Motor commands go through the [`ControlHandle`](fogger_core::ControlHandle)
//!   and are serialized with sensor ticks by the scheduler task.
//! - Event queries lock `state.events.store()` (Mutex) briefly; the same lock
//!   serializes the controller's writes.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. A motor
//! command whose event could not be saved returns 503 and still carries the
//! applied transition, because the motor did change state. Any other event
//! log failure is also a 503.
//!
//! # Example
//!
//! ```ignore
//! use fogger_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use fogger_core::{ControlError, EventLog, SchedulerError, StorageError, ToggleRequest, Transition};
use fogger_store::{EventQuery, MAX_QUERY_LIMIT};
use fogger_types::{ControlSnapshot, MotorStatus, StoredEvent};

use crate::state::AppState;

/// Default page size for `GET /api/events`.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Health and status
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
        // Motor control
        .route("/api/motor/on", post(motor_on))
        .route("/api/motor/off", post(motor_off))
        .route("/api/motor/toggle", post(motor_toggle))
        // Event log
        .route("/api/events", get(list_events).delete(clear_events))
        .route("/api/events/count", get(count_events))
        .route("/api/events/export", get(export_events))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Controller status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Latest published snapshot.
    #[serde(flatten)]
    pub snapshot: ControlSnapshot,
    /// Whether the motor is running.
    pub motor_running: bool,
    /// Configured hot threshold.
    pub threshold: f64,
    /// Seconds since startup.
    pub uptime_secs: i64,
}

/// Current controller state.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let threshold = state.config.read().await.control.threshold;
    let snapshot = state.control.snapshot();
    Json(StatusResponse {
        motor_running: snapshot.motor_running(),
        snapshot,
        threshold,
        uptime_secs: state.uptime_secs(),
    })
}

async fn motor_on(State(state): State<Arc<AppState>>) -> Result<Json<Transition>, AppError> {
    toggle(&state, ToggleRequest::On).await
}

async fn motor_off(State(state): State<Arc<AppState>>) -> Result<Json<Transition>, AppError> {
    toggle(&state, ToggleRequest::Off).await
}

async fn motor_toggle(State(state): State<Arc<AppState>>) -> Result<Json<Transition>, AppError> {
    toggle(&state, ToggleRequest::Flip).await
}

/// Send a manual override to the controller.
///
/// # Errors
///
/// - [`AppError::Conflict`] if the motor is already in the requested state
/// - [`AppError::StorageUnavailable`] if the change applied but was not logged
/// - [`AppError::Unavailable`] if the controller has shut down
async fn toggle(state: &AppState, request: ToggleRequest) -> Result<Json<Transition>, AppError> {
    let transition = state.control.toggle(request).await?;
    info!(
        "Operator {}: {} -> {}",
        request, transition.from, transition.to
    );
    Ok(Json(transition))
}

/// Query parameters for events.
#[derive(Debug, Deserialize, Default)]
pub struct EventsQuery {
    /// `ON` or `OFF`.
    pub status: Option<String>,
    /// Unix timestamp, inclusive.
    pub since: Option<i64>,
    /// Unix timestamp, inclusive.
    pub until: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EventsQuery {
    /// Validate the parameters and build a store query.
    ///
    /// The limit is requested one higher than asked so the caller can tell
    /// whether more rows exist.
    pub fn to_event_query(&self) -> Result<EventQuery, AppError> {
        if let (Some(since), Some(until)) = (self.since, self.until)
            && since > until
        {
            return Err(AppError::BadRequest(format!(
                "Invalid time range: 'since' ({}) must be less than or equal to 'until' ({})",
                since, until
            )));
        }

        let mut query = EventQuery::new().limit(self.page_size() + 1);

        if let Some(status) = &self.status {
            let status: MotorStatus = status
                .parse()
                .map_err(|e| AppError::BadRequest(format!("{}", e)))?;
            query = query.status(status);
        }
        if let Some(since) = self.since {
            query = query.since(timestamp("since", since)?);
        }
        if let Some(until) = self.until {
            query = query.until(timestamp("until", until)?);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }

        Ok(query)
    }

    fn page_size(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_QUERY_LIMIT - 1)
    }
}

fn timestamp(field: &str, value: i64) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::from_unix_timestamp(value)
        .map_err(|e| AppError::BadRequest(format!("Invalid '{}' timestamp {}: {}", field, value, e)))
}

/// Paginated response wrapper with metadata.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The data items.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Number of items returned.
    pub count: usize,
    /// Offset from the beginning.
    pub offset: u32,
    /// Page size applied.
    pub limit: u32,
    /// Whether there are more items available.
    pub has_more: bool,
}

/// List events, newest first.
///
/// # Query Parameters
///
/// - `status`: `ON` or `OFF`
/// - `since`, `until`: Unix timestamps (inclusive)
/// - `limit`: page size (default 100)
/// - `offset`: rows to skip
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<PaginatedResponse<StoredEvent>>, AppError> {
    let query = params.to_event_query()?;
    let page_size = params.page_size();

    let mut events = {
        let store = state.events.store().lock().await;
        store.query_events(&query)?
    };

    let has_more = events.len() > page_size as usize;
    if has_more {
        events.pop();
    }

    Ok(Json(PaginatedResponse {
        pagination: PaginationMeta {
            count: events.len(),
            offset: params.offset.unwrap_or(0),
            limit: page_size,
            has_more,
        },
        data: events,
    }))
}

/// Event counts.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
    pub on: u64,
    pub off: u64,
}

async fn count_events(State(state): State<Arc<AppState>>) -> Result<Json<CountResponse>, AppError> {
    let store = state.events.store().lock().await;
    Ok(Json(CountResponse {
        count: store.count_events()?,
        on: store.count_events_by_status(MotorStatus::On)?,
        off: store.count_events_by_status(MotorStatus::Off)?,
    }))
}

/// Result of clearing the log.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub deleted: u64,
}

/// Delete every event. Irreversible.
async fn clear_events(State(state): State<Arc<AppState>>) -> Result<Json<ClearResponse>, AppError> {
    let deleted = state.events.clear().await?;
    info!("Event log cleared via API ({} deleted)", deleted);
    Ok(Json(ClearResponse { deleted }))
}

/// Export events as CSV, oldest first.
///
/// Accepts the same filters as `GET /api/events` except paging.
async fn export_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut query = params.to_event_query()?.oldest_first();
    query.limit = None;
    query.offset = None;

    let mut body = Vec::new();
    {
        let store = state.events.store().lock().await;
        store.export_csv(&mut body, &query)?;
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"fogger-events.csv\"",
            ),
        ],
        body,
    ))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Conflict(String),
    /// The motor changed state but the event was not logged.
    StorageUnavailable {
        message: String,
        transition: Box<Transition>,
    },
    /// The controller or the event log cannot be reached.
    Unavailable(String),
    Internal(String),
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Unavailable(e.to_string())
    }
}

impl From<fogger_store::Error> for AppError {
    fn from(e: fogger_store::Error) -> Self {
        StorageError::unavailable(e).into()
    }
}

impl From<SchedulerError> for AppError {
    fn from(e: SchedulerError) -> Self {
        let message = e.to_string();
        match e {
            SchedulerError::Closed => AppError::Unavailable(message),
            SchedulerError::Control(ControlError::InvalidToggle { .. }) => {
                AppError::Conflict(message)
            }
            SchedulerError::Control(ControlError::StorageUnavailable { transition, .. }) => {
                AppError::StorageUnavailable {
                    message,
                    transition,
                }
            }
            SchedulerError::Control(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, error_body(msg)),
            AppError::StorageUnavailable {
                message,
                transition,
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "error": message,
                    "transition": transition,
                }),
            ),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, error_body(msg)),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(msg)),
        };

        (status, Json(body)).into_response()
    }
}

fn error_body(message: String) -> serde_json::Value {
    serde_json::json!({
        "error": message,
    })
}
