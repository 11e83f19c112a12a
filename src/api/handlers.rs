use crate::api::responses::{
    ErrorCode, ErrorResponse, HealthStatus, HealthSuccessResponse, LaneResponse,
    LanesSuccessResponse, MonitorResponse, MonitorsSuccessResponse, RankingEntryResponse,
    RankingsSuccessResponse, TickStatusResponse,
};
use crate::history::AttractionId;
use crate::lightning::LaneSnapshot;
use crate::ranking::{DEFAULT_RANKING_LIMIT, rank};
use crate::state::{AppState, MonitorSnapshot, TickStatus};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

pub enum ApiResponse<T> {
    Success { status: StatusCode, body: T },
    Error { status: StatusCode, body: ErrorResponse },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success { status, body } => (status, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    pub limit: Option<usize>,
}

pub async fn get_health(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    build_health_response(state, SystemTime::now())
}

pub async fn get_monitors(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    build_monitors_response(state, SystemTime::now())
}

pub async fn get_monitor(
    State(state): State<Arc<RwLock<AppState>>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    build_monitor_response(state, &name, SystemTime::now())
}

pub async fn get_lanes(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    build_lanes_response(state, SystemTime::now())
}

pub async fn get_rankings(
    State(state): State<Arc<RwLock<AppState>>>,
    Query(query): Query<RankingsQuery>,
) -> impl IntoResponse {
    build_rankings_response(state, query.limit, SystemTime::now())
}

fn build_health_response(
    state: Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<HealthSuccessResponse> {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => return internal_error("/api/health", "state lock poisoned while reading monitors"),
    };
    let monitors = guard.snapshots().count();
    // A category is only ever set by a successful classification.
    let classified = guard
        .snapshots()
        .filter(|snapshot| snapshot.category.is_some())
        .count();
    drop(guard);

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/health", "timestamp formatting failure"),
    };

    let status = derive_health_status(monitors, classified);
    let status_code = match status {
        HealthStatus::Ko => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
    };

    ApiResponse::Success {
        status: status_code,
        body: HealthSuccessResponse {
            status,
            monitors,
            classified,
            timestamp,
        },
    }
}

fn derive_health_status(monitors: usize, classified: usize) -> HealthStatus {
    match (monitors, classified) {
        (0, _) | (_, 0) => HealthStatus::Ko,
        (total, ok) if ok == total => HealthStatus::Ok,
        _ => HealthStatus::Degraded,
    }
}

fn build_monitors_response(
    state: Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<MonitorsSuccessResponse> {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error("/api/monitors", "state lock poisoned while reading monitors");
        }
    };
    let snapshots: Vec<MonitorSnapshot> = guard.snapshots().cloned().collect();
    let scheduler_mode = guard.scheduler_mode().map(str::to_string);
    drop(guard);

    let mut monitors = Vec::with_capacity(snapshots.len());
    for snapshot in &snapshots {
        match map_snapshot(snapshot) {
            Ok(mapped) => monitors.push(mapped),
            Err(_) => return internal_error("/api/monitors", "timestamp formatting failure"),
        }
    }

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/monitors", "timestamp formatting failure"),
    };

    ApiResponse::Success {
        status: StatusCode::OK,
        body: MonitorsSuccessResponse {
            scheduler_mode,
            monitors,
            timestamp,
        },
    }
}

fn build_monitor_response(
    state: Arc<RwLock<AppState>>,
    name: &str,
    now: SystemTime,
) -> ApiResponse<MonitorResponse> {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error("/api/monitors/{name}", "state lock poisoned while reading monitor");
        }
    };
    let snapshot = guard.snapshot(&AttractionId::from(name)).cloned();
    drop(guard);

    match snapshot {
        Some(snapshot) => match map_snapshot(&snapshot) {
            Ok(body) => ApiResponse::Success {
                status: StatusCode::OK,
                body,
            },
            Err(_) => internal_error("/api/monitors/{name}", "timestamp formatting failure"),
        },
        None => match format_timestamp(now) {
            Ok(timestamp) => ApiResponse::Error {
                status: StatusCode::NOT_FOUND,
                body: ErrorResponse {
                    error_code: ErrorCode::UnknownAttraction,
                    error_message: format!("Unknown attraction: {name}"),
                    timestamp,
                },
            },
            Err(_) => internal_error("/api/monitors/{name}", "timestamp formatting failure"),
        },
    }
}

fn build_rankings_response(
    state: Arc<RwLock<AppState>>,
    limit: Option<usize>,
    now: SystemTime,
) -> ApiResponse<RankingsSuccessResponse> {
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/rankings", "timestamp formatting failure"),
    };

    let limit = limit.unwrap_or(DEFAULT_RANKING_LIMIT);
    if limit == 0 {
        return ApiResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error_code: ErrorCode::InvalidLimit,
                error_message: "limit must be at least 1".to_string(),
                timestamp,
            },
        };
    }

    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error("/api/rankings", "state lock poisoned while reading monitors");
        }
    };
    let ranked = rank(guard.snapshots(), limit);
    drop(guard);

    let rankings = ranked
        .into_iter()
        .enumerate()
        .map(|(index, entry)| RankingEntryResponse {
            rank: index + 1,
            attraction: entry.attraction_id.to_string(),
            prediction_minutes: entry.prediction_minutes,
            actual_minutes: entry.actual_minutes,
            value: entry.value,
        })
        .collect();

    ApiResponse::Success {
        status: StatusCode::OK,
        body: RankingsSuccessResponse {
            rankings,
            timestamp,
        },
    }
}

fn build_lanes_response(
    state: Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<LanesSuccessResponse> {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error("/api/lightning-lanes", "state lock poisoned while reading lanes");
        }
    };
    let snapshots: Vec<LaneSnapshot> = guard.lanes().cloned().collect();
    drop(guard);

    let mut lanes = Vec::with_capacity(snapshots.len());
    for snapshot in &snapshots {
        match map_lane(snapshot) {
            Ok(mapped) => lanes.push(mapped),
            Err(_) => return internal_error("/api/lightning-lanes", "timestamp formatting failure"),
        }
    }

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success {
            status: StatusCode::OK,
            body: LanesSuccessResponse { lanes, timestamp },
        },
        Err(_) => internal_error("/api/lightning-lanes", "timestamp formatting failure"),
    }
}

fn map_lane(snapshot: &LaneSnapshot) -> Result<LaneResponse, TimestampError> {
    let last_tick = snapshot.last_tick.map(format_timestamp).transpose()?;
    Ok(LaneResponse {
        attraction: snapshot.attraction_id.to_string(),
        status: snapshot.status.as_ref().map(ToString::to_string),
        minutes_until: snapshot.minutes_until,
        in_window: snapshot.in_window,
        notifications_sent: snapshot.notifications_sent,
        last_tick,
    })
}

fn map_snapshot(snapshot: &MonitorSnapshot) -> Result<MonitorResponse, TimestampError> {
    let last_tick = snapshot.last_tick.map(format_timestamp).transpose()?;
    Ok(MonitorResponse {
        attraction: snapshot.attraction_id.to_string(),
        category: snapshot.category,
        prediction_minutes: snapshot.prediction_minutes,
        actual_minutes: snapshot.actual_minutes,
        status: map_tick_status(snapshot.status),
        notifications_sent: snapshot.notifications_sent,
        last_tick,
    })
}

fn map_tick_status(status: TickStatus) -> TickStatusResponse {
    match status {
        TickStatus::Pending => TickStatusResponse::Pending,
        TickStatus::Classified => TickStatusResponse::Classified,
        TickStatus::NoHistory => TickStatusResponse::NoHistory,
        TickStatus::NoReading => TickStatusResponse::NoReading,
        TickStatus::SourceError => TickStatusResponse::SourceError,
    }
}

fn internal_error<T>(route: &str, message: &str) -> ApiResponse<T> {
    error!(route = route, message = message, "Internal error while handling request");
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}
