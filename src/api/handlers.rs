//! REST API endpoint handlers

use super::types::{AggregateQuery, ApiError, StatusBody};
use crate::db::sqlite::models::Aggregate;
use crate::services::{AggregateService, DateWindow};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub aggregates: Arc<dyn AggregateService>,
}

impl ApiState {
    pub fn new(aggregates: Arc<dyn AggregateService>) -> Self {
        Self { aggregates }
    }
}

// ============================================================================
// Health
// ============================================================================

/// Liveness - GET /healthz
pub async fn healthz() -> impl IntoResponse {
    Json(StatusBody::new("ok"))
}

/// Readiness - GET /readyz
pub async fn readyz(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match state.aggregates.ready().await {
        Ok(()) => (StatusCode::OK, Json(StatusBody::new("ready"))),
        Err(e) => {
            warn!("readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(StatusBody::new("degraded")))
        }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Ticker extremes - GET /api/v1/aggregate
pub async fn aggregate(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<AggregateQuery>, QueryRejection>,
) -> Result<Json<Aggregate>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::bad_request("invalid query string", Some(e.body_text())))?;

    let ticker = query
        .ticker
        .as_deref()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("ticker is required", None))?;

    let start = parse_date_param("start_date", query.start_date.as_deref())?;
    let end = parse_date_param("end_date", query.end_date.as_deref())?;
    let window = DateWindow::current(start, end)?;

    info!("aggregate request: {} {:?}", ticker, window);

    match state.aggregates.aggregate(&ticker, window).await? {
        Some(agg) => Ok(Json(agg)),
        None => Err(ApiError::not_found(format!("no data found for ticker {}", ticker))),
    }
}

fn parse_date_param(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d").map(Some).map_err(|e| {
            ApiError::bad_request(
                format!("invalid {}, expected YYYY-MM-DD", name),
                Some(e.to_string()),
            )
        }),
    }
}
