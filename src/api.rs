//! HTTP API handlers for Searchlight.
//!
//! All report routes are scoped under a client and authenticated with the
//! client's API key in the `X-Api-Key` header. The boundary reports four
//! distinct failure categories to callers, never collapsed into one:
//!
//! - `401 unauthorized` - missing or wrong API key
//! - `404 not_found` - no such report / no insights generated yet
//! - `400 invalid_argument` - malformed report id or sample batch
//! - `500 internal` - storage or serialization failure

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::aggregation::{AggregationError, PriorPeriods, aggregate};
use crate::insights::{INSIGHTS_VERSION, generate_insights};
use crate::model::{ComparisonKind, DailySample, ParseReportIdError, ReportId, StoredInsights};
use crate::storage::{ReportRecord, Storage};

/// Header carrying the client's API key.
const API_KEY_HEADER: &str = "x-api-key";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
}

/// Boundary-level error, mapped to a distinct HTTP status per category.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid API key")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidArgument(_) => "invalid_argument",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            warn!(error = %e, "Internal error handling request");
        }

        let body = Json(json!({
            "error": self.category(),
            "message": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<AggregationError> for ApiError {
    fn from(err: AggregationError) -> Self {
        ApiError::InvalidArgument(err.to_string())
    }
}

impl From<ParseReportIdError> for ApiError {
    fn from(err: ParseReportIdError) -> Self {
        ApiError::InvalidArgument(err.to_string())
    }
}

/// Request body for POST /clients/{client_id}/reports.
#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    /// Report month as `"YYYY-MM"`.
    pub report_id: String,

    /// Daily samples for the report window, in date order.
    pub samples: Vec<DailySample>,
}

/// Response for the report archive listing.
#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub client_id: String,
    pub reports: Vec<ReportRecord>,
}

/// Check the caller's API key against the client's registered key.
async fn authorize(state: &AppState, headers: &HeaderMap, client_id: &str) -> Result<(), ApiError> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    if state.storage.verify_client(client_id, api_key).await? {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// POST /clients/{client_id}/reports - Submit a month of daily samples.
///
/// Aggregates the window into a summary, computing MoM/YoY deltas against
/// whichever prior-period summaries are already stored, persists it, and
/// returns it. Resubmitting the same month replaces the stored summary.
#[instrument(skip(state, headers, request), fields(client_id = %client_id))]
pub async fn submit_report(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SubmitReportRequest>,
) -> Result<Json<ReportRecord>, ApiError> {
    authorize(&state, &headers, &client_id).await?;

    let report_id: ReportId = request.report_id.parse()?;

    let mom_prior = state
        .storage
        .get_summary(&client_id, report_id.prior(ComparisonKind::MonthOverMonth))
        .await?;
    let yoy_prior = state
        .storage
        .get_summary(&client_id, report_id.prior(ComparisonKind::YearOverYear))
        .await?;

    let summary = aggregate(
        &request.samples,
        PriorPeriods {
            month_over_month: mom_prior.as_ref(),
            year_over_year: yoy_prior.as_ref(),
        },
    )?;

    state
        .storage
        .upsert_summary(&client_id, report_id, &summary)
        .await?;

    info!(
        report_id = %report_id,
        total_clicks = summary.total_clicks,
        total_impressions = summary.total_impressions,
        "Report summary stored"
    );

    Ok(Json(ReportRecord { report_id, summary }))
}

/// GET /clients/{client_id}/reports - List stored reports, newest first.
#[instrument(skip(state, headers), fields(client_id = %client_id))]
pub async fn list_reports(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ReportListResponse>, ApiError> {
    authorize(&state, &headers, &client_id).await?;

    let reports = state.storage.list_summaries(&client_id).await?;

    info!(report_count = reports.len(), "Report archive queried");

    Ok(Json(ReportListResponse { client_id, reports }))
}

/// GET /clients/{client_id}/reports/{report_id} - Fetch one stored summary.
#[instrument(skip(state, headers), fields(client_id = %client_id, report_id = %report_id))]
pub async fn get_report(
    State(state): State<AppState>,
    Path((client_id, report_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<ReportRecord>, ApiError> {
    authorize(&state, &headers, &client_id).await?;

    let report_id: ReportId = report_id.parse()?;

    let summary = state
        .storage
        .get_summary(&client_id, report_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no report stored for {report_id}")))?;

    Ok(Json(ReportRecord { report_id, summary }))
}

/// POST /clients/{client_id}/reports/{report_id}/insights - Generate a bundle.
///
/// Loads the stored summary, runs the rule engine, and appends the bundle
/// with a server-assigned timestamp and the current format version. The
/// rule engine is deterministic, so regenerating without new data yields
/// the same conclusions under a newer timestamp.
#[instrument(skip(state, headers), fields(client_id = %client_id, report_id = %report_id))]
pub async fn generate_report_insights(
    State(state): State<AppState>,
    Path((client_id, report_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<StoredInsights>, ApiError> {
    authorize(&state, &headers, &client_id).await?;

    let report_id: ReportId = report_id.parse()?;

    let summary = state
        .storage
        .get_summary(&client_id, report_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no report stored for {report_id}")))?;

    let bundle = generate_insights(&summary);
    let generated_at: DateTime<Utc> = Utc::now();

    state
        .storage
        .insert_insights(&client_id, report_id, INSIGHTS_VERSION, generated_at, &bundle)
        .await?;

    info!(
        insight_count = bundle.key_insights.len(),
        version = INSIGHTS_VERSION,
        "Insights generated"
    );

    Ok(Json(StoredInsights {
        client_id,
        report_id,
        version: INSIGHTS_VERSION.to_string(),
        generated_at,
        insights: bundle,
    }))
}

/// GET /clients/{client_id}/reports/{report_id}/insights - Latest bundle.
#[instrument(skip(state, headers), fields(client_id = %client_id, report_id = %report_id))]
pub async fn get_report_insights(
    State(state): State<AppState>,
    Path((client_id, report_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<StoredInsights>, ApiError> {
    authorize(&state, &headers, &client_id).await?;

    let report_id: ReportId = report_id.parse()?;

    let stored = state
        .storage
        .latest_insights(&client_id, report_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no insights generated yet for {report_id}"))
        })?;

    Ok(Json(stored))
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Searchlight reports API is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
