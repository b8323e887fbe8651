//! Reading Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{ApiError, AppState};
use ingest::ReadingSubmission;
use storage::Reading;

/// Receive one reading pushed by a device
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<ReadingSubmission>,
) -> Result<Json<Value>, ApiError> {
    state.ingest.submit(submission).await?;
    Ok(Json(json!({ "status": "success" })))
}

/// Query parameters for the latest-data endpoint
#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    /// Maximum number of records to return (default 20)
    pub limit: Option<i64>,
}

/// Get the latest readings across all devices
pub async fn latest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestQuery>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let data = state.query.latest(params.limit).await?;
    Ok(Json(data))
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to a single device
    pub device_id: Option<String>,
    /// Maximum number of records to return (default 100)
    pub limit: Option<i64>,
}

/// Get historical readings with optional device filtering
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let data = state
        .query
        .history(params.device_id.as_deref(), params.limit)
        .await?;
    Ok(Json(data))
}
