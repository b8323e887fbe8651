//! Stats Route

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{ApiError, AppState};
use query_engine::StatsSummary;

/// Stats over the fixed 24-hour window, or an explicit no-data marker
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StatsResponse {
    Summary(StatsSummary),
    NoData { message: String },
}

/// Get the windowed statistical summary
pub async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let response = match state.query.stats().await? {
        Some(summary) => StatsResponse::Summary(summary),
        None => StatsResponse::NoData {
            message: "No data available".to_string(),
        },
    };
    Ok(Json(response))
}
