//! Threshold Routes

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{ApiError, AppState};
use threshold_cache::Thresholds;

/// Get the current cached triple
pub async fn current(State(state): State<Arc<AppState>>) -> Result<Json<Thresholds>, ApiError> {
    Ok(Json(state.thresholds.get().await?))
}

/// Partial threshold update; absent fields keep their current values
#[derive(Debug, Deserialize)]
pub struct ThresholdUpdate {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub water_level: Option<f64>,
}

/// Write new thresholds through the cache
pub async fn update(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ThresholdUpdate>,
) -> Result<Json<Value>, ApiError> {
    let current = state.thresholds.get().await?;
    let committed = state
        .thresholds
        .update(
            &state.store,
            body.temperature.unwrap_or(current.temperature),
            body.humidity.unwrap_or(current.humidity),
            body.water_level.unwrap_or(current.water_level),
        )
        .await?;

    Ok(Json(json!({ "status": "success", "thresholds": committed })))
}
