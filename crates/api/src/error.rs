//! Boundary Error Mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use storage::StorageError;

/// Translates core error kinds into HTTP responses.
///
/// The single place where kinds become status codes; handlers propagate
/// errors unchanged via `?`.
#[derive(Debug)]
pub struct ApiError(pub StorageError);

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            StorageError::Validation(_) => StatusCode::BAD_REQUEST,
            StorageError::Unavailable(_)
            | StorageError::Write(_)
            | StorageError::Read(_)
            | StorageError::NotFound => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
