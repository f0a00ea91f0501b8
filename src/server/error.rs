use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use color_eyre::Report;
use serde_json::json;
use tracing::error;

/// Errors surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
  BadRequest(String),
  NotFound(String),
  /// Logged in full, answered with a generic message
  Internal(Report),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
      ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
      ApiError::Internal(report) => {
        error!(error = ?report, "Request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "Internal server error".to_string(),
        )
      }
    };

    (status, Json(json!({ "error": message }))).into_response()
  }
}
