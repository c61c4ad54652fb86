//! Boundary error responses. Bodies carry a short `detail` string.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "predict failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal error: {msg}"),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
