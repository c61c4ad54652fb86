//! HTTP boundary: `POST /predict`, `GET /api/health`, `GET /`.

mod error;

pub use error::ApiError;

use crate::features::FeatureVersion;
use crate::pipeline::{InferencePipeline, Label, PipelineStatus};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InferencePipeline>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<InferencePipeline>) -> Self {
        Self {
            pipeline,
            started_at: chrono::Utc::now(),
        }
    }
}

/// `model_version` reported while no model is loaded
pub const NO_MODEL_VERSION: &str = "none";

/// Body of a successful `POST /predict`. The server always fills
/// `model_version`; clients accept its absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub label: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub pipeline: PipelineStatus,
    pub version: &'static str,
    pub started_at: String,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Malware Scanner API" }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        pipeline: state.pipeline.status(),
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at.to_rfc3339(),
    })
}

async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            upload = Some((name, bytes));
            break;
        }
    }
    // No `file` field reads the same as an empty one.
    let (file_name, bytes) = match upload {
        Some((name, bytes)) if !bytes.is_empty() => (name, bytes),
        _ => return Err(ApiError::BadRequest("Empty file".to_string())),
    };

    let request_id = Uuid::new_v4();
    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    let size = bytes.len();
    let started = Instant::now();

    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.classify(&bytes))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(
        request_id = %request_id,
        file = file_name.as_deref().unwrap_or("-"),
        sha256 = %sha256,
        size,
        label = %result.label,
        confidence = result.confidence,
        latency_ms = started.elapsed().as_millis() as u64,
        "predict"
    );

    let model_version = match result.label {
        Label::ModelNotLoaded => None,
        _ => state.pipeline.status().model_version,
    };
    Ok(Json(PredictionResponse {
        label: result.label.as_str().to_string(),
        confidence: result.confidence,
        model_version: Some(
            model_version
                .map(FeatureVersion::as_str)
                .unwrap_or(NO_MODEL_VERSION)
                .to_string(),
        ),
    }))
}
