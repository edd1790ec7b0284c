use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reel_datastore::{Job, JobFailure, Stage};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::worker::JobService;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub repository_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub session_id: String,
}

/// Poll payload returned for a job
#[derive(Debug, Serialize)]
pub struct JobStatus {
    pub session_id: String,
    pub repository_url: String,
    pub stage: Stage,
    pub progress_percent: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub cancel_requested: bool,
}

impl From<Job> for JobStatus {
    fn from(job: Job) -> Self {
        JobStatus {
            session_id: job.session_id,
            repository_url: job.repository_url,
            stage: job.stage,
            progress_percent: job.progress,
            message: job.message,
            error: job.failure,
            output_path: job.output_path,
            cancel_requested: job.cancel_requested,
        }
    }
}

pub enum ApiError {
    Invalid(String),
    NotFound,
    NotReady(Stage),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Invalid(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Unknown session".to_string()),
            ApiError::NotReady(stage) => (
                StatusCode::CONFLICT,
                format!("Video is not available, job is {stage}"),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read video".to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn create_router<T: JobService>(service: Arc<T>) -> Router {
    Router::new()
        .route("/api/jobs", post(submit::<T>))
        .route("/api/jobs/:id", get(poll::<T>))
        .route("/api/jobs/:id/cancel", post(cancel::<T>))
        .route("/api/jobs/:id/video", get(video::<T>))
        .with_state(service)
        .layer(CorsLayer::permissive())
}

/// Serves `router` until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    tracing::info!(addr = ?listener.local_addr().ok(), "HTTP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn submit<T: JobService>(
    State(service): State<Arc<T>>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let job = service
        .submit(&request.repository_url)
        .map_err(|e| ApiError::Invalid(e.to_string()))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            session_id: job.session_id,
        }),
    ))
}

async fn poll<T: JobService>(
    State(service): State<Arc<T>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    service
        .poll(&id)
        .map(|job| Json(job.into()))
        .ok_or(ApiError::NotFound)
}

async fn cancel<T: JobService>(
    State(service): State<Arc<T>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobStatus>), ApiError> {
    let job = service.cancel(&id).ok_or(ApiError::NotFound)?;
    tracing::info!(session_id = %id, stage = %job.stage, "Cancellation requested");
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

async fn video<T: JobService>(
    State(service): State<Arc<T>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let job = service.poll(&id).ok_or(ApiError::NotFound)?;
    let path = match (job.stage, job.output_path) {
        (Stage::Complete, Some(path)) => path,
        (stage, _) => return Err(ApiError::NotReady(stage)),
    };

    let bytes = tokio::fs::read(&path)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, path = ?path, "Failed to read video"))
        .map_err(|_| ApiError::Internal)?;

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{id}.mp4\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
