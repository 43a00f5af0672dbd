//! REST route handlers (§6). Each handler is a thin adapter over the
//! `WorkerPool`/`JobStore`; no business logic lives here.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::api::models::{
    ApiError, CancelJobResponse, HealthResponse, ListJobsQuery, ListJobsResponse,
    SubmitJobRequest, SubmitJobResponse,
};
use crate::job::JobId;
use crate::observability::metrics::Metrics;
use crate::runner::WorkerPool;

pub struct AppState {
    pub pool: Arc<WorkerPool>,
    pub metrics: Arc<Metrics>,
}

fn error_response(err: ApiError) -> Response {
    let status = err.to_http_status();
    (status, Json(err)).into_response()
}

pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitJobRequest>,
) -> Response {
    match state.pool.submit(body.request) {
        Ok(job_id) => {
            state.metrics.record_job_submitted();
            (
                StatusCode::ACCEPTED,
                Json(SubmitJobResponse {
                    job_id,
                    status: crate::job::JobStatus::Pending,
                }),
            )
                .into_response()
        }
        Err(e) => {
            state.metrics.record_job_rejected();
            error_response(e.into())
        }
    }
}

pub async fn get_job(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let job_id = match JobId::parse_str(&id) {
        Ok(id) => id,
        Err(e) => return error_response(e.into()),
    };
    match state.pool.get_state(job_id) {
        Ok(job_state) => Json(job_state).into_response(),
        Err(e) => error_response(e.into()),
    }
}

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Response {
    match state.pool.list_states() {
        Ok(mut jobs) => {
            if let Some(status) = query.status {
                jobs.retain(|j| format!("{:?}", j.status).eq_ignore_ascii_case(&status));
            }
            Json(ListJobsResponse { jobs }).into_response()
        }
        Err(e) => error_response(e.into()),
    }
}

pub async fn cancel_job(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let job_id = match JobId::parse_str(&id) {
        Ok(id) => id,
        Err(e) => return error_response(e.into()),
    };
    state.pool.cancel(job_id);
    match state.pool.get_state(job_id) {
        Ok(job_state) => Json(CancelJobResponse {
            job_id,
            status: job_state.status,
        })
        .into_response(),
        Err(e) => error_response(e.into()),
    }
}

pub async fn download_output(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let job_id = match JobId::parse_str(&id) {
        Ok(id) => id,
        Err(e) => return error_response(e.into()),
    };

    let job_state = match state.pool.get_state(job_id) {
        Ok(s) => s,
        Err(e) => return error_response(e.into()),
    };

    if job_state.status != crate::job::JobStatus::Completed {
        return error_response(
            crate::error::SimError::NotReady(job_id.to_string()).into(),
        );
    }

    let Some(output) = job_state.output_files.first() else {
        return error_response(crate::error::SimError::NotReady(job_id.to_string()).into());
    };

    match tokio::fs::read(&output.path).await {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    std::path::Path::new(&output.path)
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "output".to_string())
                ),
            )
            .body(Body::from(bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(_) => error_response(ApiError::new(
            "NOT_FOUND",
            format!("output artifact for job {job_id} is missing on disk"),
        )),
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let active = state.pool.active_job_count();
    Json(HealthResponse {
        status: "healthy".to_string(),
        active_jobs: active,
        service: "castra".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
    .into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "alive": true })))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_prometheus(),
    )
}
