//! REST API server assembly: wires the worker pool and metrics sink into an
//! Axum router and serves it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::middleware::{audit_middleware, tracing_middleware};
use crate::api::rest::handlers::{
    cancel_job, download_output, get_job, health, list_jobs, liveness, metrics, submit_job,
    AppState,
};
use crate::error::{SimError, SimResult};
use crate::observability::metrics::Metrics;
use crate::runner::WorkerPool;

/// REST API server for the casualty-generation service.
pub struct RestApiServer {
    state: Arc<AppState>,
}

impl RestApiServer {
    pub fn new(pool: Arc<WorkerPool>, metrics: Arc<Metrics>) -> Self {
        Self {
            state: Arc::new(AppState { pool, metrics }),
        }
    }

    /// Build the route table.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/jobs", post(submit_job).get(list_jobs))
            .route("/jobs/:id", get(get_job))
            .route("/jobs/:id/cancel", post(cancel_job))
            .route("/jobs/:id/output", get(download_output))
            .route("/health", get(health))
            .route("/live", get(liveness))
            .route("/metrics", get(metrics))
            .layer(
                ServiceBuilder::new()
                    .layer(CorsLayer::permissive())
                    .layer(TraceLayer::new_for_http())
                    .layer(axum::middleware::from_fn(tracing_middleware))
                    .layer(axum::middleware::from_fn(audit_middleware)),
            )
            .with_state(self.state.clone())
    }

    pub async fn serve(&self, addr: SocketAddr) -> SimResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| SimError::Configuration(format!("failed to bind {addr}: {e}")))?;
        axum::serve(listener, self.router())
            .await
            .map_err(|e| SimError::Internal(format!("server error: {e}")))
    }
}
