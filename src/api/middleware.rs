//! HTTP middleware for the REST surface: request tracing and audit logging.
//!
//! Per-key authentication and rate limiting are deliberately not implemented
//! here — the core only ever receives an already-admitted job request; an
//! operator fronting this service with a gateway is expected to resolve
//! identity and quota before traffic reaches it (§1).

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use tracing::info;

/// Request/response tracing middleware.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    info!(method = %method, path = %path, "api request");

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = %response.status(),
        "api response"
    );

    response
}

/// Audit logging middleware: records who (if identified upstream) asked for
/// what, independent of the tracing span above.
pub async fn audit_middleware(headers: HeaderMap, request: Request, next: Next) -> Response {
    let user = headers
        .get("x-user-id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let path = request.uri().path().to_string();
    let method = request.method().clone();

    let response = next.run(request).await;

    info!(
        audit.event = "api_request",
        audit.user = %user,
        audit.method = %method,
        audit.path = %path,
        audit.status = %response.status(),
        "audit log"
    );

    response
}
