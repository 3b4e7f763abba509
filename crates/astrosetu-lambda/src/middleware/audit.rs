use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Request logging middleware.
///
/// Emits one structured `api_request` line per request. Report lifecycle
/// events are audited separately by the handlers and the worker.
pub async fn audit_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(method = %method, path = %path, status, latency_ms, "api_request");
    } else {
        tracing::info!(method = %method, path = %path, status, latency_ms, "api_request");
    }

    response
}
