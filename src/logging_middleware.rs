// src/logging_middleware.rs
//! Middleware for logging request bodies and response timings in debug mode

use axum::body::to_bytes;
use axum::{
    body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response,
};
use std::time::Instant;
use tracing::debug;

/// Log the request body (when JSON and non-empty), then the response status
/// and latency once the handler completes
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body_str) {
                debug!(
                    method = %parts.method,
                    uri = %parts.uri,
                    request_body = %json,
                    "Request"
                );
            } else {
                debug!(
                    method = %parts.method,
                    uri = %parts.uri,
                    request_body = %body_str,
                    "Request"
                );
            }
        }
    }

    let method = parts.method.clone();
    let uri = parts.uri.clone();
    let request = Request::from_parts(parts, Body::from(bytes));

    let started = Instant::now();
    let response = next.run(request).await;

    debug!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Response"
    );

    Ok(response)
}
