//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vchat_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vchat_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vchat_http_requests_in_flight";

    // Upload metrics
    pub const UPLOADS_TOTAL: &str = "vchat_uploads_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "vchat_upload_bytes_total";

    // Provider metrics
    pub const PROVIDER_CALLS_TOTAL: &str = "vchat_provider_calls_total";
    pub const PROVIDER_CALL_DURATION_SECONDS: &str = "vchat_provider_call_duration_seconds";

    // Event channel metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "vchat_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "vchat_ws_connections_active";
    pub const WS_EVENTS_SENT: &str = "vchat_ws_events_sent_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a stored upload.
pub fn record_upload(size_bytes: u64) {
    counter!(names::UPLOADS_TOTAL).increment(1);
    counter!(names::UPLOAD_BYTES_TOTAL).increment(size_bytes);
}

/// Record a provider call.
pub fn record_provider_call(operation: &str, success: bool, duration_secs: f64) {
    let labels = [
        ("operation", operation.to_string()),
        ("outcome", if success { "ok" } else { "error" }.to_string()),
    ];
    counter!(names::PROVIDER_CALLS_TOTAL, &labels).increment(1);
    histogram!(names::PROVIDER_CALL_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an event-channel connection.
pub fn record_ws_connection() {
    counter!(names::WS_CONNECTIONS_TOTAL).increment(1);
}

/// Update the active event-channel connections gauge.
pub fn set_ws_active_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record an event forwarded to a client.
pub fn record_ws_event_sent(event_type: &str) {
    let labels = [("type", event_type.to_string())];
    counter!(names::WS_EVENTS_SENT, &labels).increment(1);
}

/// Sanitize path for metrics labels (collapse per-file static paths).
fn sanitize_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/uploads/") {
        if !rest.is_empty() {
            return "/uploads/:file".to_string();
        }
    }
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
