//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus recorder and return a handle to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "tubetone_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "tubetone_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "tubetone_http_requests_in_flight";

    pub const VIDEO_INFO_TOTAL: &str = "tubetone_video_info_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "tubetone_rate_limit_hits_total";
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

/// Record which metadata provider answered a video-info request.
pub fn record_video_info(provider: &'static str) {
    counter!(names::VIDEO_INFO_TOTAL, "provider" => provider).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Routes whose path is used as a label verbatim.
const KNOWN_PATHS: &[&str] = &[
    "/",
    "/api/health",
    "/api/video-info",
    "/api/download",
    "/metrics",
];

/// Collapse job ids, filenames and unknown paths so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    static JOB_STATUS: OnceLock<Option<Regex>> = OnceLock::new();
    static DOWNLOAD_FILE: OnceLock<Option<Regex>> = OnceLock::new();

    let job_status = JOB_STATUS.get_or_init(|| Regex::new(r"^/api/download/status/[^/]+$").ok());
    let download_file = DOWNLOAD_FILE.get_or_init(|| Regex::new(r"^/downloads/.+$").ok());

    if job_status.as_ref().is_some_and(|re| re.is_match(path)) {
        return "/api/download/status/:job_id".to_string();
    }
    if download_file.as_ref().is_some_and(|re| re.is_match(path)) {
        return "/downloads/:file".to_string();
    }
    if KNOWN_PATHS.contains(&path) {
        return path.to_string();
    }
    "/other".to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/download/status/550e8400-e29b-41d4-a716-446655440000"),
            "/api/download/status/:job_id"
        );
        assert_eq!(sanitize_path("/downloads/My%20Song_1a2b3c4d.mp3"), "/downloads/:file");
        assert_eq!(sanitize_path("/api/video-info"), "/api/video-info");
        assert_eq!(sanitize_path("/"), "/");
        assert_eq!(sanitize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_unknown_paths_share_one_label() {
        assert_eq!(sanitize_path("/wp-admin/setup.php"), "/other");
        assert_eq!(sanitize_path("/api/nope/123"), "/other");
        assert_eq!(sanitize_path("/api/download/status/a/b"), "/other");
    }
}
