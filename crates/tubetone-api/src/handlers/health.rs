//! Health and service banner handlers.

use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::error::ApiError;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointIndex {
    pub health: &'static str,
    pub video_info: &'static str,
    pub download: &'static str,
    pub download_status: &'static str,
}

/// Service banner.
#[derive(Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub endpoints: EndpointIndex,
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "YouTube to MP3 Converter API",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: EndpointIndex {
            health: "/api/health",
            video_info: "POST /api/video-info",
            download: "POST /api/download",
            download_status: "GET /api/download/status/:jobId",
        },
    })
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}
