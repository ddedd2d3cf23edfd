//! Video metadata handler.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use tubetone_models::{extract_source_id, SourceIdError, VideoInfo};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::handlers::ApiResponse;
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VideoInfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Look up title, author, duration and the offered formats for a video.
pub async fn video_info(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VideoInfoRequest>,
) -> ApiResult<Json<ApiResponse<VideoInfo>>> {
    let url = request.url.as_deref().unwrap_or_default().trim();
    let source_id = extract_source_id(url).map_err(|e| match e {
        SourceIdError::Empty => ApiError::bad_request("YouTube URL is required"),
        _ => ApiError::bad_request("Invalid YouTube URL"),
    })?;

    let resolved = state.metadata.resolve(url, &source_id).await?;
    metrics::record_video_info(resolved.provider);
    info!(
        source_id = %source_id,
        provider = resolved.provider,
        title = %resolved.info.title,
        "Video info resolved"
    );

    Ok(Json(ApiResponse::ok(resolved.info)))
}
