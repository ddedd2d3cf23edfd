//! Download job handlers.
//!
//! `POST /api/download` answers as soon as the job is stored; the client then
//! polls `GET /api/download/status/:jobId`. With `?wait=true` the request
//! instead stays open until the job settles.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use tubetone_jobs::DownloadRequest;
use tubetone_models::{DownloadJob, JobId, JobOutcome, JobState};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::handlers::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Hold the request open until the job settles
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: JobId,
    pub status: JobState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReady {
    pub job_id: JobId,
    pub download_url: String,
    pub filename: String,
    pub size: u64,
}

/// Start a download job.
pub async fn submit_download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
    ApiJson(body): ApiJson<DownloadBody>,
) -> ApiResult<Response> {
    let submitted = state
        .engine
        .submit(DownloadRequest {
            url: body.url.unwrap_or_default(),
            format: body.format,
            title: body.title,
        })
        .await?;

    let job = submitted.job;
    info!(
        job_id = %job.id,
        source_id = %job.source_id,
        format = %job.format,
        filename = %job.filename,
        wait = query.wait,
        "Download job accepted"
    );

    if !query.wait {
        return Ok(Json(ApiResponse::ok(accepted(job))).into_response());
    }

    let settled = submitted
        .completion
        .await
        .map_err(|_| ApiError::internal("Download job ended without a result"))?;
    ready_or_failed(settled).map(|ready| Json(ApiResponse::ok(ready)).into_response())
}

fn accepted(job: DownloadJob) -> JobAccepted {
    JobAccepted {
        status: job.state(),
        job_id: job.id,
    }
}

fn ready_or_failed(job: DownloadJob) -> ApiResult<DownloadReady> {
    match job.outcome {
        JobOutcome::Completed { download_url, size } => Ok(DownloadReady {
            job_id: job.id,
            download_url,
            filename: job.filename,
            size,
        }),
        JobOutcome::Failed { error } => Err(ApiError::failed("Download failed", error)),
        JobOutcome::Processing => Err(ApiError::internal("Download job did not settle")),
    }
}

/// Current state of a download job.
pub async fn download_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ApiResponse<DownloadJob>>> {
    let job = state.engine.status(&JobId::from(job_id)).await?;
    Ok(Json(ApiResponse::ok(job)))
}
