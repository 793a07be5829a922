//! Job polling routes
//!
//! `GET /jobStatus`, `/pav_jobStatus`, `/supplemental_jobStatus` list jobs of
//! one kind, newest first. `GET /download/:job_id` serves the processed-CSV
//! echo once a job completes, a "still processing" marker while it runs, and
//! the failure message otherwise. Swept or never-known job ids are 404.

use crate::api::response::ErrorResponse;
use crate::features::FeatureState;
use crate::ingest::{JobKind, JobState, JobStatus, UploadStats};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

pub fn job_routes() -> Router<FeatureState> {
    Router::new()
        .route("/jobStatus", get(madc_job_status))
        .route("/pav_jobStatus", get(pav_job_status))
        .route("/supplemental_jobStatus", get(supplemental_job_status))
        .route("/download/:job_id", get(download))
}

/// Wire shape of one job entry.
#[derive(Debug, Serialize)]
struct JobStatusResponse {
    job_id: Uuid,
    status: &'static str,
    submission_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completion_time: Option<DateTime<Utc>>,
    file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<UploadStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_allele_ids: Option<Vec<String>>,
}

impl From<JobState> for JobStatusResponse {
    fn from(state: JobState) -> Self {
        Self {
            job_id: state.job_id,
            status: state.status.as_str(),
            submission_time: state.submission_time,
            completion_time: state.completion_time,
            file_name: state.file_name,
            summary: state.summary,
            error: state.error,
            missing_allele_ids: state.missing_allele_ids,
        }
    }
}

fn list_jobs(state: &FeatureState, kind: JobKind) -> Json<Vec<JobStatusResponse>> {
    let jobs: Vec<JobStatusResponse> = state
        .jobs
        .list(kind)
        .into_iter()
        .map(JobStatusResponse::from)
        .collect();
    Json(jobs)
}

async fn madc_job_status(State(state): State<FeatureState>) -> impl IntoResponse {
    list_jobs(&state, JobKind::Madc)
}

async fn pav_job_status(State(state): State<FeatureState>) -> impl IntoResponse {
    list_jobs(&state, JobKind::Pav)
}

async fn supplemental_job_status(State(state): State<FeatureState>) -> impl IntoResponse {
    list_jobs(&state, JobKind::Supplemental)
}

#[tracing::instrument(skip(state), fields(job_id = %job_id))]
async fn download(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> Response {
    let Some(job) = state.jobs.get(job_id) else {
        let error = ErrorResponse::new("NOT_FOUND", format!("No job with id {job_id}"));
        return (StatusCode::NOT_FOUND, Json(error)).into_response();
    };

    match job.status {
        JobStatus::Processing => (
            StatusCode::OK,
            Json(json!({
                "job_id": job.job_id,
                "status": "Processing",
                "message": "Job is still processing; try again later"
            })),
        )
            .into_response(),
        JobStatus::Failed => (
            StatusCode::OK,
            Json(json!({
                "job_id": job.job_id,
                "status": "Failed",
                "error": job.error.unwrap_or_else(|| "Unknown error".to_string())
            })),
        )
            .into_response(),
        JobStatus::Completed => match job.processed_csv {
            Some(csv) => {
                let disposition =
                    format!("attachment; filename=\"processed_{}\"", job.file_name);
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, "text/csv".to_string()),
                        (header::CONTENT_DISPOSITION, disposition),
                    ],
                    csv,
                )
                    .into_response()
            }
            None => (
                StatusCode::OK,
                Json(json!({
                    "job_id": job.job_id,
                    "status": "Completed",
                    "message": "Job completed without a processed file"
                })),
            )
                .into_response(),
        },
    }
}
