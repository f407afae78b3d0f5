use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{CreateJobRequest, JobListResponse, JobResponse, ListJobsQuery};
use crate::routes::error::ApiError;

/// POST /api/jobs: queue a new application email.
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let job = state.store.create(request.into()).await?;
    metrics::counter!("email_jobs_created_total").increment(1);

    tracing::info!(job_id = %job.id, partition = %job.partition_key(), "Job queued");
    Ok(Json(JobResponse { success: true, job }))
}

/// GET /api/jobs?date=YYYY-MM-DD: jobs of one daily partition (default today).
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListResponse>, ApiError> {
    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::Validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))?,
        None => Utc::now().date_naive(),
    };
    list_partition(&state, date).await
}

/// GET /api/jobs/today
pub async fn list_today(State(state): State<AppState>) -> Result<Json<JobListResponse>, ApiError> {
    list_partition(&state, Utc::now().date_naive()).await
}

async fn list_partition(state: &AppState, date: NaiveDate) -> Result<Json<JobListResponse>, ApiError> {
    let jobs = state.store.list_by_date(date).await?;
    Ok(Json(JobListResponse {
        success: true,
        date: date.format("%Y-%m-%d").to_string(),
        jobs,
    }))
}

/// GET /api/jobs/{id}: current state of one job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.store.get_by_id(job_id).await?;
    Ok(Json(JobResponse { success: true, job }))
}
