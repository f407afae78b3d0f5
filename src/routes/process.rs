use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::Json;
use std::time::Duration;

use crate::app_state::AppState;
use crate::models::api::{
    BatchResponse, CredentialsRequest, CronResponse, JobCreatedWebhook, ProcessManualRequest,
    ProcessResponse, WebhookResponse,
};
use crate::routes::error::ApiError;
use crate::services::processor::{Credentials, DrainPolicy};

const CRON_MAX_JOBS: u32 = 5;
const CRON_BUSY_BACKOFF: Duration = Duration::from_secs(2);
const MANUAL_MAX_JOBS: u32 = 25;

/// GET /api/process-jobs: process one job with the configured credentials.
pub async fn process_default(State(state): State<AppState>) -> Result<Json<ProcessResponse>, ApiError> {
    let result = state.processor.process_next(&Credentials::default()).await?;
    Ok(Json(ProcessResponse {
        success: true,
        result,
    }))
}

/// POST /api/process-jobs: process one job with caller-supplied credentials.
///
/// An empty or unparseable body means "no overrides".
pub async fn process_with_credentials(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ProcessResponse>, ApiError> {
    let request: CredentialsRequest = serde_json::from_slice(&body).unwrap_or_default();
    let credentials = Credentials::from(request);

    tracing::info!(
        has_openai = credentials.openai_api_key.is_some(),
        has_mail_user = credentials.mail_user.is_some(),
        has_mail_password = credentials.mail_password.is_some(),
        "Processing triggered with credentials"
    );

    let result = state.processor.process_next(&credentials).await?;
    Ok(Json(ProcessResponse {
        success: true,
        result,
    }))
}

/// POST /api/jobs/process-manual: drain up to `max_jobs` with user credentials.
pub async fn process_manual(
    State(state): State<AppState>,
    Json(request): Json<ProcessManualRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let max_jobs = request.max_jobs.clamp(1, MANUAL_MAX_JOBS);
    let credentials = Credentials::from(request.credentials);

    if credentials.openai_api_key.is_none() && credentials.mail_user.is_none() {
        return Err(ApiError::Validation("Missing credentials".to_string()));
    }

    tracing::info!(max_jobs, "Manual processing requested");
    let policy = DrainPolicy::until_idle(max_jobs, state.settings.batch_deadline);
    let results = state.processor.drain(&credentials, &policy).await?;

    Ok(Json(BatchResponse {
        success: true,
        processed: results.len(),
        results,
    }))
}

/// GET /api/cron/process-jobs: scheduled batch run.
///
/// Requires `Authorization: Bearer <CRON_SECRET>` when a secret is configured.
pub async fn cron(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CronResponse>, ApiError> {
    if let Some(secret) = state.settings.cron_secret.as_deref() {
        let expected = format!("Bearer {secret}");
        let provided = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized);
        }
    }

    tracing::info!("Starting scheduled job processing");
    let stale_failed = state.processor.sweep_stale(state.settings.stale_after).await?;

    let policy = DrainPolicy {
        max_jobs: CRON_MAX_JOBS,
        busy_backoff: Some(CRON_BUSY_BACKOFF),
        deadline: state.settings.batch_deadline,
    };
    let results = state
        .processor
        .drain(&Credentials::default(), &policy)
        .await?;

    tracing::info!(runs = results.len(), "Scheduled job processing completed");
    Ok(Json(CronResponse {
        success: true,
        stale_failed,
        results,
    }))
}

/// POST /api/webhooks/job-created: storage event announcing a new job.
///
/// Processes with the user's stored keys. Without stored keys the run still
/// happens on the configured defaults and is reported as `processed: false`.
pub async fn job_created_webhook(
    State(state): State<AppState>,
    Json(payload): Json<JobCreatedWebhook>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let user_id = payload
        .record
        .as_ref()
        .and_then(|r| r.user_id.as_deref())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("No user_id in webhook payload".to_string()))?;

    tracing::info!(
        event = payload.event_type.as_deref().unwrap_or("unknown"),
        user_id,
        "Job created webhook triggered"
    );

    let Some(credentials) = state.credentials.credentials_for(user_id).await? else {
        tracing::warn!(user_id, "No API keys stored for user, using configured defaults");
        let result = state.processor.process_next(&Credentials::default()).await?;
        return Ok(Json(WebhookResponse {
            success: true,
            processed: false,
            reason: Some("No API keys".to_string()),
            result,
        }));
    };

    let result = state.processor.process_next(&credentials).await?;
    tracing::info!(user_id, ?result, "Webhook processing finished");
    Ok(Json(WebhookResponse {
        success: true,
        processed: true,
        reason: None,
        result,
    }))
}
