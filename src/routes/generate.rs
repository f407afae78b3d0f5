use axum::extract::State;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::api::{GenerateEmailRequest, GenerateEmailResponse};
use crate::routes::error::ApiError;

/// POST /api/generate-email: draft an email without queueing a job.
pub async fn generate_email(
    State(state): State<AppState>,
    Json(request): Json<GenerateEmailRequest>,
) -> Result<Json<GenerateEmailResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let api_key = request
        .openai_api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty());

    let content = state
        .generator
        .generate(
            &request.job_description,
            &request.ai_prompt,
            &request.resume_content,
            api_key,
        )
        .await?;

    metrics::counter!("emails_generated_total").increment(1);
    tracing::info!(subject = %content.subject, "Email generated on demand");

    Ok(Json(GenerateEmailResponse {
        success: true,
        subject: content.subject,
        body: content.body,
    }))
}
