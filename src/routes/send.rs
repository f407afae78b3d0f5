use axum::extract::State;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::api::{SendEmailRequest, SendEmailResponse};
use crate::routes::error::ApiError;
use crate::services::mailer::OutgoingEmail;
use crate::services::processor::Credentials;

/// POST /api/send-email: dispatch an already written email.
///
/// Missing relay credentials fall back to the configured defaults.
pub async fn send_email(
    State(state): State<AppState>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let credentials = Credentials::from(request.credentials);
    let email = OutgoingEmail {
        to: request.to.trim().to_string(),
        subject: request.subject,
        body: request.body,
        attachment_path: request
            .attachment_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    };

    let dispatched = state.mailer.send(&email, credentials.mail()).await?;

    metrics::counter!("emails_sent_total").increment(1);
    tracing::info!(to = %email.to, message_id = %dispatched.message_id, "Email sent on demand");

    Ok(Json(SendEmailResponse {
        success: true,
        message_id: dispatched.message_id,
    }))
}
