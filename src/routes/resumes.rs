use axum::extract::{Multipart, State};
use axum::Json;

use crate::app_state::AppState;
use crate::models::api::UploadResponse;
use crate::routes::error::ApiError;
use crate::services::storage::resume_key;

/// POST /api/resumes/upload: store a resume and return the URL to use as
/// a job's `resume_path`.
///
/// Multipart fields: `file` (required) and `owner` (optional key prefix).
pub async fn upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let storage = state
        .storage
        .clone()
        .ok_or_else(|| ApiError::Unavailable("resume storage is not configured".to_string()))?;

    let mut owner = String::new();
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("owner") => {
                owner = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("resume").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                file = Some((filename, content_type, data.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| ApiError::Validation("No file provided".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".to_string()));
    }

    let key = resume_key(&owner, &filename);
    storage.upload(&key, &data, &content_type).await?;

    tracing::info!(key = %key, bytes = data.len(), "Resume uploaded");
    Ok(Json(UploadResponse {
        success: true,
        url: storage.public_url(&key),
        key,
        filename,
    }))
}
