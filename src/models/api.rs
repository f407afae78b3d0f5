use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::job::{Job, NewJob};
use crate::services::processor::{Credentials, ProcessOutcome};

/// Request to queue a new application email.
///
/// Missing fields deserialize as empty strings so that they surface as
/// validation errors rather than body rejections.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[serde(default)]
    #[garde(email)]
    pub recruiter_email: String,

    #[serde(default)]
    #[garde(custom(not_blank), length(max = 20000))]
    pub job_description: String,

    #[serde(default)]
    #[garde(custom(not_blank), length(max = 20000))]
    pub ai_prompt: String,

    #[serde(default)]
    #[garde(custom(not_blank), length(max = 2048))]
    pub resume_path: String,
}

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("is required"));
    }
    Ok(())
}

impl From<CreateJobRequest> for NewJob {
    fn from(req: CreateJobRequest) -> Self {
        NewJob {
            recruiter_email: req.recruiter_email.trim().to_string(),
            job_description: req.job_description,
            ai_prompt: req.ai_prompt,
            resume_path: req.resume_path.trim().to_string(),
        }
    }
}

/// Optional per-invocation credentials sent by a trigger.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    pub openai_api_key: Option<String>,
    #[serde(alias = "gmail_user")]
    pub mail_user: Option<String>,
    #[serde(alias = "gmail_app_password")]
    pub mail_password: Option<String>,
}

impl From<CredentialsRequest> for Credentials {
    fn from(req: CredentialsRequest) -> Self {
        Credentials {
            openai_api_key: non_empty(req.openai_api_key),
            mail_user: non_empty(req.mail_user),
            mail_password: non_empty(req.mail_password),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Body of `POST /api/jobs/process-manual`.
#[derive(Debug, Deserialize)]
pub struct ProcessManualRequest {
    #[serde(flatten)]
    pub credentials: CredentialsRequest,
    #[serde(default = "default_max_jobs")]
    pub max_jobs: u32,
}

fn default_max_jobs() -> u32 {
    1
}

/// Storage webhook payload announcing a newly created job.
#[derive(Debug, Deserialize)]
pub struct JobCreatedWebhook {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub record: Option<WebhookRecord>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRecord {
    pub user_id: Option<String>,
}

/// Body of `POST /api/generate-email`.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateEmailRequest {
    #[serde(default, alias = "jobDescription")]
    #[garde(custom(not_blank), length(max = 20000))]
    pub job_description: String,

    #[serde(default, alias = "aiPrompt")]
    #[garde(custom(not_blank), length(max = 20000))]
    pub ai_prompt: String,

    #[serde(default, alias = "resumeContent")]
    #[garde(skip)]
    pub resume_content: String,

    #[garde(skip)]
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateEmailResponse {
    pub success: bool,
    pub subject: String,
    pub body: String,
}

/// Body of `POST /api/send-email`.
#[derive(Debug, Deserialize, Validate)]
pub struct SendEmailRequest {
    #[serde(default)]
    #[garde(email)]
    pub to: String,

    #[serde(default)]
    #[garde(custom(not_blank))]
    pub subject: String,

    #[serde(default)]
    #[garde(custom(not_blank))]
    pub body: String,

    #[serde(alias = "attachmentPath")]
    #[garde(skip)]
    pub attachment_path: Option<String>,

    #[serde(flatten)]
    #[garde(skip)]
    pub credentials: CredentialsRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message_id: String,
}

/// Query string of `GET /api/jobs`.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub job: Job,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub success: bool,
    pub date: String,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub result: ProcessOutcome,
}

/// Webhook reply; `processed` is false when the user has no stored keys and
/// the run fell back to the configured defaults.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub result: ProcessOutcome,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub processed: usize,
    pub results: Vec<ProcessOutcome>,
}

#[derive(Debug, Serialize)]
pub struct CronResponse {
    pub success: bool,
    /// Jobs failed by the stale-processing sweep before draining.
    pub stale_failed: Vec<uuid::Uuid>,
    pub results: Vec<ProcessOutcome>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub key: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, description: &str) -> CreateJobRequest {
        CreateJobRequest {
            recruiter_email: email.to_string(),
            job_description: description.to_string(),
            ai_prompt: "Introduce me".to_string(),
            resume_path: "https://cdn.example.com/resume.txt".to_string(),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request("jane@corp.example", "Backend role").validate().is_ok());
    }

    #[test]
    fn test_blank_and_malformed_fields_fail() {
        assert!(request("not-an-email", "Backend role").validate().is_err());
        assert!(request("jane@corp.example", "   ").validate().is_err());
    }

    #[test]
    fn test_missing_fields_deserialize_then_fail_validation() {
        let req: CreateJobRequest =
            serde_json::from_str(r#"{"recruiter_email":"jane@corp.example"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_blank_credentials_become_none() {
        let creds: Credentials = CredentialsRequest {
            openai_api_key: Some("  ".to_string()),
            mail_user: Some("me@mail.example".to_string()),
            mail_password: None,
        }
        .into();
        assert!(creds.openai_api_key.is_none());
        assert_eq!(creds.mail_user.as_deref(), Some("me@mail.example"));
    }

    #[test]
    fn test_generate_request_accepts_camel_case_fields() {
        let req: GenerateEmailRequest = serde_json::from_str(
            r#"{"jobDescription":"Rust role","aiPrompt":"Be brief","resumeContent":"Jane"}"#,
        )
        .unwrap();
        assert_eq!(req.job_description, "Rust role");
        assert_eq!(req.resume_content, "Jane");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_send_request_reads_attachment_and_credentials() {
        let req: SendEmailRequest = serde_json::from_str(
            r#"{"to":"hr@acme.io","subject":"Hi","body":"Hello","attachmentPath":"/tmp/cv.pdf","gmail_user":"me@mail.example"}"#,
        )
        .unwrap();
        assert_eq!(req.attachment_path.as_deref(), Some("/tmp/cv.pdf"));
        assert_eq!(req.credentials.mail_user.as_deref(), Some("me@mail.example"));
        assert!(req.validate().is_ok());

        let bad: SendEmailRequest = serde_json::from_str(r#"{"to":"nope","subject":"Hi"}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_manual_request_accepts_legacy_credential_names() {
        let req: ProcessManualRequest =
            serde_json::from_str(r#"{"gmail_user":"me@mail.example","gmail_app_password":"pw"}"#)
                .unwrap();
        assert_eq!(req.max_jobs, 1);
        assert_eq!(req.credentials.mail_password.as_deref(), Some("pw"));
    }
}
