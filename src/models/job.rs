use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of an email job.
///
/// Transitions only move forward: `queued -> processing -> {success, failure}`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Success,
    Failure,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }

    /// Whether a job in `self` may be moved to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Success)
                | (JobStatus::Processing, JobStatus::Failure)
        )
    }
}

/// One email-send task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub recruiter_email: String,
    pub job_description: String,
    pub ai_prompt: String,
    pub resume_path: String,
    pub status: JobStatus,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a freshly queued job from validated submission fields.
    pub fn queued(new_job: NewJob) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recruiter_email: new_job.recruiter_email,
            job_description: new_job.job_description,
            ai_prompt: new_job.ai_prompt,
            resume_path: new_job.resume_path,
            status: JobStatus::Queued,
            email_subject: None,
            email_body: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Daily bucket this job belongs to (UTC creation date).
    pub fn partition(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Bucket key in `YYYY-MM-DD` form.
    pub fn partition_key(&self) -> String {
        self.partition().format("%Y-%m-%d").to_string()
    }

    /// Merge an update into this job, enforcing forward-only transitions.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), InvalidTransition> {
        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
            self.status = next;
        }
        if update.email_subject.is_some() {
            self.email_subject = update.email_subject;
        }
        if update.email_body.is_some() {
            self.email_body = update.email_body;
        }
        if update.error_message.is_some() {
            self.error_message = update.error_message;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Fields accepted at the job-creation boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewJob {
    pub recruiter_email: String,
    pub job_description: String,
    pub ai_prompt: String,
    pub resume_path: String,
}

/// Partial mutation of a job.
///
/// Terminal updates are only built through [`JobUpdate::success`] and
/// [`JobUpdate::failure`], which keeps result fields and error message
/// mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub error_message: Option<String>,
}

impl JobUpdate {
    pub fn processing() -> Self {
        Self {
            status: Some(JobStatus::Processing),
            ..Self::default()
        }
    }

    pub fn success(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Success),
            email_subject: Some(subject.into()),
            email_body: Some(body.into()),
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failure),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}
