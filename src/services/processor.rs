use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::db::{Claim, JobStore, StoreError};
use crate::models::job::{Job, JobStatus, JobUpdate};
use crate::services::generator::{EmailContent, EmailGenerator, GenerationError};
use crate::services::mailer::{DispatchError, MailCredentials, MailDispatcher, OutgoingEmail};
use crate::services::resume::{ResumeError, ResumeResolver};

/// Per-invocation credentials. Missing values fall back to the configured
/// defaults inside each adapter.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub mail_user: Option<String>,
    pub mail_password: Option<String>,
}

impl Credentials {
    pub fn mail(&self) -> MailCredentials<'_> {
        MailCredentials {
            user: self.mail_user.as_deref(),
            password: self.mail_password.as_deref(),
        }
    }
}

/// What a single `process_next` call did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// Nothing queued; the caller can stop looping.
    NoJobs,
    /// Another invocation holds the processing slot; try again shortly.
    AlreadyProcessing,
    Succeeded { job_id: Uuid },
    Failed { job_id: Uuid, reason: String },
}

impl ProcessOutcome {
    fn label(&self) -> &'static str {
        match self {
            ProcessOutcome::NoJobs => "no_jobs",
            ProcessOutcome::AlreadyProcessing => "already_processing",
            ProcessOutcome::Succeeded { .. } => "success",
            ProcessOutcome::Failed { .. } => "failure",
        }
    }
}

/// How a trigger loops `process_next`.
#[derive(Debug, Clone)]
pub struct DrainPolicy {
    pub max_jobs: u32,
    /// Wait this long and retry on `AlreadyProcessing`; `None` stops instead.
    pub busy_backoff: Option<Duration>,
    /// No new iteration starts after this much wall clock.
    pub deadline: Duration,
}

impl DrainPolicy {
    /// Stop at the first `NoJobs` or `AlreadyProcessing`.
    pub fn until_idle(max_jobs: u32, deadline: Duration) -> Self {
        Self {
            max_jobs,
            busy_backoff: None,
            deadline,
        }
    }
}

/// Errors that terminate one job as `failure`.
#[derive(Debug, thiserror::Error)]
enum JobError {
    #[error(transparent)]
    Resume(#[from] ResumeError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Drives queued jobs through resume resolution, generation and dispatch,
/// one job per call, with at most one job in flight across all callers.
#[derive(Clone)]
pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    resolver: Arc<ResumeResolver>,
    generator: Arc<dyn EmailGenerator>,
    mailer: Arc<dyn MailDispatcher>,
}

impl JobProcessor {
    pub fn new(
        store: Arc<dyn JobStore>,
        resolver: Arc<ResumeResolver>,
        generator: Arc<dyn EmailGenerator>,
        mailer: Arc<dyn MailDispatcher>,
    ) -> Self {
        Self {
            store,
            resolver,
            generator,
            mailer,
        }
    }

    pub fn generator(&self) -> Arc<dyn EmailGenerator> {
        self.generator.clone()
    }

    pub fn mailer(&self) -> Arc<dyn MailDispatcher> {
        self.mailer.clone()
    }

    /// Process the oldest queued job, if the processing slot is free.
    ///
    /// Failures of the job itself are recorded on the job and reported as
    /// [`ProcessOutcome::Failed`]; only store errors are returned as `Err`.
    pub async fn process_next(&self, credentials: &Credentials) -> Result<ProcessOutcome, StoreError> {
        if !self.store.list_by_status(JobStatus::Processing).await?.is_empty() {
            tracing::debug!("A job is already processing, skipping");
            return Ok(self.record(ProcessOutcome::AlreadyProcessing));
        }

        let Some(next) = self.store.oldest_queued().await? else {
            tracing::debug!("No queued jobs to process");
            return Ok(self.record(ProcessOutcome::NoJobs));
        };

        let job = match self.store.claim(next.id).await? {
            Claim::Claimed(job) => job,
            Claim::Busy | Claim::NotQueued => {
                tracing::debug!(job_id = %next.id, "Lost the claim race, skipping");
                return Ok(self.record(ProcessOutcome::AlreadyProcessing));
            }
        };

        tracing::info!(
            job_id = %job.id,
            recruiter = %job.recruiter_email,
            partition = %job.partition_key(),
            "Processing email job"
        );

        let start = Instant::now();
        let result = self.run(&job, credentials).await;
        metrics::histogram!("email_job_processing_seconds").record(start.elapsed().as_secs_f64());

        let outcome = match result {
            Ok(content) => {
                self.store
                    .update(job.id, JobUpdate::success(content.subject, content.body))
                    .await?;
                tracing::info!(job_id = %job.id, "Job completed successfully");
                ProcessOutcome::Succeeded { job_id: job.id }
            }
            Err(e) => {
                let reason = e.to_string();
                self.store
                    .update(job.id, JobUpdate::failure(reason.clone()))
                    .await?;
                tracing::error!(job_id = %job.id, error = %reason, "Job processing failed");
                ProcessOutcome::Failed {
                    job_id: job.id,
                    reason,
                }
            }
        };

        Ok(self.record(outcome))
    }

    async fn run(&self, job: &Job, credentials: &Credentials) -> Result<EmailContent, JobError> {
        tracing::debug!(job_id = %job.id, "Resolving resume");
        let resume_text = self.resolver.resolve(&job.resume_path).await?;

        tracing::debug!(job_id = %job.id, resume_chars = resume_text.len(), "Generating email");
        let content = self
            .generator
            .generate(
                &job.job_description,
                &job.ai_prompt,
                &resume_text,
                credentials.openai_api_key.as_deref(),
            )
            .await?;

        tracing::debug!(job_id = %job.id, subject = %content.subject, "Dispatching email");
        let email = OutgoingEmail {
            to: job.recruiter_email.clone(),
            subject: content.subject.clone(),
            body: content.body.clone(),
            attachment_path: Some(job.resume_path.clone()),
        };
        let dispatched = self.mailer.send(&email, credentials.mail()).await?;

        tracing::info!(job_id = %job.id, message_id = %dispatched.message_id, "Email dispatched");
        Ok(content)
    }

    /// Loop [`JobProcessor::process_next`] according to `policy`.
    pub async fn drain(
        &self,
        credentials: &Credentials,
        policy: &DrainPolicy,
    ) -> Result<Vec<ProcessOutcome>, StoreError> {
        let started = Instant::now();
        let mut outcomes = Vec::new();

        for _ in 0..policy.max_jobs {
            if started.elapsed() >= policy.deadline {
                tracing::warn!(
                    processed = outcomes.len(),
                    deadline_secs = policy.deadline.as_secs(),
                    "Drain deadline reached, leaving remaining jobs for the next trigger"
                );
                break;
            }

            let outcome = self.process_next(credentials).await?;
            let stop = match &outcome {
                ProcessOutcome::NoJobs => true,
                ProcessOutcome::AlreadyProcessing => match policy.busy_backoff {
                    Some(backoff) => {
                        let remaining = policy.deadline.saturating_sub(started.elapsed());
                        tokio::time::sleep(backoff.min(remaining)).await;
                        false
                    }
                    None => true,
                },
                ProcessOutcome::Succeeded { .. } | ProcessOutcome::Failed { .. } => false,
            };
            outcomes.push(outcome);

            if stop {
                break;
            }
        }

        Ok(outcomes)
    }

    /// Fail jobs stuck in `processing` for longer than `max_age`, typically
    /// left behind by a process that died mid-flight.
    pub async fn sweep_stale(&self, max_age: Duration) -> Result<Vec<Uuid>, StoreError> {
        let age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = chrono::Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        let message = format!(
            "processing abandoned: no progress for more than {} seconds",
            max_age.as_secs()
        );

        let failed = self.store.fail_stale(cutoff, &message).await?;
        if !failed.is_empty() {
            metrics::counter!("email_jobs_stale_failed_total").increment(failed.len() as u64);
            tracing::warn!(count = failed.len(), jobs = ?failed, "Failed stale processing jobs");
        }
        Ok(failed)
    }

    fn record(&self, outcome: ProcessOutcome) -> ProcessOutcome {
        metrics::counter!("email_jobs_processed_total", "outcome" => outcome.label()).increment(1);
        outcome
    }
}
