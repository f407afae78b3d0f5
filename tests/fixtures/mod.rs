//! Job and resume fixtures shared by the test suites
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::io::Write;
use tempfile::NamedTempFile;

use recruiter_mailer::models::job::{Job, JobStatus, NewJob};

pub const RESUME_TEXT: &str = "Jane Doe\nSenior Rust Engineer\n10 years building distributed systems";

pub const JOB_DESCRIPTION: &str = "Backend engineer to own our async Rust services";

pub const PROMPT_TEMPLATE: &str = "Write a short, friendly application email";

/// Model reply wrapped in chatter, as chat models often answer.
pub const CHATTY_REPLY: &str = "Sure! Here is your email:\n```json\n{\"subject\": \"Application: Backend Engineer\", \"body\": \"Hello,\\nI would love to join.\\nBest,\\nJane\"}\n```\nGood luck!";

pub fn new_job(recruiter_email: &str, resume_path: &str) -> NewJob {
    NewJob {
        recruiter_email: recruiter_email.to_string(),
        job_description: JOB_DESCRIPTION.to_string(),
        ai_prompt: PROMPT_TEMPLATE.to_string(),
        resume_path: resume_path.to_string(),
    }
}

/// Queued job created `minutes_ago` minutes in the past.
pub fn queued_job_aged(recruiter_email: &str, resume_path: &str, minutes_ago: i64) -> Job {
    let mut job = Job::queued(new_job(recruiter_email, resume_path));
    let at = Utc::now() - Duration::minutes(minutes_ago);
    job.created_at = at;
    job.updated_at = at;
    job
}

/// Job in `status` whose timestamps are pinned to `at`.
pub fn job_in_state(recruiter_email: &str, status: JobStatus, at: DateTime<Utc>) -> Job {
    let mut job = Job::queued(new_job(recruiter_email, "/nonexistent/resume.txt"));
    job.status = status;
    job.created_at = at;
    job.updated_at = at;
    match status {
        JobStatus::Success => {
            job.email_subject = Some("Sent earlier".to_string());
            job.email_body = Some("Body".to_string());
        }
        JobStatus::Failure => job.error_message = Some("Failed earlier".to_string()),
        JobStatus::Queued | JobStatus::Processing => {}
    }
    job
}

/// Plain-text resume on disk.
pub fn resume_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".txt")
        .tempfile()
        .expect("create resume file");
    file.write_all(RESUME_TEXT.as_bytes())
        .expect("write resume file");
    file
}

pub fn path_of(file: &NamedTempFile) -> String {
    file.path().display().to_string()
}
