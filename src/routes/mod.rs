use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

pub mod error;
pub mod generate;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod process;
pub mod resumes;
pub mod send;

/// API routes (without the metrics endpoint and middleware layers).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/today", get(jobs::list_today))
        .route("/api/jobs/{job_id}", get(jobs::get_job))
        .route("/api/jobs/process-manual", post(process::process_manual))
        .route(
            "/api/process-jobs",
            get(process::process_default).post(process::process_with_credentials),
        )
        .route("/api/cron/process-jobs", get(process::cron))
        .route("/api/webhooks/job-created", post(process::job_created_webhook))
        .route("/api/resumes/upload", post(resumes::upload_resume))
        .route("/api/generate-email", post(generate::generate_email))
        .route("/api/send-email", post(send::send_email))
        .with_state(state)
}
