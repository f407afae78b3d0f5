use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the job pipeline metrics.
pub fn describe() {
    metrics::describe_counter!("email_jobs_created_total", "Total email jobs queued");
    metrics::describe_counter!(
        "email_jobs_processed_total",
        "Processing runs by outcome (success, failure, no_jobs, already_processing)"
    );
    metrics::describe_histogram!(
        "email_job_processing_seconds",
        "Time to resolve, generate and dispatch one job"
    );
    metrics::describe_counter!(
        "email_jobs_stale_failed_total",
        "Jobs failed after being stuck in processing"
    );
    metrics::describe_counter!("emails_generated_total", "Emails drafted through /api/generate-email");
    metrics::describe_counter!("emails_sent_total", "Emails dispatched through /api/send-email");
}
