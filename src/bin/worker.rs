use recruiter_mailer::{
    app_state::AppState,
    config::AppConfig,
    services::processor::{Credentials, DrainPolicy, ProcessOutcome},
};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

/// Upper bound on runs per tick; the batch deadline usually stops earlier.
const MAX_JOBS_PER_TICK: u32 = 100;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting email job worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    let state = AppState::from_config(&config)
        .await
        .expect("Failed to initialize application state");

    let credentials = Credentials::default();
    let policy = DrainPolicy::until_idle(MAX_JOBS_PER_TICK, config.batch_deadline());
    let interval = config.poll_interval();

    tracing::info!(
        poll_interval_secs = interval.as_secs(),
        "Worker ready, starting job processing loop"
    );

    // Main processing loop
    loop {
        if let Err(e) = state.processor.sweep_stale(config.stale_after()).await {
            tracing::error!(error = %e, "Stale job sweep failed");
        }

        match state.processor.drain(&credentials, &policy).await {
            Ok(outcomes) => {
                let handled = outcomes
                    .iter()
                    .filter(|o| matches!(o, ProcessOutcome::Succeeded { .. } | ProcessOutcome::Failed { .. }))
                    .count();
                if handled > 0 {
                    tracing::info!(handled, "Processed queued jobs");
                } else {
                    tracing::trace!("No jobs processed this tick");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing jobs, will retry");
            }
        }

        sleep(interval).await;
    }
}
