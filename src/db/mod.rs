use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::models::job::{InvalidTransition, Job, JobStatus, JobUpdate, NewJob};

pub mod credentials;
pub mod memory;
pub mod queries;

pub use credentials::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
pub use memory::MemoryJobStore;
pub use queries::PgJobStore;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Result of trying to move a queued job into the single processing slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The job is now `processing` and owned by the caller.
    Claimed(Job),
    /// Another job already holds the processing slot.
    Busy,
    /// The job left `queued` before the claim landed.
    NotQueued,
}

/// Durable collection of jobs consumed by the processor and the HTTP surface.
///
/// Listing by status spans every daily partition; only [`JobStore::list_by_date`]
/// is partition-scoped.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Job, StoreError>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError>;

    /// Next job in arrival order: the `queued` job with the smallest
    /// `(created_at, id)`.
    async fn oldest_queued(&self) -> Result<Option<Job>, StoreError> {
        let queued = self.list_by_status(JobStatus::Queued).await?;
        Ok(queued
            .into_iter()
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))))
    }

    /// Jobs created on `date` (UTC), oldest first.
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Job>, StoreError>;

    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError>;

    /// Atomically transition `id` from `queued` to `processing`, only if no
    /// other job is `processing`.
    async fn claim(&self, id: Uuid) -> Result<Claim, StoreError>;

    /// Fail every `processing` job last touched before `cutoff`.
    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Check backend connectivity (for health checks).
    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt job record: {0}")]
    Corrupt(String),
}

/// UTC bounds `[start, end)` of a daily partition.
pub(crate) fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}
