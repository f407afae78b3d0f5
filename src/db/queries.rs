use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use super::{day_bounds, Claim, JobStore, StoreError};
use crate::models::job::{Job, JobStatus, JobUpdate, NewJob};

/// Name of the partial unique index that allows a single `processing` row.
const SINGLE_PROCESSING_INDEX: &str = "email_jobs_single_processing";

const JOB_COLUMNS: &str = "id, recruiter_email, job_description, ai_prompt, resume_path, status, \
     email_subject, email_body, error_message, created_at, updated_at";

/// Postgres-backed job store.
///
/// The single-flight slot is enforced by a partial unique index over
/// `status = 'processing'`, so two concurrent claims cannot both commit.
/// Timestamps are always stamped from the application clock, the same clock
/// stale-sweep cutoffs are computed from.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn job_from_row(row: &PgRow) -> Result<Job, StoreError> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<JobStatus>()
        .map_err(|_| StoreError::Corrupt(format!("unknown status '{status_str}'")))?;

    Ok(Job {
        id: row.try_get("id")?,
        recruiter_email: row.try_get("recruiter_email")?,
        job_description: row.try_get("job_description")?,
        ai_prompt: row.try_get("ai_prompt")?,
        resume_path: row.try_get("resume_path")?,
        status,
        email_subject: row.try_get("email_subject")?,
        email_body: row.try_get("email_body")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn is_single_processing_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(SINGLE_PROCESSING_INDEX)
        }
        _ => false,
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[instrument(skip(self, new_job), fields(recruiter = %new_job.recruiter_email))]
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let job = Job::queued(new_job);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO email_jobs (id, recruiter_email, job_description, ai_prompt, resume_path,
                                    status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'queued', $6, $6)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.id)
        .bind(&job.recruiter_email)
        .bind(&job.job_description)
        .bind(&job.ai_prompt)
        .bind(&job.resume_path)
        .bind(job.created_at)
        .fetch_one(&self.pool)
        .await?;

        job_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> Result<Job, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM email_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => job_from_row(&r),
            None => Err(StoreError::NotFound(id)),
        }
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM email_jobs WHERE status = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(status.as_ref())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn oldest_queued(&self) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM email_jobs
            WHERE status = 'queued'
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Job>, StoreError> {
        let (start, end) = day_bounds(date);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM email_jobs
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    #[instrument(skip(self, update), fields(status = ?update.status))]
    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM email_jobs WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut job = match row {
            Some(r) => job_from_row(&r)?,
            None => return Err(StoreError::NotFound(id)),
        };
        job.apply(update)?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE email_jobs
            SET status = $1,
                email_subject = $2,
                email_body = $3,
                error_message = $4,
                updated_at = $5
            WHERE id = $6
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.status.as_ref())
        .bind(&job.email_subject)
        .bind(&job.email_body)
        .bind(&job.error_message)
        .bind(job.updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        job_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn claim(&self, id: Uuid) -> Result<Claim, StoreError> {
        let result = sqlx::query(&format!(
            r#"
            UPDATE email_jobs
            SET status = 'processing', updated_at = $2
            WHERE id = $1 AND status = 'queued'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => Ok(Claim::Claimed(job_from_row(&row)?)),
            Ok(None) => Ok(Claim::NotQueued),
            Err(e) if is_single_processing_violation(&e) => Ok(Claim::Busy),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, message))]
    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            r#"
            UPDATE email_jobs
            SET status = 'failure', error_message = $2, updated_at = $3
            WHERE status = 'processing' AND updated_at < $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .bind(message)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| r.try_get::<Uuid, _>("id").map_err(StoreError::from))
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
