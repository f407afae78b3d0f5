use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Claim, JobStore, StoreError};
use crate::models::job::{Job, JobStatus, JobUpdate, NewJob};

/// In-process job store for local runs and tests.
///
/// Every mutation happens under one write lock, which makes `claim` an
/// atomic check-and-set over the whole collection.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job as-is, bypassing creation defaults. Used to seed fixtures
    /// with explicit timestamps or states.
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

fn oldest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    jobs
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let job = Job::queued(new_job);
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Job, StoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let jobs = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        Ok(oldest_first(jobs))
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Job>, StoreError> {
        let jobs = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.partition() == date)
            .cloned()
            .collect();
        Ok(oldest_first(jobs))
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.apply(update)?;
        Ok(job.clone())
    }

    async fn claim(&self, id: Uuid) -> Result<Claim, StoreError> {
        let mut jobs = self.jobs.write().await;

        if jobs.values().any(|j| j.status == JobStatus::Processing) {
            return Ok(Claim::Busy);
        }

        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if job.status != JobStatus::Queued {
            return Ok(Claim::NotQueued);
        }
        job.apply(JobUpdate::processing())?;
        Ok(Claim::Claimed(job.clone()))
    }

    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        let mut jobs = self.jobs.write().await;
        let mut failed = Vec::new();

        for job in jobs.values_mut() {
            if job.status == JobStatus::Processing && job.updated_at < cutoff {
                job.apply(JobUpdate::failure(message))?;
                failed.push(job.id);
            }
        }

        Ok(failed)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
