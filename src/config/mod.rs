use serde::Deserialize;
use std::time::Duration;

use crate::services::generator::DEFAULT_MODEL;

/// Which job store backend to use.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Non-durable; single-process local runs only.
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,

    /// PostgreSQL connection string (required for the postgres backend)
    pub database_url: Option<String>,

    /// Default text-generation API key, used when a trigger supplies none
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Base URL of the HTTP mail relay
    pub mail_relay_url: String,

    /// Default relay login, used when a trigger supplies none
    pub mail_user: Option<String>,
    pub mail_password: Option<String>,

    /// Bearer token required by the cron trigger when set
    pub cron_secret: Option<String>,

    /// Worker poll interval
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Age after which a `processing` job is considered abandoned
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Wall-clock bound of one batch of processing runs
    #[serde(default = "default_batch_deadline_secs")]
    pub batch_deadline_secs: u64,

    /// Disable to run without the PDF text extraction capability
    #[serde(default = "default_pdf_extraction")]
    pub pdf_extraction: bool,

    /// Timeout applied to every outbound HTTP call
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// R2 bucket for resume uploads (uploads are disabled when unset)
    pub r2_bucket: Option<String>,
    pub r2_endpoint: Option<String>,
    pub r2_access_key: Option<String>,
    pub r2_secret_key: Option<String>,
    /// Public base URL serving the R2 bucket
    pub r2_public_url: Option<String>,
}

/// Connection settings for resume uploads, present only when fully configured.
pub struct StorageSettings<'a> {
    pub bucket: &'a str,
    pub endpoint: &'a str,
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub public_url: &'a str,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Postgres
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_stale_after_secs() -> u64 {
    900
}

fn default_batch_deadline_secs() -> u64 {
    60
}

fn default_pdf_extraction() -> bool {
    true
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn batch_deadline(&self) -> Duration {
        Duration::from_secs(self.batch_deadline_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn storage(&self) -> Option<StorageSettings<'_>> {
        Some(StorageSettings {
            bucket: self.r2_bucket.as_deref()?,
            endpoint: self.r2_endpoint.as_deref()?,
            access_key: self.r2_access_key.as_deref()?,
            secret_key: self.r2_secret_key.as_deref()?,
            public_url: self.r2_public_url.as_deref()?,
        })
    }
}
