use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, StoreBackend};
use crate::db::{
    self, CredentialStore, JobStore, MemoryCredentialStore, MemoryJobStore, PgCredentialStore,
    PgJobStore,
};
use crate::services::{
    generator::{EmailGenerator, OpenAiGenerator},
    mailer::{MailDispatcher, RelayMailer},
    pdf::{PdfTextExtractor, TextExtractor},
    processor::JobProcessor,
    resume::ResumeResolver,
    storage::{ResumeStorage, StorageError},
};

/// Knobs shared by the HTTP triggers.
#[derive(Debug, Clone)]
pub struct TriggerSettings {
    pub cron_secret: Option<String>,
    pub batch_deadline: Duration,
    pub stale_after: Duration,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            cron_secret: None,
            batch_deadline: Duration::from_secs(60),
            stale_after: Duration::from_secs(900),
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub processor: JobProcessor,
    /// Same adapters the processor uses, for the one-off generate/send routes.
    pub generator: Arc<dyn EmailGenerator>,
    pub mailer: Arc<dyn MailDispatcher>,
    pub storage: Option<Arc<ResumeStorage>>,
    pub settings: Arc<TriggerSettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        credentials: Arc<dyn CredentialStore>,
        processor: JobProcessor,
        storage: Option<ResumeStorage>,
        settings: TriggerSettings,
    ) -> Self {
        Self {
            store,
            credentials,
            generator: processor.generator(),
            mailer: processor.mailer(),
            processor,
            storage: storage.map(Arc::new),
            settings: Arc::new(settings),
        }
    }

    /// Wire the store, adapters and processor described by `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, BootstrapError> {
        let (store, credentials): (Arc<dyn JobStore>, Arc<dyn CredentialStore>) = match config
            .store_backend
        {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(BootstrapError::MissingDatabaseUrl)?;

                tracing::info!("Connecting to PostgreSQL database");
                let pool = db::init_pool(url).await?;

                tracing::info!("Running database migrations");
                db::run_migrations(&pool).await?;

                (
                    Arc::new(PgJobStore::new(pool.clone())),
                    Arc::new(PgCredentialStore::new(pool)),
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory job store; jobs will not survive a restart");
                (
                    Arc::new(MemoryJobStore::new()),
                    Arc::new(MemoryCredentialStore::new()),
                )
            }
        };

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        let extractor: Option<Arc<dyn TextExtractor>> = if config.pdf_extraction {
            Some(Arc::new(PdfTextExtractor::default()))
        } else {
            tracing::info!("PDF text extraction disabled; PDF resumes use placeholder text");
            None
        };

        let resolver = ResumeResolver::new(http.clone(), extractor);
        let generator = OpenAiGenerator::new(
            http.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            config.openai_api_key.clone(),
        );
        let mailer = RelayMailer::new(
            http,
            config.mail_relay_url.clone(),
            config.mail_user.clone(),
            config.mail_password.clone(),
        );

        let processor = JobProcessor::new(
            store.clone(),
            Arc::new(resolver),
            Arc::new(generator),
            Arc::new(mailer),
        );

        let storage = match config.storage() {
            Some(s) => {
                tracing::info!(bucket = s.bucket, "Initializing R2 resume storage");
                Some(ResumeStorage::new(
                    s.bucket,
                    s.endpoint,
                    s.access_key,
                    s.secret_key,
                    s.public_url,
                )?)
            }
            None => None,
        };

        let settings = TriggerSettings {
            cron_secret: config.cron_secret.clone().filter(|s| !s.is_empty()),
            batch_deadline: config.batch_deadline(),
            stale_after: config.stale_after(),
        };

        Ok(Self::new(store, credentials, processor, storage, settings))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("DATABASE_URL is required for the postgres store backend")]
    MissingDatabaseUrl,

    #[error("database setup failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
