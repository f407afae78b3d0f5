use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;

use super::StoreError;
use crate::services::processor::Credentials;

/// Per-user API keys saved from the account settings page.
///
/// Rows are written by the account UI; this service only reads them.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored keys for `user_id`, or `None` when the user saved nothing usable.
    async fn credentials_for(&self, user_id: &str) -> Result<Option<Credentials>, StoreError>;
}

/// Blank values count as absent; a row with nothing usable counts as no row.
fn usable(credentials: Credentials) -> Option<Credentials> {
    let blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let credentials = Credentials {
        openai_api_key: blank(credentials.openai_api_key),
        mail_user: blank(credentials.mail_user),
        mail_password: blank(credentials.mail_password),
    };

    let any = credentials.openai_api_key.is_some()
        || credentials.mail_user.is_some()
        || credentials.mail_password.is_some();
    any.then_some(credentials)
}

/// Reads the `user_api_keys` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    #[instrument(skip(self))]
    async fn credentials_for(&self, user_id: &str) -> Result<Option<Credentials>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT openai_api_key, gmail_user, gmail_app_password
            FROM user_api_keys
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(usable(Credentials {
            openai_api_key: row.try_get("openai_api_key")?,
            mail_user: row.try_get("gmail_user")?,
            mail_password: row.try_get("gmail_app_password")?,
        }))
    }
}

/// In-process credential store for local runs and tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    keys: RwLock<HashMap<String, Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: impl Into<String>, credentials: Credentials) {
        self.keys.write().await.insert(user_id.into(), credentials);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn credentials_for(&self, user_id: &str) -> Result<Option<Credentials>, StoreError> {
        Ok(self.keys.read().await.get(user_id).cloned().and_then(usable))
    }
}
