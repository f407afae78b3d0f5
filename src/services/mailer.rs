use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::services::resume::{locate, ResumeLocation};

const FALLBACK_ATTACHMENT_NAME: &str = "resume.pdf";

/// A generated email addressed to a recruiter.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// URL or local path of a file to attach.
    pub attachment_path: Option<String>,
}

/// Relay login supplied by the caller of a single processing run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailCredentials<'a> {
    pub user: Option<&'a str>,
    pub password: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispatched {
    pub message_id: String,
}

#[async_trait]
pub trait MailDispatcher: Send + Sync {
    async fn send(
        &self,
        email: &OutgoingEmail,
        credentials: MailCredentials<'_>,
    ) -> Result<Dispatched, DispatchError>;
}

/// Sends mail through an HTTP mail relay authenticated with basic auth.
pub struct RelayMailer {
    http: Client,
    relay_url: String,
    default_user: Option<String>,
    default_password: Option<String>,
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<RelayAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct RelayAttachment {
    filename: String,
    /// Base64 file content for inline attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    /// Filesystem path for attachments the relay reads itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(alias = "messageId")]
    message_id: String,
}

impl RelayMailer {
    pub fn new(
        http: Client,
        relay_url: impl Into<String>,
        default_user: Option<String>,
        default_password: Option<String>,
    ) -> Self {
        Self {
            http,
            relay_url: relay_url.into().trim_end_matches('/').to_string(),
            default_user,
            default_password,
        }
    }

    fn resolve_credentials<'a>(
        &'a self,
        credentials: MailCredentials<'a>,
    ) -> Result<(&'a str, &'a str), DispatchError> {
        let present = |v: &&str| !v.trim().is_empty();
        let user = credentials
            .user
            .filter(present)
            .or(self.default_user.as_deref().filter(present));
        let password = credentials
            .password
            .filter(present)
            .or(self.default_password.as_deref().filter(present));

        match (user, password) {
            (Some(user), Some(password)) => Ok((user, password)),
            _ => Err(DispatchError::CredentialsMissing),
        }
    }

    /// Build the attachment for `path`. Remote files are downloaded and
    /// inlined; a failed download drops the attachment with a warning.
    async fn attachment(&self, path: &str) -> Option<RelayAttachment> {
        let location = match locate(path) {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(path, error = %e, "Skipping unusable attachment path");
                return None;
            }
        };
        let filename = location
            .file_name()
            .unwrap_or_else(|| FALLBACK_ATTACHMENT_NAME.to_string());

        match location {
            ResumeLocation::Remote(url) => match self.download(url.clone()).await {
                Ok(bytes) => Some(RelayAttachment {
                    filename,
                    content: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                    path: None,
                }),
                Err(reason) => {
                    tracing::warn!(url = %url, reason = %reason, "Failed to download attachment, sending without it");
                    None
                }
            },
            ResumeLocation::Local(local) => Some(RelayAttachment {
                filename,
                content: None,
                path: Some(local.display().to_string()),
            }),
        }
    }

    async fn download(&self, url: reqwest::Url) -> Result<Vec<u8>, String> {
        let response = self.http.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl MailDispatcher for RelayMailer {
    async fn send(
        &self,
        email: &OutgoingEmail,
        credentials: MailCredentials<'_>,
    ) -> Result<Dispatched, DispatchError> {
        let (user, password) = self.resolve_credentials(credentials)?;

        let attachments = match email.attachment_path.as_deref() {
            Some(path) => self.attachment(path).await.into_iter().collect(),
            None => Vec::new(),
        };

        let message = RelayMessage {
            from: user,
            to: &email.to,
            subject: &email.subject,
            text: &email.body,
            html: text_to_html(&email.body),
            attachments,
        };

        let response = self
            .http
            .post(format!("{}/send", self.relay_url))
            .basic_auth(user, Some(password))
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Relay {
                status: status.as_u16(),
                message: body,
            });
        }

        let relay: RelayResponse = response.json().await?;
        tracing::info!(message_id = %relay.message_id, to = %email.to, "Email sent");

        Ok(Dispatched {
            message_id: relay.message_id,
        })
    }
}

/// HTML rendition of a plain-text body: line breaks become `<br>`.
pub fn text_to_html(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\n', "<br>")
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("mail relay credentials are not configured (set MAIL_USER and MAIL_PASSWORD)")]
    CredentialsMissing,

    #[error("mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay rejected the message (status {status}): {message}")]
    Relay { status: u16, message: String },
}
