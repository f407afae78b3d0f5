use reqwest::{header::CONTENT_TYPE, Client, Url};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::services::pdf::TextExtractor;

/// Where a resume (or attachment) lives.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeLocation {
    Remote(Url),
    Local(PathBuf),
}

impl ResumeLocation {
    /// Last path segment, used as the attachment filename.
    pub fn file_name(&self) -> Option<String> {
        match self {
            ResumeLocation::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            ResumeLocation::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
    }
}

/// Classify a stored `resume_path` as a remote URL or a local file.
///
/// `file://` URLs are normalized to filesystem paths.
pub fn locate(resume_path: &str) -> Result<ResumeLocation, ResumeError> {
    let trimmed = resume_path.trim();
    let lower = trimmed.to_ascii_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        let url = Url::parse(trimmed).map_err(|e| ResumeError::InvalidUrl {
            path: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        return Ok(ResumeLocation::Remote(url));
    }

    if lower.starts_with("file://") {
        let path = Url::parse(trimmed)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .unwrap_or_else(|| PathBuf::from(&trimmed["file://".len()..]));
        return Ok(ResumeLocation::Local(path));
    }

    Ok(ResumeLocation::Local(PathBuf::from(trimmed)))
}

fn has_pdf_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Text substituted when a PDF resume cannot be turned into text.
pub fn placeholder_text(source: &str) -> String {
    format!(
        "PDF resume at {source}: text extraction not available. \
         Please provide a text version of the resume (e.g. .txt)."
    )
}

/// Turns a job's `resume_path` into resume text.
///
/// A missing local file or a failed download is fatal for the job. A PDF whose
/// text cannot be extracted degrades to [`placeholder_text`].
pub struct ResumeResolver {
    http: Client,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl ResumeResolver {
    pub fn new(http: Client, extractor: Option<Arc<dyn TextExtractor>>) -> Self {
        Self { http, extractor }
    }

    pub async fn resolve(&self, resume_path: &str) -> Result<String, ResumeError> {
        match locate(resume_path)? {
            ResumeLocation::Remote(url) => self.fetch_remote(url).await,
            ResumeLocation::Local(path) => self.read_local(path).await,
        }
    }

    async fn fetch_remote(&self, url: Url) -> Result<String, ResumeError> {
        tracing::debug!(url = %url, "Downloading resume");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResumeError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResumeError::Download {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let is_pdf = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"))
            || has_pdf_extension(url.path());

        let bytes = response.bytes().await.map_err(|e| ResumeError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if is_pdf {
            Ok(self.extract_or_placeholder(&bytes, url.as_str()).await)
        } else {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    async fn read_local(&self, path: PathBuf) -> Result<String, ResumeError> {
        let path_str = path.display().to_string();
        tracing::debug!(path = %path_str, "Reading resume from local path");

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(ResumeError::NotFound(path_str)),
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ResumeError::Read {
                path: path_str.clone(),
                source: e,
            })?;

        if has_pdf_extension(&path_str) {
            Ok(self.extract_or_placeholder(&bytes, &path_str).await)
        } else {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    async fn extract_or_placeholder(&self, bytes: &[u8], source: &str) -> String {
        let Some(extractor) = &self.extractor else {
            tracing::warn!(source, "PDF extraction unavailable, using placeholder resume text");
            return placeholder_text(source);
        };

        match extractor.extract(bytes).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(source, "PDF yielded no text, using placeholder resume text");
                placeholder_text(source)
            }
            Err(e) => {
                tracing::warn!(source, error = %e, "PDF extraction failed, using placeholder resume text");
                placeholder_text(source)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    #[error("Resume file not found: {0}")]
    NotFound(String),

    #[error("Failed to read resume file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download resume from {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Invalid resume URL {path}: {reason}")]
    InvalidUrl { path: String, reason: String },
}
