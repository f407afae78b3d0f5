use async_trait::async_trait;
use std::time::Duration;

const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Best-effort text extraction from a binary resume document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// PDF text extraction backed by `pdf-extract`.
///
/// Parsing runs on the blocking pool under a timeout. A panic inside the
/// parser surfaces as [`ExtractionError::Crashed`] instead of unwinding into
/// the caller.
pub struct PdfTextExtractor {
    timeout: Duration,
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new(EXTRACTION_TIMEOUT)
    }
}

impl PdfTextExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let data = bytes.to_vec();

        let text = tokio::time::timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data)),
        )
        .await
        .map_err(|_| ExtractionError::TimedOut(self.timeout))?
        .map_err(|e| ExtractionError::Crashed(e.to_string()))?
        .map_err(|e| ExtractionError::Failed(e.to_string()))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractionError::NoText);
        }

        tracing::debug!(chars = text.len(), "PDF text extraction complete");
        Ok(text.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("extraction failed: {0}")]
    Failed(String),

    #[error("extractor crashed: {0}")]
    Crashed(String),

    #[error("extraction timed out after {0:?}")]
    TimedOut(Duration),

    #[error("document contains no extractable text")]
    NoText,
}
