use s3::creds::Credentials;
use s3::{Bucket, Region};
use uuid::Uuid;

/// S3-compatible object storage (Cloudflare R2) holding uploaded resumes.
///
/// Uploaded objects are served from `public_base_url`, and that URL is what
/// jobs store as their `resume_path`.
pub struct ResumeStorage {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl ResumeStorage {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        public_base_url: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials =
            Credentials::new(Some(access_key), Some(secret_key), None, None, None)
                .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upload resume bytes under `key`.
    pub async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await?;

        let code = response.status_code();
        if !(200..300).contains(&code) {
            return Err(StorageError::Rejected(code));
        }
        Ok(())
    }

    /// Publicly fetchable URL of `key`.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// Object key for an uploaded resume: `resumes/<owner>/<uuid>-<filename>`.
pub fn resume_key(owner: &str, filename: &str) -> String {
    let owner = sanitize_segment(owner);
    let filename = sanitize_segment(filename);
    let owner = if owner.is_empty() { "anonymous".to_string() } else { owner };
    let filename = if filename.is_empty() { "resume".to_string() } else { filename };
    format!("resumes/{owner}/{}-{filename}", Uuid::new_v4())
}

/// Keep key segments to a conservative URL-safe alphabet.
fn sanitize_segment(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            '@' => '_',
            _ => '-',
        })
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '-')
        .to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("object storage rejected upload with status {0}")]
    Rejected(u16),

    #[error("Storage configuration error: {0}")]
    Config(String),
}
