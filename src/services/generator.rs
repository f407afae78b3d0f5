use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2000;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that outputs valid JSON with two fields: subject and body.";

/// Generated email ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// Turns a job description, a prompt template and resume text into an email.
#[async_trait]
pub trait EmailGenerator: Send + Sync {
    async fn generate(
        &self,
        job_description: &str,
        prompt_template: &str,
        resume_text: &str,
        api_key_override: Option<&str>,
    ) -> Result<EmailContent, GenerationError>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiGenerator {
    http: Client,
    base_url: String,
    model: String,
    default_api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl OpenAiGenerator {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        default_api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            default_api_key,
        }
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyContent)
    }
}

#[async_trait]
impl EmailGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        job_description: &str,
        prompt_template: &str,
        resume_text: &str,
        api_key_override: Option<&str>,
    ) -> Result<EmailContent, GenerationError> {
        let api_key = api_key_override
            .filter(|k| !k.trim().is_empty())
            .or(self.default_api_key.as_deref().filter(|k| !k.trim().is_empty()))
            .ok_or(GenerationError::MissingApiKey)?;

        let prompt = build_prompt(job_description, prompt_template, resume_text);
        let raw = self.complete(api_key, &prompt).await?;

        tracing::debug!(chars = raw.len(), model = %self.model, "Generation response received");
        parse_email_content(&raw)
    }
}

/// Compose the single user message sent to the model.
pub fn build_prompt(job_description: &str, prompt_template: &str, resume_text: &str) -> String {
    format!(
        "{prompt_template}\n\n\
         Job Description:\n{job_description}\n\n\
         Resume Content:\n{resume_text}\n\n\
         Please respond ONLY with a JSON object with two fields: \"subject\" and \"body\". \
         The \"subject\" should be a concise professional subject line. \
         The \"body\" should be a personalized professional email body."
    )
}

/// Recover `{subject, body}` from model output.
///
/// Tries the whole (fence-stripped) text first, then the span from the first
/// `{` to the last `}`.
pub fn parse_email_content(raw: &str) -> Result<EmailContent, GenerationError> {
    let text = strip_json_fences(raw);

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(direct) => {
            let candidate = first_json_object(text).ok_or_else(|| {
                GenerationError::Unparseable(format!("no JSON object in model output ({direct})"))
            })?;
            serde_json::from_str(candidate)
                .map_err(|e| GenerationError::Unparseable(e.to_string()))?
        }
    };

    let content: EmailContent =
        serde_json::from_value(value).map_err(|e| GenerationError::InvalidShape(e.to_string()))?;
    let content = EmailContent {
        subject: unescape_newlines(&content.subject),
        body: unescape_newlines(&content.body),
    };

    if content.subject.trim().is_empty() || content.body.trim().is_empty() {
        return Err(GenerationError::InvalidShape(
            "subject and body must be non-empty".to_string(),
        ));
    }

    Ok(content)
}

/// Models sometimes double-escape line breaks, leaving a literal `\n` in the
/// decoded string. Turn those into real newlines and fold CRLF into LF.
fn unescape_newlines(text: &str) -> String {
    text.replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\r\n", "\n")
}

fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));

    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("OpenAI API key is not configured (set OPENAI_API_KEY or pass openai_api_key)")]
    MissingApiKey,

    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("generation API returned no content")]
    EmptyContent,

    #[error("failed to parse JSON from AI response: {0}")]
    Unparseable(String),

    #[error("AI response does not match {{subject, body}}: {0}")]
    InvalidShape(String),
}
