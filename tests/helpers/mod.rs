//! Test helpers: in-process stand-ins for the external collaborators and
//! instrumented job store wrappers.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use uuid::Uuid;

use recruiter_mailer::db::{Claim, JobStore, MemoryJobStore, StoreError};
use recruiter_mailer::models::job::{Job, JobStatus, JobUpdate, NewJob};
use recruiter_mailer::services::generator::{EmailContent, EmailGenerator, GenerationError};
use recruiter_mailer::services::mailer::{
    DispatchError, Dispatched, MailCredentials, MailDispatcher, OutgoingEmail,
};
use recruiter_mailer::services::processor::JobProcessor;
use recruiter_mailer::services::resume::ResumeResolver;

/// Serve `app` on an ephemeral localhost port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("stub server address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server crashed");
    });
    format!("http://{addr}")
}

// ── Text-generation stub (OpenAI-compatible) ─────────────────────────────

#[derive(Clone)]
struct GenerationState {
    api_key: String,
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

pub struct GenerationStub {
    /// Value for `OPENAI_BASE_URL`.
    pub base_url: String,
    /// User prompts received, in order.
    pub prompts: Arc<Mutex<Vec<String>>>,
}

async fn chat_completions(
    State(state): State<GenerationState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let expected = format!("Bearer {}", state.api_key);
    if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "message": "Incorrect API key provided" } })),
        );
    }

    let prompt = body["messages"][1]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    state.prompts.lock().unwrap().push(prompt);

    (
        StatusCode::OK,
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": state.reply } }]
        })),
    )
}

/// Chat completions endpoint accepting only `api_key` and always answering `reply`.
pub async fn spawn_generation_stub(api_key: &str, reply: &str) -> GenerationStub {
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(GenerationState {
            api_key: api_key.to_string(),
            reply: reply.to_string(),
            prompts: prompts.clone(),
        });

    GenerationStub {
        base_url: format!("{}/v1", spawn_server(app).await),
        prompts,
    }
}

// ── Mail relay stub ──────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct RelayState {
    messages: Arc<Mutex<Vec<Value>>>,
    authorizations: Arc<Mutex<Vec<String>>>,
}

pub struct RelayStub {
    pub base_url: String,
    /// JSON messages accepted by the relay.
    pub messages: Arc<Mutex<Vec<Value>>>,
    /// Raw `Authorization` headers received.
    pub authorizations: Arc<Mutex<Vec<String>>>,
}

async fn relay_send(
    State(state): State<RelayState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "auth required" })));
    };
    state.authorizations.lock().unwrap().push(auth.to_string());

    let mut messages = state.messages.lock().unwrap();
    messages.push(body);
    let id = format!("<{}@relay.test>", messages.len());

    (StatusCode::OK, Json(json!({ "messageId": id })))
}

pub async fn spawn_relay_stub() -> RelayStub {
    let state = RelayState::default();
    let messages = state.messages.clone();
    let authorizations = state.authorizations.clone();
    let app = Router::new()
        .route("/send", post(relay_send))
        .with_state(state);

    RelayStub {
        base_url: spawn_server(app).await,
        messages,
        authorizations,
    }
}

// ── Resume host ──────────────────────────────────────────────────────────

#[derive(Clone)]
struct HostState {
    text: String,
    flaky_hits: Arc<AtomicUsize>,
}

/// Serves:
/// - `/resume.txt` as plain text
/// - `/resume.pdf` as `application/pdf` bytes that are not a real PDF
/// - `/flaky/resume.txt` successfully once, then with HTTP 500
/// - anything else as 404
pub async fn spawn_resume_host(text: &str) -> String {
    let app = Router::new()
        .route(
            "/resume.txt",
            get(|State(s): State<HostState>| async move {
                ([(CONTENT_TYPE, "text/plain; charset=utf-8")], s.text)
            }),
        )
        .route(
            "/resume.pdf",
            get(|| async {
                (
                    [(CONTENT_TYPE, "application/pdf")],
                    b"%PDF-1.7 truncated garbage".to_vec(),
                )
            }),
        )
        .route(
            "/flaky/resume.txt",
            get(|State(s): State<HostState>| async move {
                if s.flaky_hits.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::OK, s.text).into_response()
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }),
        )
        .with_state(HostState {
            text: text.to_string(),
            flaky_hits: Arc::new(AtomicUsize::new(0)),
        });

    spawn_server(app).await
}

// ── Fake adapters ────────────────────────────────────────────────────────

/// Generator returning a fixed result without network access.
pub struct FakeGenerator {
    reply: Result<EmailContent, String>,
    pub calls: AtomicUsize,
    pub last_resume: Mutex<Option<String>>,
}

impl FakeGenerator {
    pub fn ok(subject: &str, body: &str) -> Self {
        Self {
            reply: Ok(EmailContent {
                subject: subject.to_string(),
                body: body.to_string(),
            }),
            calls: AtomicUsize::new(0),
            last_resume: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_resume: Mutex::new(None),
        }
    }
}

#[async_trait]
impl EmailGenerator for FakeGenerator {
    async fn generate(
        &self,
        _job_description: &str,
        _prompt_template: &str,
        resume_text: &str,
        _api_key_override: Option<&str>,
    ) -> Result<EmailContent, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_resume.lock().unwrap() = Some(resume_text.to_string());
        self.reply.clone().map_err(|message| GenerationError::Api {
            status: 500,
            message,
        })
    }
}

/// Mailer that records messages and, when watching a store, the largest
/// number of simultaneously `processing` jobs observed while sending.
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub max_processing_seen: AtomicUsize,
    watch: Option<Arc<dyn JobStore>>,
    delay: Duration,
    reject: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            max_processing_seen: AtomicUsize::new(0),
            watch: None,
            delay: Duration::ZERO,
            reject: false,
        }
    }

    /// Always fail with missing credentials.
    pub fn without_credentials() -> Self {
        Self {
            reject: true,
            ..Self::new()
        }
    }

    pub fn watching(store: Arc<dyn JobStore>, delay: Duration) -> Self {
        Self {
            watch: Some(store),
            delay,
            ..Self::new()
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|e| e.to.clone()).collect()
    }
}

#[async_trait]
impl MailDispatcher for RecordingMailer {
    async fn send(
        &self,
        email: &OutgoingEmail,
        _credentials: MailCredentials<'_>,
    ) -> Result<Dispatched, DispatchError> {
        if self.reject {
            return Err(DispatchError::CredentialsMissing);
        }
        if let Some(store) = &self.watch {
            let processing = store
                .list_by_status(JobStatus::Processing)
                .await
                .expect("watch store")
                .len();
            self.max_processing_seen.fetch_max(processing, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(Dispatched {
            message_id: format!("<{}@fake.test>", sent.len()),
        })
    }
}

// ── Instrumented store ───────────────────────────────────────────────────

/// Wraps a [`MemoryJobStore`], counting writes and optionally holding every
/// `list_by_status(queued)` call at a barrier so that concurrent processors
/// all pass the "anything processing?" check before any of them claims.
pub struct InstrumentedStore {
    pub inner: Arc<MemoryJobStore>,
    pub writes: AtomicUsize,
    queued_gate: Option<Barrier>,
}

impl InstrumentedStore {
    pub fn new(inner: Arc<MemoryJobStore>) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
            queued_gate: None,
        }
    }

    pub fn gated(inner: Arc<MemoryJobStore>, parties: usize) -> Self {
        Self {
            queued_gate: Some(Barrier::new(parties)),
            ..Self::new(inner)
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for InstrumentedStore {
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(new_job).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Job, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let jobs = self.inner.list_by_status(status).await?;
        if status == JobStatus::Queued {
            if let Some(gate) = &self.queued_gate {
                gate.wait().await;
            }
        }
        Ok(jobs)
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Job>, StoreError> {
        self.inner.list_by_date(date).await
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(id, update).await
    }

    async fn claim(&self, id: Uuid) -> Result<Claim, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.claim(id).await
    }

    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.fail_stale(cutoff, message).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────

/// Processor over `store` with a network-free resolver (no PDF extractor).
pub fn processor(
    store: Arc<dyn JobStore>,
    generator: Arc<dyn EmailGenerator>,
    mailer: Arc<dyn MailDispatcher>,
) -> JobProcessor {
    JobProcessor::new(
        store,
        Arc::new(ResumeResolver::new(reqwest::Client::new(), None)),
        generator,
        mailer,
    )
}
