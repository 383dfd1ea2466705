//! Shared helpers: in-memory record store, stub worker server, and app
//! spawning for exercising the HTTP surface end to end.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::time::sleep;
use uuid::Uuid;

use notebook_relay::app_state::AppState;
use notebook_relay::config::AppConfig;
use notebook_relay::db::store::{RecordStore, StoreError};
use notebook_relay::models::job::{JobKind, JobStatus};
use notebook_relay::models::notebook::GeneratedContent;
use notebook_relay::services::webhook::WebhookClient;

#[derive(Debug, Default, Clone)]
pub struct NotebookRow {
    pub generation_status: Option<String>,
    pub generation_error: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub example_questions: Vec<String>,
    pub audio_status: Option<String>,
    pub audio_error: Option<String>,
    pub audio_url: Option<String>,
    pub audio_url_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone)]
pub struct SourceRow {
    pub notebook_id: Uuid,
    pub processing_status: Option<String>,
    pub processing_error: Option<String>,
    pub content: Option<String>,
}

/// In-memory record store mirroring the PostgreSQL adapter's semantics:
/// unconditional last-write updates, `NotFound` for unknown ids.
#[derive(Default)]
pub struct MemoryStore {
    pub notebooks: Mutex<HashMap<Uuid, NotebookRow>>,
    pub sources: Mutex<HashMap<Uuid, SourceRow>>,
    /// Counts every status/result write, for "no store write" assertions.
    pub writes: AtomicUsize,
    /// When set, all writes fail, to exercise store-failure paths.
    pub fail_writes: AtomicBool,
    /// When set, source content reads fail, leaving status reads and
    /// writes intact.
    pub fail_content_reads: AtomicBool,
}

impl MemoryStore {
    pub fn insert_notebook(&self, id: Uuid) {
        self.notebooks
            .lock()
            .unwrap()
            .insert(id, NotebookRow::default());
    }

    pub fn insert_source(&self, id: Uuid, notebook_id: Uuid, content: Option<&str>) {
        self.sources.lock().unwrap().insert(
            id,
            SourceRow {
                notebook_id,
                content: content.map(String::from),
                ..SourceRow::default()
            },
        );
    }

    pub fn notebook(&self, id: Uuid) -> NotebookRow {
        self.notebooks.lock().unwrap().get(&id).unwrap().clone()
    }

    pub fn source(&self, id: Uuid) -> SourceRow {
        self.sources.lock().unwrap().get(&id).unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn generation_status(&self, notebook_id: Uuid) -> Result<JobStatus, StoreError> {
        let notebooks = self.notebooks.lock().unwrap();
        let row = notebooks.get(&notebook_id).ok_or(StoreError::NotFound)?;
        Ok(JobStatus::from_label(row.generation_status.as_deref()))
    }

    async fn set_generation_status(
        &self,
        notebook_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError> {
        self.record_write()?;
        let mut notebooks = self.notebooks.lock().unwrap();
        let row = notebooks.get_mut(&notebook_id).ok_or(StoreError::NotFound)?;
        row.generation_status = Some(status.label(JobKind::ContentGeneration).to_string());
        row.generation_error = error_detail.map(String::from);
        Ok(())
    }

    async fn apply_generated_content(
        &self,
        notebook_id: Uuid,
        content: &GeneratedContent,
    ) -> Result<(), StoreError> {
        self.record_write()?;
        let mut notebooks = self.notebooks.lock().unwrap();
        let row = notebooks.get_mut(&notebook_id).ok_or(StoreError::NotFound)?;
        row.title = Some(content.title.clone());
        row.description = content.description.clone();
        row.icon = Some(content.icon.clone());
        row.color = Some(content.color.clone());
        row.example_questions = content.example_questions.clone();
        row.generation_status = Some("completed".to_string());
        row.generation_error = None;
        Ok(())
    }

    async fn audio_status(&self, notebook_id: Uuid) -> Result<JobStatus, StoreError> {
        let notebooks = self.notebooks.lock().unwrap();
        let row = notebooks.get(&notebook_id).ok_or(StoreError::NotFound)?;
        Ok(JobStatus::from_label(row.audio_status.as_deref()))
    }

    async fn set_audio_status(
        &self,
        notebook_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError> {
        self.record_write()?;
        let mut notebooks = self.notebooks.lock().unwrap();
        let row = notebooks.get_mut(&notebook_id).ok_or(StoreError::NotFound)?;
        row.audio_status = Some(status.label(JobKind::AudioOverview).to_string());
        row.audio_error = error_detail.map(String::from);
        Ok(())
    }

    async fn apply_audio_result(
        &self,
        notebook_id: Uuid,
        audio_url: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.record_write()?;
        let mut notebooks = self.notebooks.lock().unwrap();
        let row = notebooks.get_mut(&notebook_id).ok_or(StoreError::NotFound)?;
        row.audio_url = Some(audio_url.to_string());
        row.audio_url_expires_at = Some(expires_at);
        row.audio_status = Some("completed".to_string());
        row.audio_error = None;
        Ok(())
    }

    async fn source_status(&self, source_id: Uuid) -> Result<JobStatus, StoreError> {
        let sources = self.sources.lock().unwrap();
        let row = sources.get(&source_id).ok_or(StoreError::NotFound)?;
        Ok(JobStatus::from_label(row.processing_status.as_deref()))
    }

    async fn set_source_status(
        &self,
        source_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError> {
        self.record_write()?;
        let mut sources = self.sources.lock().unwrap();
        let row = sources.get_mut(&source_id).ok_or(StoreError::NotFound)?;
        row.processing_status = Some(status.label(JobKind::DocumentProcessing).to_string());
        row.processing_error = error_detail.map(String::from);
        Ok(())
    }

    async fn source_content(&self, notebook_id: Uuid) -> Result<Option<String>, StoreError> {
        if self.fail_content_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        let sources = self.sources.lock().unwrap();
        Ok(sources
            .values()
            .find(|s| s.notebook_id == notebook_id)
            .and_then(|s| s.content.clone()))
    }
}

/// A webhook request captured by the stub worker.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub n8n_auth: Option<String>,
    pub body: serde_json::Value,
}

/// Stand-in for an external worker: records every request and answers with a
/// fixed status and body.
pub struct StubWorker {
    pub url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubWorker {
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until the worker has received at least `n` requests.
    pub async fn wait_for_requests(&self, n: usize) -> Vec<CapturedRequest> {
        for _ in 0..100 {
            let requests = self.requests();
            if requests.len() >= n {
                return requests;
            }
            sleep(Duration::from_millis(20)).await;
        }
        panic!("stub worker did not receive {n} request(s)");
    }
}

pub async fn spawn_stub_worker(status: u16, reply_body: &str) -> StubWorker {
    let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let reply = reply_body.to_string();

    let app = Router::new().route(
        "/webhook",
        post({
            let requests = Arc::clone(&requests);
            move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let requests = Arc::clone(&requests);
                let reply = reply.clone();
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(String::from)
                    };
                    requests.lock().unwrap().push(CapturedRequest {
                        authorization: header("Authorization"),
                        n8n_auth: header("X-N8N-Webhook-Auth"),
                        body,
                    });
                    (StatusCode::from_u16(status).unwrap(), reply)
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub worker");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub worker error");
    });

    StubWorker {
        url: format!("http://{addr}/webhook"),
        requests,
    }
}

/// Config pointing every job kind at the same worker URL.
pub fn test_config(worker_url: &str) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: "postgres://unused".to_string(),
        public_base_url: Some("http://relay.test".to_string()),
        notebook_generation_url: Some(worker_url.to_string()),
        audio_generation_webhook_url: Some(worker_url.to_string()),
        document_processing_webhook_url: Some(worker_url.to_string()),
        additional_sources_webhook_url: Some(worker_url.to_string()),
        notebook_chat_url: Some(worker_url.to_string()),
        notebook_generation_auth: Some("test-secret".to_string()),
        webhook_timeout_secs: 5,
    }
}

pub struct TestApp {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Serve the relay on an ephemeral port with an in-memory store.
pub async fn spawn_app(config: AppConfig) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let webhook = WebhookClient::new(Duration::from_secs(config.webhook_timeout_secs))
        .expect("Failed to build webhook client");
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        webhook,
        Arc::new(config),
    );
    let app = notebook_relay::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test app");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test app error");
    });

    TestApp {
        base_url: format!("http://{addr}"),
        store,
        client: reqwest::Client::new(),
    }
}

/// Poll until the condition holds or a short deadline passes.
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}
