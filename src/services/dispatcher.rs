use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::store::RecordStore;
use crate::error::ApiError;
use crate::models::api::{
    AdditionalSourcesRequest, AdditionalSourcesResponse, ChatMessageRequest, ChatMessageResponse,
    GenerateAudioRequest, GenerateAudioResponse, GenerateContentRequest, GenerateContentResponse,
    ProcessDocumentRequest, ProcessDocumentResponse,
};
use crate::models::job::{JobEvent, JobKind, JobStatus};
use crate::models::notebook::ContentEnvelope;
use crate::services::webhook::{AuthHeader, UpstreamClass, WebhookClient, WebhookError};

/// Inline content is truncated to this many characters before transmission,
/// keeping dispatch payload size predictable.
pub const MAX_INLINE_CONTENT_CHARS: usize = 5000;

/// Reference to the job record a dispatch cycle mutates, funnelling the
/// per-kind status columns through one write path.
#[derive(Debug, Clone, Copy)]
enum JobRef {
    NotebookGeneration(Uuid),
    NotebookAudio(Uuid),
    Source(Uuid),
}

impl JobRef {
    fn kind(self) -> JobKind {
        match self {
            JobRef::NotebookGeneration(_) => JobKind::ContentGeneration,
            JobRef::NotebookAudio(_) => JobKind::AudioOverview,
            JobRef::Source(_) => JobKind::DocumentProcessing,
        }
    }

    fn id(self) -> Uuid {
        match self {
            JobRef::NotebookGeneration(id) | JobRef::NotebookAudio(id) | JobRef::Source(id) => id,
        }
    }

    fn entity(self) -> &'static str {
        match self {
            JobRef::NotebookGeneration(_) | JobRef::NotebookAudio(_) => "notebook",
            JobRef::Source(_) => "source",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentGenerationPayload {
    source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Serialize)]
struct AudioGenerationPayload {
    notebook_id: Uuid,
    callback_url: String,
}

#[derive(Serialize)]
struct DocumentProcessingPayload {
    source_id: Uuid,
    file_url: String,
    file_path: String,
    source_type: String,
    callback_url: String,
}

/// Tagged payload for the additional-sources worker, keyed by source type.
#[derive(Serialize)]
#[serde(tag = "type")]
enum AdditionalSourcesPayload {
    #[serde(rename = "multiple-websites", rename_all = "camelCase")]
    MultipleWebsites {
        notebook_id: Uuid,
        urls: Vec<String>,
        source_ids: Vec<Uuid>,
        timestamp: String,
    },
    #[serde(rename = "copied-text", rename_all = "camelCase")]
    CopiedText {
        notebook_id: Uuid,
        title: String,
        content: String,
        source_id: Option<Uuid>,
        timestamp: String,
    },
}

#[derive(Serialize)]
struct ChatRelayPayload {
    session_id: String,
    message: String,
    user_id: String,
    timestamp: String,
}

/// Validates dispatch requests, records intent in the store, and hands work
/// to the external workers over webhook calls.
///
/// Every stateful dispatch writes `in_progress` synchronously before the
/// outbound call, so a crash or timeout mid-call leaves a visible
/// non-terminal state rather than silence. Every failure path attempts a
/// compensating `failed` write; a second failure there is only logged.
pub struct Dispatcher {
    store: Arc<dyn RecordStore>,
    webhook: Arc<WebhookClient>,
    config: Arc<AppConfig>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RecordStore>,
        webhook: Arc<WebhookClient>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            webhook,
            config,
        }
    }

    /// Dispatch notebook content generation and wait for the worker's
    /// result. This job kind completes synchronously: the worker returns the
    /// generated content in its response, and the terminal transition is
    /// applied before replying to the caller.
    pub async fn generate_notebook_content(
        &self,
        req: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiError> {
        let notebook_id = req
            .notebook_id
            .ok_or_else(|| ApiError::Validation("notebookId and sourceType are required".into()))?;
        let source_type = req
            .source_type
            .ok_or_else(|| ApiError::Validation("notebookId and sourceType are required".into()))?;

        let job = JobRef::NotebookGeneration(notebook_id);

        let (url, secret) = match self.target(
            self.config.notebook_generation_url.as_deref(),
            "Web service configuration missing",
        ) {
            Ok(t) => t,
            Err(e) => {
                self.fail_best_effort(job, "web service configuration missing")
                    .await;
                return Err(e);
            }
        };

        self.begin(job).await?;

        let content = if req.file_path.is_none() {
            // Inline text sources carry their content from the store. The
            // record is already in_progress here, so a failed read must
            // transition it to failed like any other post-dispatch failure.
            let stored = match self.store.source_content(notebook_id).await {
                Ok(s) => s,
                Err(e) => {
                    let err = ApiError::from_store(e, "source", notebook_id);
                    self.fail_best_effort(job, &err.to_string()).await;
                    return Err(err);
                }
            };
            stored.map(|c| truncate_chars(&c, MAX_INLINE_CONTENT_CHARS).to_string())
        } else {
            None
        };

        let payload = ContentGenerationPayload {
            source_type,
            file_path: req.file_path,
            content,
        };

        tracing::info!(notebook_id = %notebook_id, "Dispatching content generation");

        let reply = match self
            .webhook
            .post_json(&url, AuthHeader::Authorization, &secret, &payload)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let err = upstream_error("Failed to generate content from web service", e);
                self.fail_best_effort(job, &err.to_string()).await;
                return Err(err);
            }
        };

        let envelope: ContentEnvelope = match reply
            .json()
            .and_then(serde_json::from_value::<ContentEnvelope>)
        {
            Ok(env) => env,
            Err(_) => {
                let msg = "Invalid response format from web service";
                self.fail_best_effort(job, msg).await;
                return Err(ApiError::Internal(msg.into()));
            }
        };

        let Some(content) = envelope.output.and_then(|o| o.into_content()) else {
            let msg = "No title in web service response";
            self.fail_best_effort(job, msg).await;
            return Err(ApiError::Internal(msg.into()));
        };

        self.store
            .apply_generated_content(notebook_id, &content)
            .await
            .map_err(|e| ApiError::from_store(e, "notebook", notebook_id))?;

        metrics::counter!("relay_jobs_completed", "kind" => job.kind().as_str()).increment(1);
        tracing::info!(notebook_id = %notebook_id, title = %content.title, "Notebook content generated");

        Ok(GenerateContentResponse {
            success: true,
            title: content.title,
            description: content.description,
            icon: content.icon,
            color: content.color,
            example_questions: content.example_questions,
            message: "Notebook content generated successfully".into(),
        })
    }

    /// Dispatch audio overview generation. The outbound call runs detached:
    /// the caller gets an immediate response once the record shows
    /// `in_progress`, and the call's own failure path transitions the record
    /// to `failed` out-of-band. Completion arrives later via the callback.
    pub async fn generate_audio_overview(
        &self,
        req: GenerateAudioRequest,
    ) -> Result<GenerateAudioResponse, ApiError> {
        let notebook_id = req
            .notebook_id
            .ok_or_else(|| ApiError::Validation("notebookId is required".into()))?;

        let job = JobRef::NotebookAudio(notebook_id);

        let target = self
            .target(
                self.config.audio_generation_webhook_url.as_deref(),
                "Audio generation service not configured",
            )
            .and_then(|t| Ok((t, self.callback_url("audio-generation-callback")?)));
        let ((url, secret), callback_url) = match target {
            Ok(t) => t,
            Err(e) => {
                self.fail_best_effort(job, "audio generation service not configured")
                    .await;
                return Err(e);
            }
        };

        self.begin(job).await?;

        tracing::info!(notebook_id = %notebook_id, "Starting audio overview generation");

        let payload = AudioGenerationPayload {
            notebook_id,
            callback_url,
        };
        let store = Arc::clone(&self.store);
        let webhook = Arc::clone(&self.webhook);

        // Detached continuation: must run to completion even though the HTTP
        // response below is sent without awaiting it. Process teardown while
        // this is in flight can orphan the record at in_progress.
        tokio::spawn(async move {
            match webhook
                .post_json(&url, AuthHeader::XN8nWebhookAuth, &secret, &payload)
                .await
            {
                Ok(_) => {
                    tracing::info!(notebook_id = %notebook_id, "Audio generation webhook accepted");
                }
                Err(e) => {
                    tracing::warn!(notebook_id = %notebook_id, error = %e, "Audio generation webhook failed");
                    metrics::counter!("relay_jobs_failed", "kind" => JobKind::AudioOverview.as_str())
                        .increment(1);
                    if let Err(write_err) = store
                        .set_audio_status(notebook_id, JobStatus::Failed, Some(&e.details()))
                        .await
                    {
                        tracing::error!(
                            notebook_id = %notebook_id,
                            error = %write_err,
                            "Failed to record audio dispatch failure"
                        );
                    }
                }
            }
        });

        Ok(GenerateAudioResponse {
            success: true,
            message: "Audio generation started".into(),
            status: "generating".into(),
        })
    }

    /// Dispatch document processing. The worker acknowledges synchronously;
    /// the terminal transition arrives later through its callback, so a
    /// successful dispatch leaves the source at `in_progress`.
    pub async fn process_document(
        &self,
        req: ProcessDocumentRequest,
    ) -> Result<ProcessDocumentResponse, ApiError> {
        let (source_id, file_path, source_type) =
            match (req.source_id, req.file_path, req.source_type) {
                (Some(id), Some(path), Some(kind)) => (id, path, kind),
                _ => {
                    return Err(ApiError::Validation(
                        "sourceId, filePath and sourceType are required".into(),
                    ))
                }
            };

        let job = JobRef::Source(source_id);

        let Some(url) = self.config.document_processing_webhook_url.clone() else {
            self.fail_best_effort(job, "document processing webhook not configured")
                .await;
            return Err(ApiError::Configuration(
                "Document processing webhook not configured".into(),
            ));
        };
        let Some(secret) = self.config.notebook_generation_auth.clone() else {
            self.fail_best_effort(job, "authentication not configured")
                .await;
            return Err(ApiError::Configuration(
                "Authentication not configured for document processing".into(),
            ));
        };
        let callback_url = match self.callback_url("process-document-callback") {
            Ok(u) => u,
            Err(e) => {
                self.fail_best_effort(job, "callback base URL not configured")
                    .await;
                return Err(e);
            }
        };

        self.begin(job).await?;

        let payload = DocumentProcessingPayload {
            source_id,
            file_url: self.public_file_url(&file_path),
            file_path,
            source_type,
            callback_url,
        };

        tracing::info!(source_id = %source_id, "Dispatching document processing");

        let reply = match self
            .webhook
            .post_json(&url, AuthHeader::Authorization, &secret, &payload)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let err = upstream_error("Document processing failed", e);
                self.fail_best_effort(job, &err.to_string()).await;
                return Err(err);
            }
        };

        let result = match reply.json() {
            Ok(v) => v,
            Err(_) => {
                let msg = "Invalid response from document processing webhook";
                self.fail_best_effort(job, msg).await;
                return Err(ApiError::Internal(msg.into()));
            }
        };

        Ok(ProcessDocumentResponse {
            success: true,
            message: "Document processing initiated".into(),
            result,
        })
    }

    /// Relay additional sources (website lists or copied text) to the
    /// ingestion worker. Stateless per call: no record transition here, the
    /// worker reports per-source progress through document callbacks.
    pub async fn process_additional_sources(
        &self,
        req: AdditionalSourcesRequest,
    ) -> Result<AdditionalSourcesResponse, ApiError> {
        let kind = req
            .kind
            .ok_or_else(|| ApiError::Validation("type is required".into()))?;
        let notebook_id = req
            .notebook_id
            .ok_or_else(|| ApiError::Validation("notebookId is required".into()))?;
        let timestamp = req
            .timestamp
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let payload = match kind.as_str() {
            "multiple-websites" => AdditionalSourcesPayload::MultipleWebsites {
                notebook_id,
                urls: req
                    .urls
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| ApiError::Validation("urls are required".into()))?,
                source_ids: req
                    .source_ids
                    .ok_or_else(|| ApiError::Validation("sourceIds are required".into()))?,
                timestamp,
            },
            "copied-text" => AdditionalSourcesPayload::CopiedText {
                notebook_id,
                title: req
                    .title
                    .ok_or_else(|| ApiError::Validation("title is required".into()))?,
                content: req
                    .content
                    .ok_or_else(|| ApiError::Validation("content is required".into()))?,
                source_id: req.source_ids.and_then(|ids| ids.first().copied()),
                timestamp,
            },
            other => {
                return Err(ApiError::Validation(format!("Unsupported type: {other}")));
            }
        };

        let (url, secret) = self.target(
            self.config.additional_sources_webhook_url.as_deref(),
            "Additional sources webhook not configured",
        )?;

        tracing::info!(notebook_id = %notebook_id, kind = %kind, "Relaying additional sources");

        let reply = self
            .webhook
            .post_json(&url, AuthHeader::Authorization, &secret, &payload)
            .await
            .map_err(|e| upstream_error("Webhook request failed", e))?;

        Ok(AdditionalSourcesResponse {
            success: true,
            message: format!("{kind} data sent to webhook successfully"),
            webhook_response: reply.body,
        })
    }

    /// Relay a chat message and return the worker's JSON verbatim. Stateless
    /// per call: no record transition in either direction.
    pub async fn send_chat_message(
        &self,
        req: ChatMessageRequest,
    ) -> Result<ChatMessageResponse, ApiError> {
        let (session_id, message, user_id) = match (req.session_id, req.message, req.user_id) {
            (Some(s), Some(m), Some(u)) => (s, m, u),
            _ => {
                return Err(ApiError::Validation(
                    "session_id, message and user_id are required".into(),
                ))
            }
        };

        let (url, secret) = self.target(
            self.config.notebook_chat_url.as_deref(),
            "Chat webhook not configured",
        )?;

        let payload = ChatRelayPayload {
            session_id,
            message,
            user_id,
            timestamp: Utc::now().to_rfc3339(),
        };

        let reply = self
            .webhook
            .post_json(&url, AuthHeader::Authorization, &secret, &payload)
            .await
            .map_err(|e| upstream_error("Failed to send message to webhook", e))?;

        let data = reply
            .json()
            .map_err(|_| ApiError::Internal("Invalid response from chat webhook".into()))?;

        Ok(ChatMessageResponse {
            success: true,
            data,
        })
    }

    /// Resolve the outbound URL and shared secret for a job kind.
    fn target(
        &self,
        url: Option<&str>,
        missing_msg: &str,
    ) -> Result<(String, String), ApiError> {
        match (url, self.config.notebook_generation_auth.as_deref()) {
            (Some(u), Some(s)) => Ok((u.to_string(), s.to_string())),
            _ => Err(ApiError::Configuration(missing_msg.into())),
        }
    }

    fn callback_url(&self, route: &str) -> Result<String, ApiError> {
        let base = self
            .config
            .public_base_url
            .as_deref()
            .ok_or_else(|| ApiError::Configuration("Public base URL not configured".into()))?;
        Ok(format!("{}/api/v1/{}", base.trim_end_matches('/'), route))
    }

    fn public_file_url(&self, file_path: &str) -> String {
        match self.config.public_base_url.as_deref() {
            Some(base) => format!("{}/storage/sources/{}", base.trim_end_matches('/'), file_path),
            None => file_path.to_string(),
        }
    }

    /// Transition the record to `in_progress` before the outbound call.
    async fn begin(&self, job: JobRef) -> Result<(), ApiError> {
        let current = self
            .current_status(job)
            .await
            .map_err(|e| ApiError::from_store(e, job.entity(), job.id()))?;

        let transition = current.apply(JobEvent::Dispatch);
        if !transition.in_order {
            tracing::warn!(
                job_id = %job.id(),
                kind = job.kind().as_str(),
                from = ?transition.from,
                "Redispatch over an in-flight job, applying last-write-wins"
            );
        }

        self.write_status(job, transition.to, None)
            .await
            .map_err(|e| ApiError::from_store(e, job.entity(), job.id()))?;

        metrics::counter!("relay_jobs_dispatched", "kind" => job.kind().as_str()).increment(1);
        Ok(())
    }

    async fn current_status(
        &self,
        job: JobRef,
    ) -> Result<JobStatus, crate::db::store::StoreError> {
        match job {
            JobRef::NotebookGeneration(id) => self.store.generation_status(id).await,
            JobRef::NotebookAudio(id) => self.store.audio_status(id).await,
            JobRef::Source(id) => self.store.source_status(id).await,
        }
    }

    async fn write_status(
        &self,
        job: JobRef,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), crate::db::store::StoreError> {
        match job {
            JobRef::NotebookGeneration(id) => {
                self.store
                    .set_generation_status(id, status, error_detail)
                    .await
            }
            JobRef::NotebookAudio(id) => {
                self.store.set_audio_status(id, status, error_detail).await
            }
            JobRef::Source(id) => self.store.set_source_status(id, status, error_detail).await,
        }
    }

    /// Compensating `failed` write on a dispatch failure path. Best effort:
    /// a failure here is logged, never retried, and never masks the error
    /// already being returned to the caller.
    async fn fail_best_effort(&self, job: JobRef, detail: &str) {
        metrics::counter!("relay_jobs_failed", "kind" => job.kind().as_str()).increment(1);
        if let Err(e) = self.write_status(job, JobStatus::Failed, Some(detail)).await {
            tracing::error!(
                job_id = %job.id(),
                kind = job.kind().as_str(),
                error = %e,
                "Failed to record job failure"
            );
        }
    }
}

/// Map a webhook failure to the user-facing upstream error, with the
/// kind-specific generic message when the status fits no known class.
fn upstream_error(generic_msg: &str, err: WebhookError) -> ApiError {
    let message = match err.classify() {
        UpstreamClass::AuthRejected => {
            "Authentication failed - please check webhook configuration".to_string()
        }
        UpstreamClass::Transient => "External service error - please try again later".to_string(),
        UpstreamClass::Generic | UpstreamClass::Transport => generic_msg.to_string(),
    };
    ApiError::Upstream {
        message,
        status: err.upstream_status(),
        details: err.details(),
    }
}

/// Truncate to a maximum number of characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_content_alone() {
        assert_eq!(truncate_chars("short", MAX_INLINE_CONTENT_CHARS), "short");
    }

    #[test]
    fn truncate_cuts_at_char_count() {
        let long = "a".repeat(MAX_INLINE_CONTENT_CHARS + 100);
        assert_eq!(
            truncate_chars(&long, MAX_INLINE_CONTENT_CHARS).len(),
            MAX_INLINE_CONTENT_CHARS
        );
    }

    #[test]
    fn truncate_respects_multibyte_boundaries() {
        let s = "é".repeat(10);
        let cut = truncate_chars(&s, 3);
        assert_eq!(cut.chars().count(), 3);
        assert_eq!(cut, "ééé");
    }

    #[test]
    fn upstream_error_messages_by_class() {
        let auth = upstream_error(
            "generic",
            WebhookError::Status {
                status: 401,
                body: "denied".into(),
            },
        );
        assert!(auth.to_string().contains("Authentication failed"));

        let transient = upstream_error(
            "generic",
            WebhookError::Status {
                status: 503,
                body: String::new(),
            },
        );
        assert!(transient.to_string().contains("try again later"));

        let generic = upstream_error(
            "Document processing failed",
            WebhookError::Status {
                status: 404,
                body: String::new(),
            },
        );
        assert_eq!(generic.to_string(), "Document processing failed");
    }

    #[test]
    fn additional_sources_payload_serializes_with_type_tag() {
        let payload = AdditionalSourcesPayload::CopiedText {
            notebook_id: Uuid::nil(),
            title: "Notes".into(),
            content: "pasted".into(),
            source_id: None,
            timestamp: "2026-01-01T00:00:00Z".into(),
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["type"], "copied-text");
        assert_eq!(v["title"], "Notes");
        assert_eq!(v["notebookId"], Uuid::nil().to_string());
    }
}
