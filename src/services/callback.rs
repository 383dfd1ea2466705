use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::db::store::RecordStore;
use crate::error::ApiError;
use crate::models::api::{AudioCallbackRequest, CallbackAck, DocumentCallbackRequest};
use crate::models::job::{JobEvent, JobKind, JobStatus};

/// Generated audio URLs are time-limited; the expiry is fixed at callback
/// receipt time plus this many hours.
const AUDIO_URL_TTL_HOURS: i64 = 24;

/// Applies terminal transitions from worker callbacks.
///
/// Callbacks are idempotent: a duplicate delivery produces the same final
/// state with no side effect beyond a redundant write. A callback arriving
/// while the record is not `in_progress` is accepted last-write-wins (worker
/// redelivery is expected), only logged as out of order. A store-write
/// failure fails the callback request visibly so the worker's own retry
/// policy can re-deliver.
pub struct CallbackReceiver {
    store: Arc<dyn RecordStore>,
}

impl CallbackReceiver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn apply_audio_callback(
        &self,
        req: AudioCallbackRequest,
    ) -> Result<CallbackAck, ApiError> {
        let notebook_id = req
            .notebook_id
            .ok_or_else(|| ApiError::Validation("notebook_id is required".into()))?;

        let current = self
            .store
            .audio_status(notebook_id)
            .await
            .map_err(|e| ApiError::from_store(e, "notebook", notebook_id))?;

        let succeeded = req.status.as_deref() == Some("success") && req.audio_url.is_some();
        if succeeded {
            self.note_transition(notebook_id, JobKind::AudioOverview, current, JobEvent::Complete);

            let audio_url = req.audio_url.as_deref().unwrap_or_default();
            let expires_at = Utc::now() + Duration::hours(AUDIO_URL_TTL_HOURS);
            self.store
                .apply_audio_result(notebook_id, audio_url, expires_at)
                .await
                .map_err(|e| ApiError::from_store(e, "notebook", notebook_id))?;

            metrics::counter!("relay_jobs_completed", "kind" => JobKind::AudioOverview.as_str())
                .increment(1);
            tracing::info!(notebook_id = %notebook_id, "Audio overview completed");
        } else {
            self.note_transition(notebook_id, JobKind::AudioOverview, current, JobEvent::Fail);

            self.store
                .set_audio_status(notebook_id, JobStatus::Failed, req.error.as_deref())
                .await
                .map_err(|e| ApiError::from_store(e, "notebook", notebook_id))?;

            metrics::counter!("relay_jobs_failed", "kind" => JobKind::AudioOverview.as_str())
                .increment(1);
            tracing::warn!(
                notebook_id = %notebook_id,
                error = req.error.as_deref().unwrap_or("unspecified"),
                "Audio generation failed"
            );
        }

        Ok(CallbackAck { success: true })
    }

    pub async fn apply_document_callback(
        &self,
        req: DocumentCallbackRequest,
    ) -> Result<CallbackAck, ApiError> {
        let source_id = req
            .source_id
            .ok_or_else(|| ApiError::Validation("source_id is required".into()))?;

        let current = self
            .store
            .source_status(source_id)
            .await
            .map_err(|e| ApiError::from_store(e, "source", source_id))?;

        if req.status.as_deref() == Some("success") {
            self.note_transition(source_id, JobKind::DocumentProcessing, current, JobEvent::Complete);

            self.store
                .set_source_status(source_id, JobStatus::Completed, None)
                .await
                .map_err(|e| ApiError::from_store(e, "source", source_id))?;

            metrics::counter!("relay_jobs_completed", "kind" => JobKind::DocumentProcessing.as_str())
                .increment(1);
            tracing::info!(source_id = %source_id, "Document processing completed");
        } else {
            self.note_transition(source_id, JobKind::DocumentProcessing, current, JobEvent::Fail);

            self.store
                .set_source_status(source_id, JobStatus::Failed, req.error.as_deref())
                .await
                .map_err(|e| ApiError::from_store(e, "source", source_id))?;

            metrics::counter!("relay_jobs_failed", "kind" => JobKind::DocumentProcessing.as_str())
                .increment(1);
            tracing::warn!(
                source_id = %source_id,
                error = req.error.as_deref().unwrap_or("unspecified"),
                "Document processing failed"
            );
        }

        Ok(CallbackAck { success: true })
    }

    fn note_transition(&self, id: Uuid, kind: JobKind, current: JobStatus, event: JobEvent) {
        let transition = current.apply(event);
        if !transition.in_order {
            tracing::warn!(
                job_id = %id,
                kind = kind.as_str(),
                from = ?transition.from,
                to = ?transition.to,
                "Callback for a job not in progress, applying last-write-wins"
            );
        }
    }
}
