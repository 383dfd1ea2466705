use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::job::{JobKind, JobStatus};
use crate::models::notebook::GeneratedContent;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Thin interface over the persistent job records, keyed by id.
///
/// All updates are unconditional last-write-wins; the store offers no
/// compare-and-swap at this layer, and this service never deletes records.
/// Result fields are written only together with the `completed` status and
/// error details only together with `failed`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store connectivity probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn generation_status(&self, notebook_id: Uuid) -> Result<JobStatus, StoreError>;
    async fn set_generation_status(
        &self,
        notebook_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError>;
    /// Write the generated content and mark generation `completed`.
    async fn apply_generated_content(
        &self,
        notebook_id: Uuid,
        content: &GeneratedContent,
    ) -> Result<(), StoreError>;

    async fn audio_status(&self, notebook_id: Uuid) -> Result<JobStatus, StoreError>;
    async fn set_audio_status(
        &self,
        notebook_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError>;
    /// Write the audio result and mark the audio overview `completed`.
    async fn apply_audio_result(
        &self,
        notebook_id: Uuid,
        audio_url: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn source_status(&self, source_id: Uuid) -> Result<JobStatus, StoreError>;
    async fn set_source_status(
        &self,
        source_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError>;
    /// Stored text content for a notebook's source, used to build inline
    /// dispatch payloads when no file reference exists.
    async fn source_content(&self, notebook_id: Uuid) -> Result<Option<String>, StoreError>;
}

/// PostgreSQL-backed record store.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn require_row(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn generation_status(&self, notebook_id: Uuid) -> Result<JobStatus, StoreError> {
        let row = sqlx::query("SELECT generation_status FROM notebooks WHERE id = $1")
            .bind(notebook_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        let label: Option<String> = row.try_get("generation_status")?;
        Ok(JobStatus::from_label(label.as_deref()))
    }

    async fn set_generation_status(
        &self,
        notebook_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notebooks
            SET generation_status = $1,
                generation_error = $2,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status.label(JobKind::ContentGeneration))
        .bind(error_detail)
        .bind(notebook_id)
        .execute(&self.pool)
        .await?;

        require_row(result.rows_affected())
    }

    async fn apply_generated_content(
        &self,
        notebook_id: Uuid,
        content: &GeneratedContent,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notebooks
            SET title = $1,
                description = $2,
                icon = $3,
                color = $4,
                example_questions = $5,
                generation_status = 'completed',
                generation_error = NULL,
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&content.title)
        .bind(&content.description)
        .bind(&content.icon)
        .bind(&content.color)
        .bind(&content.example_questions)
        .bind(notebook_id)
        .execute(&self.pool)
        .await?;

        require_row(result.rows_affected())
    }

    async fn audio_status(&self, notebook_id: Uuid) -> Result<JobStatus, StoreError> {
        let row = sqlx::query("SELECT audio_overview_generation_status FROM notebooks WHERE id = $1")
            .bind(notebook_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        let label: Option<String> = row.try_get("audio_overview_generation_status")?;
        Ok(JobStatus::from_label(label.as_deref()))
    }

    async fn set_audio_status(
        &self,
        notebook_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notebooks
            SET audio_overview_generation_status = $1,
                audio_generation_error = $2,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status.label(JobKind::AudioOverview))
        .bind(error_detail)
        .bind(notebook_id)
        .execute(&self.pool)
        .await?;

        require_row(result.rows_affected())
    }

    async fn apply_audio_result(
        &self,
        notebook_id: Uuid,
        audio_url: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notebooks
            SET audio_overview_url = $1,
                audio_url_expires_at = $2,
                audio_overview_generation_status = 'completed',
                audio_generation_error = NULL,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(audio_url)
        .bind(expires_at)
        .bind(notebook_id)
        .execute(&self.pool)
        .await?;

        require_row(result.rows_affected())
    }

    async fn source_status(&self, source_id: Uuid) -> Result<JobStatus, StoreError> {
        let row = sqlx::query("SELECT processing_status FROM sources WHERE id = $1")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        let label: Option<String> = row.try_get("processing_status")?;
        Ok(JobStatus::from_label(label.as_deref()))
    }

    async fn set_source_status(
        &self,
        source_id: Uuid,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sources
            SET processing_status = $1,
                processing_error = $2,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status.label(JobKind::DocumentProcessing))
        .bind(error_detail)
        .bind(source_id)
        .execute(&self.pool)
        .await?;

        require_row(result.rows_affected())
    }

    async fn source_content(&self, notebook_id: Uuid) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            "SELECT content FROM sources WHERE notebook_id = $1 ORDER BY created_at ASC LIMIT 1",
        )
        .bind(notebook_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(r.try_get("content")?),
            None => Ok(None),
        }
    }
}
