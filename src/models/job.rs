use serde::{Deserialize, Serialize};

/// The distinct stateful async task types coordinated by this service.
///
/// Additional-source ingestion and chat relay are stateless per call and
/// carry no persisted status, so they have no kind here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    ContentGeneration,
    AudioOverview,
    DocumentProcessing,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ContentGeneration => "content_generation",
            JobKind::AudioOverview => "audio_overview",
            JobKind::DocumentProcessing => "document_processing",
        }
    }
}

/// Status of an async job in the record store.
///
/// The wire vocabulary differs per job kind (`generating` vs `processing`
/// for the in-flight state) but the shape and transitions are identical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    InProgress,
    Completed,
    Failed,
}

/// Lifecycle events that drive status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    /// A new dispatch cycle starts (also models "regenerate" re-entry).
    Dispatch,
    /// Successful callback or synchronous completion.
    Complete,
    /// Failed callback, dispatch-time failure, or compensating write.
    Fail,
}

/// Result of applying an event to a status.
///
/// Transitions are always applied last-write-wins; `in_order` records
/// whether the transition matched the expected forward lifecycle
/// (`idle → in_progress → completed/failed`, terminal states re-enterable
/// via a new dispatch). Out-of-order transitions are applied anyway, since
/// duplicate worker notifications and network retries are expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: JobStatus,
    pub to: JobStatus,
    pub in_order: bool,
}

impl JobStatus {
    /// Apply a lifecycle event, yielding the next status.
    pub fn apply(self, event: JobEvent) -> Transition {
        let (to, in_order) = match event {
            JobEvent::Dispatch => (JobStatus::InProgress, self != JobStatus::InProgress),
            JobEvent::Complete => (JobStatus::Completed, self == JobStatus::InProgress),
            JobEvent::Fail => (JobStatus::Failed, self == JobStatus::InProgress),
        };
        Transition {
            from: self,
            to,
            in_order,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Column value written to the record store for this status.
    pub fn label(self, kind: JobKind) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::InProgress => match kind {
                JobKind::ContentGeneration | JobKind::AudioOverview => "generating",
                JobKind::DocumentProcessing => "processing",
            },
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a stored column value. Unknown or absent values map to `Idle`,
    /// matching rows that predate their first dispatch.
    pub fn from_label(label: Option<&str>) -> JobStatus {
        match label {
            Some("generating") | Some("processing") => JobStatus::InProgress,
            Some("completed") => JobStatus::Completed,
            Some("failed") => JobStatus::Failed,
            _ => JobStatus::Idle,
        }
    }
}
