use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::db::store::StoreError;

/// Failure taxonomy for every handler in the service.
///
/// The HTTP status communicates the class of failure to automated callers;
/// the JSON body carries a human-readable `error` plus, where available, the
/// raw upstream diagnostic under `details` and the upstream HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required request field is absent or unusable. Client-caused.
    #[error("{0}")]
    Validation(String),

    /// Required environment configuration is missing. Operator-caused.
    #[error("{0}")]
    Configuration(String),

    /// The external worker was unreachable or returned a non-success
    /// response. `status` is the upstream HTTP status when one was received.
    #[error("{message}")]
    Upstream {
        message: String,
        status: Option<u16>,
        details: String,
    },

    /// The job id does not resolve in the record store.
    #[error("{entity} not found: {id}")]
    RecordNotFound { entity: &'static str, id: Uuid },

    /// Unexpected failure, e.g. a store write error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Configuration(_) | ApiError::Upstream { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Map a store failure for a specific record into the API taxonomy.
    pub fn from_store(err: StoreError, entity: &'static str, id: Uuid) -> ApiError {
        match err {
            StoreError::NotFound => ApiError::RecordNotFound { entity, id },
            StoreError::Database(e) => ApiError::Internal(format!("record store error: {e}")),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let body = match self {
            ApiError::Upstream {
                message,
                status,
                details,
            } => ErrorBody {
                error: message,
                details: Some(details),
                status,
            },
            other => ErrorBody {
                error: other.to_string(),
                details: None,
                status: None,
            },
        };
        (code, Json(body)).into_response()
    }
}
