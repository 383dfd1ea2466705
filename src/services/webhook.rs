use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

/// Header carrying the shared secret on outbound webhook calls.
///
/// Most workers expect the plain `Authorization` header; the audio
/// generation worker expects the n8n custom header instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthHeader {
    Authorization,
    XN8nWebhookAuth,
}

impl AuthHeader {
    pub fn name(self) -> &'static str {
        match self {
            AuthHeader::Authorization => "Authorization",
            AuthHeader::XN8nWebhookAuth => "X-N8N-Webhook-Auth",
        }
    }
}

/// Successful (2xx) webhook response, body kept raw so each job kind can
/// decide how to interpret it (JSON envelope, passthrough, or plain text).
#[derive(Debug)]
pub struct WebhookReply {
    pub status: u16,
    pub body: String,
}

impl WebhookReply {
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Classification of an upstream failure, per status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamClass {
    /// 401/403: the shared secret is wrong or the worker's auth changed.
    AuthRejected,
    /// >= 500: worker-side failure, retry later.
    Transient,
    /// Any other non-success status.
    Generic,
    /// No response at all (DNS, connect, timeout).
    Transport,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook responded with status {status}")]
    Status { status: u16, body: String },

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl WebhookError {
    pub fn classify(&self) -> UpstreamClass {
        match self {
            WebhookError::Status { status: 401, .. } | WebhookError::Status { status: 403, .. } => {
                UpstreamClass::AuthRejected
            }
            WebhookError::Status { status, .. } if *status >= 500 => UpstreamClass::Transient,
            WebhookError::Status { .. } => UpstreamClass::Generic,
            WebhookError::Transport(_) => UpstreamClass::Transport,
        }
    }

    /// Upstream HTTP status, when a response was received.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            WebhookError::Status { status, .. } => Some(*status),
            WebhookError::Transport(_) => None,
        }
    }

    /// Raw diagnostic text for the `details` field of error responses.
    pub fn details(&self) -> String {
        match self {
            WebhookError::Status { body, .. } => body.clone(),
            WebhookError::Transport(e) => e.to_string(),
        }
    }
}

/// Shared helper for outbound calls to external workers.
///
/// POSTs a JSON payload with the shared secret in the configured header and a
/// bounded timeout. No retries; retry policy belongs to the caller or the
/// worker's own redelivery.
pub struct WebhookClient {
    http: Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        auth: AuthHeader,
        secret: &str,
        payload: &T,
    ) -> Result<WebhookReply, WebhookError> {
        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header(auth.name(), secret)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if (200..300).contains(&status) {
            Ok(WebhookReply { status, body })
        } else {
            Err(WebhookError::Status { status, body })
        }
    }
}
