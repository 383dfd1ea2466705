use serde::Deserialize;

/// Process-wide configuration, loaded once at startup and injected into
/// components. Per-job-kind webhook URLs and the shared secret are optional
/// here: a missing value surfaces as a configuration error on the first
/// dispatch that needs it, never as a silent hang.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string for the record store
    pub database_url: String,

    /// Public base URL of this service, used to build callback and
    /// storage URLs handed to workers
    pub public_base_url: Option<String>,

    /// Content generation worker webhook URL
    pub notebook_generation_url: Option<String>,

    /// Audio overview worker webhook URL
    pub audio_generation_webhook_url: Option<String>,

    /// Document processing worker webhook URL
    pub document_processing_webhook_url: Option<String>,

    /// Additional-sources ingestion worker webhook URL
    pub additional_sources_webhook_url: Option<String>,

    /// Chat relay worker webhook URL
    pub notebook_chat_url: Option<String>,

    /// Shared secret carried on every outbound webhook call
    pub notebook_generation_auth: Option<String>,

    /// Bounded wait for outbound webhook calls, in seconds
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_webhook_timeout_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
