use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use notebook_relay::app_state::AppState;
use notebook_relay::config::AppConfig;
use notebook_relay::db::{self, store::PgRecordStore};
use notebook_relay::routes;
use notebook_relay::services::webhook::WebhookClient;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing notebook-relay server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("relay_jobs_dispatched", "Jobs handed to external workers");
    metrics::describe_counter!("relay_jobs_completed", "Jobs that reached the completed state");
    metrics::describe_counter!("relay_jobs_failed", "Jobs that reached the failed state");

    // Initialize record store
    tracing::info!("Connecting to PostgreSQL record store");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let store = Arc::new(PgRecordStore::new(db_pool));

    // Outbound webhook client with a bounded timeout
    let webhook = WebhookClient::new(Duration::from_secs(config.webhook_timeout_secs))
        .expect("Failed to initialize webhook client");

    let config = Arc::new(config);
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(store, webhook, config);

    let app = notebook_relay::router(state).route(
        "/metrics",
        get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
    );

    tracing::info!("Starting notebook-relay on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
