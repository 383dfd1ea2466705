use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics — Prometheus scrape endpoint in text exposition format.
/// Carries the per-kind job counters (`relay_jobs_dispatched`,
/// `relay_jobs_completed`, `relay_jobs_failed`).
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
