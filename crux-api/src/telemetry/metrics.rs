//! Prometheus Metrics Definitions
//!
//! HTTP metrics are recorded per request by the observability middleware.
//! Engine and store figures live elsewhere and are copied in at scrape
//! time by [`metrics_handler`].

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use crux_engine::EngineMetricsSnapshot;
use crux_storage::StoreStatistics;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_gauge_vec,
    CounterVec, Encoder, Gauge, HistogramVec, IntGaugeVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance, registered on first use.
pub static METRICS: Lazy<ApiResult<CruxMetrics>> = Lazy::new(CruxMetrics::new);

#[derive(Clone)]
pub struct CruxMetrics {
    /// labels: method, path, status
    pub http_requests_total: CounterVec,

    /// labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Recounts since start - labels: outcome (updated/unchanged/failed)
    pub recounts: IntGaugeVec,

    /// Ranking runs since start - labels: outcome (committed/failed)
    pub ranking_runs: IntGaugeVec,

    /// Engine event totals since start - labels: event (gaps/transaction_retries)
    pub engine_events: IntGaugeVec,

    pub last_ranking_run_duration_seconds: Gauge,

    /// Records in the store - labels: entity
    pub store_records: IntGaugeVec,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl CruxMetrics {
    /// Create and register all metrics with the default registry.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "crux_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "crux_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            recounts: register_int_gauge_vec!(
                "crux_completion_recounts",
                "Completion recounts since process start",
                &["outcome"]
            )
            .map_err(|e| registration_error("completion_recounts", e))?,

            ranking_runs: register_int_gauge_vec!(
                "crux_ranking_runs",
                "Ranking runs since process start",
                &["outcome"]
            )
            .map_err(|e| registration_error("ranking_runs", e))?,

            engine_events: register_int_gauge_vec!(
                "crux_engine_events",
                "Ranking gaps and transaction retries since process start",
                &["event"]
            )
            .map_err(|e| registration_error("engine_events", e))?,

            last_ranking_run_duration_seconds: register_gauge!(
                "crux_last_ranking_run_duration_seconds",
                "Wall time of the most recent ranking run"
            )
            .map_err(|e| registration_error("last_ranking_run_duration_seconds", e))?,

            store_records: register_int_gauge_vec!(
                "crux_store_records",
                "Records currently held by the store",
                &["entity"]
            )
            .map_err(|e| registration_error("store_records", e))?,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn observe_engine(&self, snapshot: &EngineMetricsSnapshot) {
        let set = |vec: &IntGaugeVec, label: &str, value: u64| {
            vec.with_label_values(&[label]).set(value as i64);
        };
        set(&self.recounts, "updated", snapshot.recounts_updated);
        set(&self.recounts, "unchanged", snapshot.recounts_unchanged);
        set(&self.recounts, "failed", snapshot.recounts_failed);
        set(&self.ranking_runs, "committed", snapshot.ranking_runs_committed);
        set(&self.ranking_runs, "failed", snapshot.ranking_runs_failed);
        set(&self.engine_events, "gaps", snapshot.ranking_gaps);
        set(&self.engine_events, "transaction_retries", snapshot.transaction_retries);
        self.last_ranking_run_duration_seconds
            .set(snapshot.last_run_duration_ms as f64 / 1000.0);
    }

    pub fn observe_store(&self, stats: &StoreStatistics) {
        for (entity, count) in [
            ("route", stats.route_count),
            ("log", stats.log_count),
            ("user", stats.user_count),
        ] {
            self.store_records
                .with_label_values(&[entity])
                .set(count as i64);
        }
    }
}

/// Handler for GET /metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match METRICS.as_ref() {
        Ok(metrics) => {
            metrics.observe_engine(&state.metrics.snapshot());
            match state.store.statistics().await {
                Ok(stats) => metrics.observe_store(&stats),
                Err(e) => tracing::warn!(error = %e, "Store statistics unavailable for scrape"),
            }
        }
        Err(e) => tracing::error!(error = %e, "Metrics registry unavailable"),
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
