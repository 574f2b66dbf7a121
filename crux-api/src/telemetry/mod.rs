//! Crux Telemetry - Structured Logging and Prometheus Metrics

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, CruxMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, TelemetryConfig, DEFAULT_LOG_FILTER};
