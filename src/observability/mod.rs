#![allow(clippy::unwrap_used)] // Supporting infrastructure - unwrap() acceptable for now
//! Observability for the casualty-generation service: health probes,
//! metrics, Prometheus export, and distributed tracing (§6).

pub mod health;
pub mod metrics;
pub mod prometheus;
pub mod tracing;

pub use health::{ComponentHealth, HealthChecker, HealthStatus};
pub use metrics::Metrics;
pub use prometheus::{MetricSample, MetricType, PrometheusExporter};
pub use tracing::{JobTracer, TracingConfig};
