//! Metrics for the casualty-generation service (§6): job lifecycle counters,
//! chunk timing, and resource gauges, exported both through the `metrics`
//! facade (for a `metrics-exporter-prometheus` recorder installed by the
//! binary) and through the in-process [`PrometheusExporter`] used by the
//! `/metrics` handler when no external recorder is installed.

use std::collections::HashMap;
use std::time::Duration;

use super::prometheus::PrometheusExporter;

/// Service-wide metrics sink. Cheap to clone (interior `Arc`s); one instance
/// is built at startup and shared with the worker pool and the REST layer.
#[derive(Default)]
pub struct Metrics {
    exporter: PrometheusExporter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            exporter: PrometheusExporter::new(),
        }
    }

    pub fn record_job_submitted(&self) {
        metrics::counter!("castra_jobs_submitted_total").increment(1);
        self.exporter
            .record_counter("castra_jobs_submitted_total".into(), 1.0, HashMap::new());
    }

    pub fn record_job_rejected(&self) {
        metrics::counter!("castra_jobs_rejected_total").increment(1);
        self.exporter
            .record_counter("castra_jobs_rejected_total".into(), 1.0, HashMap::new());
    }

    pub fn record_job_completed(&self, status: &str) {
        let mut labels = HashMap::new();
        labels.insert("status".to_string(), status.to_string());
        metrics::counter!("castra_jobs_completed_total", "status" => status.to_string())
            .increment(1);
        self.exporter
            .record_counter("castra_jobs_completed_total".into(), 1.0, labels);
    }

    pub fn record_patients_generated(&self, count: u64) {
        metrics::counter!("castra_patients_generated_total").increment(count);
        self.exporter.record_counter(
            "castra_patients_generated_total".into(),
            count as f64,
            HashMap::new(),
        );
    }

    pub fn record_chunk_duration(&self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        metrics::histogram!("castra_chunk_duration_ms").record(ms);
        self.exporter
            .record_histogram("castra_chunk_duration_ms".into(), ms, HashMap::new());
    }

    pub fn record_active_jobs(&self, count: usize) {
        metrics::gauge!("castra_active_jobs").set(count as f64);
        self.exporter
            .record_gauge("castra_active_jobs".into(), count as f64, HashMap::new());
    }

    pub fn record_memory_estimate_bytes(&self, bytes: u64) {
        metrics::gauge!("castra_job_memory_estimate_bytes").set(bytes as f64);
        self.exporter.record_gauge(
            "castra_job_memory_estimate_bytes".into(),
            bytes as f64,
            HashMap::new(),
        );
    }

    /// Render the in-process samples in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        self.exporter.export()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_counters_show_up_in_export() {
        let metrics = Metrics::new();
        metrics.record_job_submitted();
        metrics.record_job_submitted();
        let text = metrics.render_prometheus();
        assert!(text.contains("castra_jobs_submitted_total"));
    }

    #[test]
    fn test_gauge_keeps_latest_value_only() {
        let metrics = Metrics::new();
        metrics.record_active_jobs(3);
        metrics.record_active_jobs(5);
        let text = metrics.render_prometheus();
        assert!(text.contains("castra_active_jobs 5"));
        assert!(!text.contains("castra_active_jobs 3"));
    }
}
