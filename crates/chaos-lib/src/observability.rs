//! Observability infrastructure for the chaos usage service
//!
//! Provides:
//! - Prometheus metrics (report latency, ingestion throughput, gap-filled slots)
//! - Structured JSON logging with tracing

use crate::models::ReportKind;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for report assembly latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ChaosMetricsInner> = OnceLock::new();

struct ChaosMetricsInner {
    report_latency_seconds: HistogramVec,
    reports_built: IntCounterVec,
    reports_failed: IntCounterVec,
    sentinel_slots: IntCounterVec,
    samples_ingested: IntCounter,
    ingestion_failures: IntCounter,
    experiments_registered: IntCounter,
}

impl ChaosMetricsInner {
    fn new() -> Self {
        Self {
            report_latency_seconds: register_histogram_vec!(
                "chaos_usage_report_latency_seconds",
                "Time spent resolving resources and aligning their series",
                &["kind"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register report_latency_seconds"),

            reports_built: register_int_counter_vec!(
                "chaos_usage_reports_built_total",
                "Reports assembled successfully",
                &["kind"]
            )
            .expect("Failed to register reports_built"),

            reports_failed: register_int_counter_vec!(
                "chaos_usage_reports_failed_total",
                "Report requests that ended in an error",
                &["kind"]
            )
            .expect("Failed to register reports_failed"),

            sentinel_slots: register_int_counter_vec!(
                "chaos_usage_sentinel_slots_total",
                "Aligned slots filled with the missing-sample sentinel",
                &["kind"]
            )
            .expect("Failed to register sentinel_slots"),

            samples_ingested: register_int_counter!(
                "chaos_usage_samples_ingested_total",
                "Raw usage samples written to the store"
            )
            .expect("Failed to register samples_ingested"),

            ingestion_failures: register_int_counter!(
                "chaos_usage_ingestion_failures_total",
                "Ingestion batches aborted by a write error"
            )
            .expect("Failed to register ingestion_failures"),

            experiments_registered: register_int_counter!(
                "chaos_usage_experiments_registered_total",
                "StressChaos experiments registered"
            )
            .expect("Failed to register experiments_registered"),
        }
    }
}

/// Handle to the process-wide chaos metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct ChaosMetrics {
    _private: (),
}

impl Default for ChaosMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ChaosMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ChaosMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ChaosMetricsInner {
        GLOBAL_METRICS.get_or_init(ChaosMetricsInner::new)
    }

    pub fn observe_report_latency(&self, kind: ReportKind, duration_secs: f64) {
        self.inner()
            .report_latency_seconds
            .with_label_values(&[kind.as_str()])
            .observe(duration_secs);
    }

    pub fn inc_reports_built(&self, kind: ReportKind) {
        self.inner()
            .reports_built
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn inc_reports_failed(&self, kind: ReportKind) {
        self.inner()
            .reports_failed
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn add_sentinel_slots(&self, kind: ReportKind, slots: usize) {
        self.inner()
            .sentinel_slots
            .with_label_values(&[kind.as_str()])
            .inc_by(slots as u64);
    }

    pub fn add_samples_ingested(&self, count: usize) {
        self.inner().samples_ingested.inc_by(count as u64);
    }

    pub fn inc_ingestion_failures(&self) {
        self.inner().ingestion_failures.inc();
    }

    pub fn inc_experiments_registered(&self) {
        self.inner().experiments_registered.inc();
    }
}

/// Structured logger for chaos usage events
///
/// Every event carries an `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_report_built(
        &self,
        kind: ReportKind,
        chaos_name: &str,
        resources: usize,
        sentinel_slots: usize,
    ) {
        info!(
            event = "report_built",
            instance = %self.instance,
            kind = kind.as_str(),
            chaos_name = %chaos_name,
            resources = resources,
            sentinel_slots = sentinel_slots,
            "Built chaos usage report"
        );
    }

    pub fn log_report_failed(&self, kind: ReportKind, chaos_name: &str, error: &str, retryable: bool) {
        warn!(
            event = "report_failed",
            instance = %self.instance,
            kind = kind.as_str(),
            chaos_name = %chaos_name,
            error = %error,
            retryable = retryable,
            "Chaos usage report failed"
        );
    }

    pub fn log_ingestion(&self, written: usize) {
        info!(
            event = "samples_ingested",
            instance = %self.instance,
            written = written,
            "Ingested usage samples"
        );
    }

    pub fn log_ingestion_aborted(&self, written: usize, total: usize, error: &str) {
        warn!(
            event = "ingestion_aborted",
            instance = %self.instance,
            written = written,
            total = total,
            error = %error,
            "Ingestion batch aborted, earlier samples kept"
        );
    }

    pub fn log_experiment_registered(&self, chaos_name: &str, namespace: &str, resources: usize) {
        info!(
            event = "experiment_registered",
            instance = %self.instance,
            chaos_name = %chaos_name,
            namespace = %namespace,
            resources = resources,
            "Registered chaos experiment"
        );
    }

    pub fn log_experiment_deleted(&self, chaos_name: &str, namespace: &str) {
        info!(
            event = "experiment_deleted",
            instance = %self.instance,
            chaos_name = %chaos_name,
            namespace = %namespace,
            "Deleted chaos experiment"
        );
    }

    pub fn log_startup(&self, version: &str, expected_samples: usize, cadence_secs: u32) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            expected_samples = expected_samples,
            cadence_secs = cadence_secs,
            "Chaos usage service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Chaos usage service shutting down"
        );
    }
}
