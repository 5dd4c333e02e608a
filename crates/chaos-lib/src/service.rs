//! Chaos usage service
//!
//! Entry point used by transports. Wraps the report strategies, ingestion and
//! experiment registration with metrics, structured logging and store health
//! tracking. Holds no per-request state, so one instance serves concurrent
//! requests.

use crate::alignment::AlignmentConfig;
use crate::error::{ChaosError, Result};
use crate::experiment::{self, Registration, RegistrationRequest};
use crate::health::{components, HealthRegistry};
use crate::ingest::{self, IngestSummary};
use crate::models::{ChaosResource, RawSample, Report, ReportKind, ResourceId};
use crate::observability::{ChaosMetrics, StructuredLogger};
use crate::report;
use crate::store::SampleStore;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Consecutive transient store failures after which the store is unhealthy
pub const STORE_UNHEALTHY_AFTER: u32 = 3;

#[derive(Clone)]
pub struct ChaosUsageService {
    store: Arc<dyn SampleStore>,
    alignment: AlignmentConfig,
    metrics: ChaosMetrics,
    logger: StructuredLogger,
    health: HealthRegistry,
    store_failures: Arc<AtomicU32>,
}

impl ChaosUsageService {
    pub fn new(
        store: Arc<dyn SampleStore>,
        alignment: AlignmentConfig,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            store,
            alignment,
            metrics: ChaosMetrics::new(),
            logger,
            health,
            store_failures: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn alignment(&self) -> &AlignmentConfig {
        &self.alignment
    }

    pub async fn report_by_pod(&self, chaos_name: &str) -> Result<Report> {
        self.report(ReportKind::ByPod, chaos_name).await
    }

    pub async fn report_by_workload(&self, chaos_name: &str) -> Result<Report> {
        self.report(ReportKind::ByWorkload, chaos_name).await
    }

    pub async fn report_by_node(&self, chaos_name: &str) -> Result<Report> {
        self.report(ReportKind::ByNode, chaos_name).await
    }

    pub async fn report(&self, kind: ReportKind, chaos_name: &str) -> Result<Report> {
        let started = Instant::now();
        let result = report::build(self.store.as_ref(), kind, chaos_name, &self.alignment).await;
        self.metrics
            .observe_report_latency(kind, started.elapsed().as_secs_f64());
        self.track_store(&result).await;

        match &result {
            Ok(report) => {
                let sentinel_slots: usize = report.items.iter().map(|s| s.sentinel_slots()).sum();
                self.metrics.inc_reports_built(kind);
                self.metrics.add_sentinel_slots(kind, sentinel_slots);
                self.health.set_healthy(components::REPORTS).await;
                self.logger
                    .log_report_built(kind, chaos_name, report.items.len(), sentinel_slots);
            }
            Err(err) => {
                self.metrics.inc_reports_failed(kind);
                if let ChaosError::EmptySampleSet { resource } = err {
                    self.health
                        .set_degraded(
                            components::REPORTS,
                            format!("resource '{}' has no samples", resource),
                        )
                        .await;
                }
                self.logger
                    .log_report_failed(kind, chaos_name, &err.to_string(), err.is_retryable());
            }
        }

        result
    }

    pub async fn ingest(&self, batch: &[RawSample]) -> Result<IngestSummary> {
        let result = ingest::ingest(self.store.as_ref(), batch).await;
        self.track_store(&result).await;

        match &result {
            Ok(summary) => {
                self.metrics.add_samples_ingested(summary.written);
                self.health.set_healthy(components::INGESTION).await;
                self.logger.log_ingestion(summary.written);
            }
            Err(err) => {
                if let ChaosError::PartialIngestionFailure { written, total, .. } = err {
                    self.metrics.add_samples_ingested(*written);
                    self.logger
                        .log_ingestion_aborted(*written, *total, &err.to_string());
                }
                self.metrics.inc_ingestion_failures();
                self.health
                    .set_degraded(components::INGESTION, err.to_string())
                    .await;
            }
        }

        result
    }

    pub async fn register_experiment(&self, request: &RegistrationRequest) -> Result<Registration> {
        let result = experiment::register(self.store.as_ref(), request).await;
        self.track_store(&result).await;

        if let Ok(registration) = &result {
            self.metrics.inc_experiments_registered();
            self.logger.log_experiment_registered(
                &registration.experiment.spec.chaos_name,
                &registration.experiment.spec.namespace,
                registration.resource_ids.len(),
            );
        }

        result
    }

    pub async fn resources_by_ids(&self, ids: &[ResourceId]) -> Result<Vec<ChaosResource>> {
        let result = experiment::resources_by_ids(self.store.as_ref(), ids).await;
        self.track_store(&result).await;
        result
    }

    pub async fn delete_experiment(&self, chaos_name: &str, namespace: &str) -> Result<()> {
        let result = experiment::delete(self.store.as_ref(), chaos_name, namespace).await;
        self.track_store(&result).await;

        let experiment = result?;
        self.logger
            .log_experiment_deleted(&experiment.spec.chaos_name, &experiment.spec.namespace);
        Ok(())
    }

    /// Degrade the store component on transient failures and mark it
    /// unhealthy once they repeat; any answered call restores it
    async fn track_store<T>(&self, result: &Result<T>) {
        match result {
            Err(err) if err.is_retryable() => {
                let failures = self.store_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= STORE_UNHEALTHY_AFTER {
                    self.health
                        .set_unhealthy(
                            components::STORE,
                            format!("{} consecutive store failures: {}", failures, err),
                        )
                        .await;
                } else {
                    self.health
                        .set_degraded(components::STORE, err.to_string())
                        .await;
                }
            }
            _ => {
                self.store_failures.store(0, Ordering::SeqCst);
                self.health.set_healthy(components::STORE).await;
            }
        }
    }
}
