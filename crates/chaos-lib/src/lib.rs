//! Chaos resource-usage reconstruction library
//!
//! This crate provides the core functionality for:
//! - Aligning irregular per-resource samples onto a fixed cadence grid
//! - By-pod, by-workload and by-node usage reports for a chaos experiment
//! - Idempotent ingestion of raw samples
//! - Experiment registration against a pluggable sample store
//! - Health checks and observability

pub mod alignment;
pub mod error;
pub mod experiment;
pub mod health;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod report;
pub mod service;
pub mod store;

pub use alignment::{align, AlignmentConfig, StatusChannel};
pub use error::{ChaosError, StoreError};
pub use experiment::{Registration, RegistrationRequest};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use ingest::IngestSummary;
pub use models::*;
pub use observability::{ChaosMetrics, StructuredLogger};
pub use service::ChaosUsageService;
pub use store::{MemoryStore, SampleStore};
