//! Storage contract for chaos metadata and raw usage samples
//!
//! The reconstruction engine never talks to a database directly. Everything
//! goes through [`SampleStore`], which owns durability, per-key upsert
//! atomicity and cascade deletes. [`MemoryStore`] is the in-process
//! implementation used by the server and the tests.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::{
    ChaosExperiment, ChaosResource, ExperimentId, ExperimentSpec, NewResource, RawSample,
    ResourceId, ResourceKind,
};

pub use async_trait::async_trait;

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed storage for experiments, their resources and usage samples
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Insert or replace the sample keyed by `(resource_id, measurement_time)`
    async fn upsert(&self, sample: &RawSample) -> StoreResult<()>;

    /// All samples of one resource in insertion order (not sorted by time)
    async fn query_by_resource(&self, resource_id: ResourceId) -> StoreResult<Vec<RawSample>>;

    /// Resources of an experiment in creation order
    async fn query_resources_by_experiment(
        &self,
        experiment_id: ExperimentId,
        kind: ResourceKind,
        selected_only: bool,
    ) -> StoreResult<Vec<ChaosResource>>;

    /// Distinct non-empty pod generated names of an experiment, first seen first
    async fn distinct_generated_names(
        &self,
        experiment_id: ExperimentId,
    ) -> StoreResult<Vec<String>>;

    /// Earliest registered experiment carrying `chaos_name`
    async fn find_experiment_by_name(
        &self,
        chaos_name: &str,
    ) -> StoreResult<Option<ChaosExperiment>>;

    async fn find_experiment(
        &self,
        chaos_name: &str,
        namespace: &str,
    ) -> StoreResult<Option<ChaosExperiment>>;

    /// Create an experiment; `(chaos_name, namespace)` must be unused
    async fn insert_experiment(&self, spec: &ExperimentSpec) -> StoreResult<ChaosExperiment>;

    /// Create a resource owned by `experiment_id`, assigning its id
    async fn insert_resource(
        &self,
        experiment_id: ExperimentId,
        resource: &NewResource,
    ) -> StoreResult<ChaosResource>;

    /// Resources matching `ids`; unknown ids are skipped
    async fn resources_by_ids(&self, ids: &[ResourceId]) -> StoreResult<Vec<ChaosResource>>;

    /// Delete an experiment together with its resources and their samples
    async fn delete_experiment(&self, experiment_id: ExperimentId) -> StoreResult<()>;
}
