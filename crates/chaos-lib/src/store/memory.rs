//! In-memory [`SampleStore`]
//!
//! A single `RwLock` guards all tables, so each call is atomic with respect
//! to every other call. Samples keep their first insertion position when they
//! are replaced, the way an updated database row keeps its place in a scan.

use super::{async_trait, SampleStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    ChaosExperiment, ChaosResource, ExperimentId, ExperimentSpec, NewResource, RawSample,
    ResourceId, ResourceKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    experiments: Vec<ChaosExperiment>,
    resources: Vec<ChaosResource>,
    samples: HashMap<ResourceId, Vec<RawSample>>,
    next_experiment_id: ExperimentId,
    next_resource_id: ResourceId,
}

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored samples across all resources
    pub async fn sample_count(&self) -> usize {
        self.tables.read().await.samples.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn upsert(&self, sample: &RawSample) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if !tables
            .resources
            .iter()
            .any(|r| r.resource_id == sample.resource_id)
        {
            return Err(StoreError::Rejected(format!(
                "unknown resource {}",
                sample.resource_id
            )));
        }

        let rows = tables.samples.entry(sample.resource_id).or_default();
        match rows
            .iter_mut()
            .find(|row| row.measurement_time == sample.measurement_time)
        {
            Some(existing) => {
                debug!(resource_id = sample.resource_id, "Replacing existing sample");
                *existing = sample.clone();
            }
            None => rows.push(sample.clone()),
        }

        Ok(())
    }

    async fn query_by_resource(&self, resource_id: ResourceId) -> StoreResult<Vec<RawSample>> {
        let tables = self.tables.read().await;
        Ok(tables.samples.get(&resource_id).cloned().unwrap_or_default())
    }

    async fn query_resources_by_experiment(
        &self,
        experiment_id: ExperimentId,
        kind: ResourceKind,
        selected_only: bool,
    ) -> StoreResult<Vec<ChaosResource>> {
        let tables = self.tables.read().await;
        Ok(tables
            .resources
            .iter()
            .filter(|r| r.chaos_experiment_id == experiment_id && r.kind() == kind)
            .filter(|r| !selected_only || r.is_selected())
            .cloned()
            .collect())
    }

    async fn distinct_generated_names(
        &self,
        experiment_id: ExperimentId,
    ) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = Vec::new();
        for name in tables
            .resources
            .iter()
            .filter(|r| r.chaos_experiment_id == experiment_id)
            .filter_map(ChaosResource::generated_name)
        {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn find_experiment_by_name(
        &self,
        chaos_name: &str,
    ) -> StoreResult<Option<ChaosExperiment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .experiments
            .iter()
            .find(|e| e.spec.chaos_name == chaos_name)
            .cloned())
    }

    async fn find_experiment(
        &self,
        chaos_name: &str,
        namespace: &str,
    ) -> StoreResult<Option<ChaosExperiment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .experiments
            .iter()
            .find(|e| e.spec.chaos_name == chaos_name && e.spec.namespace == namespace)
            .cloned())
    }

    async fn insert_experiment(&self, spec: &ExperimentSpec) -> StoreResult<ChaosExperiment> {
        let mut tables = self.tables.write().await;

        if tables
            .experiments
            .iter()
            .any(|e| e.spec.chaos_name == spec.chaos_name && e.spec.namespace == spec.namespace)
        {
            return Err(StoreError::Rejected(format!(
                "experiment {}/{} already exists",
                spec.namespace, spec.chaos_name
            )));
        }

        tables.next_experiment_id += 1;
        let experiment = ChaosExperiment {
            experiment_id: tables.next_experiment_id,
            spec: spec.clone(),
        };
        tables.experiments.push(experiment.clone());
        Ok(experiment)
    }

    async fn insert_resource(
        &self,
        experiment_id: ExperimentId,
        resource: &NewResource,
    ) -> StoreResult<ChaosResource> {
        let mut tables = self.tables.write().await;

        if !tables
            .experiments
            .iter()
            .any(|e| e.experiment_id == experiment_id)
        {
            return Err(StoreError::Rejected(format!(
                "unknown experiment {}",
                experiment_id
            )));
        }

        tables.next_resource_id += 1;
        let created = ChaosResource {
            resource_id: tables.next_resource_id,
            chaos_experiment_id: experiment_id,
            resource_name: resource.resource_name.clone(),
            target: resource.target.clone(),
        };
        tables.resources.push(created.clone());
        Ok(created)
    }

    async fn resources_by_ids(&self, ids: &[ResourceId]) -> StoreResult<Vec<ChaosResource>> {
        let tables = self.tables.read().await;
        Ok(tables
            .resources
            .iter()
            .filter(|r| ids.contains(&r.resource_id))
            .cloned()
            .collect())
    }

    async fn delete_experiment(&self, experiment_id: ExperimentId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let tables = &mut *tables;

        tables.experiments.retain(|e| e.experiment_id != experiment_id);

        let samples = &mut tables.samples;
        tables.resources.retain(|r| {
            let keep = r.chaos_experiment_id != experiment_id;
            if !keep {
                samples.remove(&r.resource_id);
            }
            keep
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{measurement_time, ResourceTarget};

    fn spec(name: &str, namespace: &str) -> ExperimentSpec {
        ExperimentSpec {
            chaos_name: name.to_string(),
            namespace: namespace.to_string(),
            creation_time: measurement_time::parse("2024-09-12T10:00:00").unwrap(),
            end_time: None,
            duration: "60s".to_string(),
        }
    }

    fn pod(name: &str, generated_name: &str, selected: bool) -> NewResource {
        NewResource {
            resource_name: name.to_string(),
            target: ResourceTarget::Pod {
                generated_name: generated_name.to_string(),
                selected,
            },
        }
    }

    fn sample(resource_id: ResourceId, time: &str, cpu: i64) -> RawSample {
        RawSample {
            resource_id,
            measurement_time: measurement_time::parse(time).unwrap(),
            cpu,
            memory: cpu * 10,
            app_status: Some(1),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = MemoryStore::new();
        let exp = store.insert_experiment(&spec("exp1", "default")).await.unwrap();
        let p1 = store
            .insert_resource(exp.experiment_id, &pod("p1", "web-", true))
            .await
            .unwrap();

        store.upsert(&sample(p1.resource_id, "2024-09-12T10:00:00", 1)).await.unwrap();
        store.upsert(&sample(p1.resource_id, "2024-09-12T10:00:10", 2)).await.unwrap();
        store.upsert(&sample(p1.resource_id, "2024-09-12T10:00:00", 9)).await.unwrap();

        let rows = store.query_by_resource(p1.resource_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cpu, 9);
        assert_eq!(rows[1].cpu, 2);
    }

    #[tokio::test]
    async fn test_upsert_rejects_unknown_resource() {
        let store = MemoryStore::new();
        let err = store
            .upsert(&sample(42, "2024-09-12T10:00:00", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_duplicate_experiment_rejected_per_namespace() {
        let store = MemoryStore::new();
        store.insert_experiment(&spec("exp1", "default")).await.unwrap();

        assert!(store.insert_experiment(&spec("exp1", "default")).await.is_err());
        assert!(store.insert_experiment(&spec("exp1", "staging")).await.is_ok());

        let found = store.find_experiment_by_name("exp1").await.unwrap().unwrap();
        assert_eq!(found.spec.namespace, "default");
    }

    #[tokio::test]
    async fn test_resource_filters_and_generated_names() {
        let store = MemoryStore::new();
        let exp = store.insert_experiment(&spec("exp1", "default")).await.unwrap();
        let id = exp.experiment_id;
        store.insert_resource(id, &pod("web-a", "web-", true)).await.unwrap();
        store.insert_resource(id, &pod("api-a", "api-", false)).await.unwrap();
        store.insert_resource(id, &pod("web-b", "web-", false)).await.unwrap();
        store
            .insert_resource(
                id,
                &NewResource {
                    resource_name: "worker-1".to_string(),
                    target: ResourceTarget::Node,
                },
            )
            .await
            .unwrap();

        let selected = store
            .query_resources_by_experiment(id, ResourceKind::Pod, true)
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].resource_name, "web-a");

        let nodes = store
            .query_resources_by_experiment(id, ResourceKind::Node, false)
            .await
            .unwrap();
        assert_eq!(nodes.len(), 1);

        let names = store.distinct_generated_names(id).await.unwrap();
        assert_eq!(names, vec!["web-".to_string(), "api-".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = MemoryStore::new();
        let exp = store.insert_experiment(&spec("exp1", "default")).await.unwrap();
        let p1 = store
            .insert_resource(exp.experiment_id, &pod("p1", "web-", true))
            .await
            .unwrap();
        store.upsert(&sample(p1.resource_id, "2024-09-12T10:00:00", 1)).await.unwrap();

        store.delete_experiment(exp.experiment_id).await.unwrap();

        assert!(store.find_experiment_by_name("exp1").await.unwrap().is_none());
        assert!(store.resources_by_ids(&[p1.resource_id]).await.unwrap().is_empty());
        assert_eq!(store.sample_count().await, 0);
    }
}
