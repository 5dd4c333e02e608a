//! Registration and teardown of StressChaos experiments

use crate::error::{ChaosError, Result};
use crate::models::{ChaosExperiment, ChaosResource, ExperimentSpec, NewResource, ResourceId};
use crate::store::SampleStore;
use serde::{Deserialize, Serialize};

/// Experiment record plus the resources it targets, created together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub stress_chaos: ExperimentSpec,
    #[serde(default)]
    pub chaos_resource: Vec<NewResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub experiment: ChaosExperiment,
    /// Generated ids, in request order
    pub resource_ids: Vec<ResourceId>,
}

/// Create the experiment, then each of its resources in order
///
/// Resource creation stops at the first store error; the experiment and any
/// resources created before it remain.
pub async fn register(store: &dyn SampleStore, request: &RegistrationRequest) -> Result<Registration> {
    let spec = &request.stress_chaos;
    if spec.chaos_name.trim().is_empty() || spec.namespace.trim().is_empty() {
        return Err(ChaosError::InvalidRequest(
            "chaosName and namespace are required".to_string(),
        ));
    }
    if let Some(unnamed) = request
        .chaos_resource
        .iter()
        .position(|r| r.resource_name.trim().is_empty())
    {
        return Err(ChaosError::InvalidRequest(format!(
            "chaosResource[{}] has no resourceName",
            unnamed
        )));
    }

    let experiment = store.insert_experiment(spec).await?;

    let mut resource_ids = Vec::with_capacity(request.chaos_resource.len());
    for resource in &request.chaos_resource {
        let created = store
            .insert_resource(experiment.experiment_id, resource)
            .await?;
        resource_ids.push(created.resource_id);
    }

    Ok(Registration {
        experiment,
        resource_ids,
    })
}

pub async fn resources_by_ids(
    store: &dyn SampleStore,
    ids: &[ResourceId],
) -> Result<Vec<ChaosResource>> {
    Ok(store.resources_by_ids(ids).await?)
}

/// Remove an experiment; the store cascades to resources and samples
pub async fn delete(
    store: &dyn SampleStore,
    chaos_name: &str,
    namespace: &str,
) -> Result<ChaosExperiment> {
    let experiment = store
        .find_experiment(chaos_name, namespace)
        .await?
        .ok_or_else(|| ChaosError::NotFound(format!("{}/{}", namespace, chaos_name)))?;

    store.delete_experiment(experiment.experiment_id).await?;
    Ok(experiment)
}
