//! Aggregation strategies for chaos usage reports
//!
//! Each strategy resolves the member resources of a report from the store,
//! runs the alignment engine once per member and assembles a [`Report`].
//! Members keep the order in which the store resolved them, and the first
//! member's axis becomes the report's display axis.
//!
//! The by-workload strategy pre-aggregates the samples of all pods sharing a
//! generated name with an integer arithmetic mean per timestamp before
//! alignment.


use crate::alignment::{align, AlignmentConfig, StatusChannel};
use crate::error::{ChaosError, Result};
use crate::models::{
    AlignedSeries, ChaosExperiment, ChaosResource, Report, ReportKind, ResourceKind, UsagePoint,
};
use crate::store::SampleStore;
use chrono::NaiveDateTime;
use tracing::debug;

/// Build the report of `kind` for the experiment named `chaos_name`
pub async fn build(
    store: &dyn SampleStore,
    kind: ReportKind,
    chaos_name: &str,
    config: &AlignmentConfig,
) -> Result<Report> {
    match kind {
        ReportKind::ByPod => by_pod(store, chaos_name, config).await,
        ReportKind::ByWorkload => by_workload(store, chaos_name, config).await,
        ReportKind::ByNode => by_node(store, chaos_name, config).await,
    }
}

/// One series per selected pod, including application status
pub async fn by_pod(
    store: &dyn SampleStore,
    chaos_name: &str,
    config: &AlignmentConfig,
) -> Result<Report> {
    let experiment = resolve_experiment(store, chaos_name).await?;
    let pods = store
        .query_resources_by_experiment(experiment.experiment_id, ResourceKind::Pod, true)
        .await?;

    let items = align_resources(store, &pods, config, StatusChannel::Include).await?;
    Ok(assemble(ReportKind::ByPod, chaos_name, items))
}

/// One series per workload, averaging its pods per timestamp
pub async fn by_workload(
    store: &dyn SampleStore,
    chaos_name: &str,
    config: &AlignmentConfig,
) -> Result<Report> {
    let experiment = resolve_experiment(store, chaos_name).await?;
    let names = store
        .distinct_generated_names(experiment.experiment_id)
        .await?;
    let pods = store
        .query_resources_by_experiment(experiment.experiment_id, ResourceKind::Pod, false)
        .await?;

    let mut items = Vec::with_capacity(names.len());
    for name in &names {
        let mut points = Vec::new();
        for pod in pods
            .iter()
            .filter(|p| p.generated_name() == Some(name.as_str()))
        {
            let samples = store.query_by_resource(pod.resource_id).await?;
            points.extend(samples.iter().map(UsagePoint::from));
        }

        let grouped = mean_by_timestamp(&points);
        items.push(align_logged(name, &grouped, config, StatusChannel::Omit)?);
    }

    Ok(assemble(ReportKind::ByWorkload, chaos_name, items))
}

/// One series per node, without application status
pub async fn by_node(
    store: &dyn SampleStore,
    chaos_name: &str,
    config: &AlignmentConfig,
) -> Result<Report> {
    let experiment = resolve_experiment(store, chaos_name).await?;
    let nodes = store
        .query_resources_by_experiment(experiment.experiment_id, ResourceKind::Node, false)
        .await?;

    let items = align_resources(store, &nodes, config, StatusChannel::Omit).await?;
    Ok(assemble(ReportKind::ByNode, chaos_name, items))
}

/// Collapse points sharing a timestamp into their integer mean
///
/// Output keeps the order in which each timestamp was first seen. Means
/// truncate toward zero and the status channel is dropped. Sums are kept in
/// `i128`, so any mix of `i64` gauges averages without overflow.
pub fn mean_by_timestamp(points: &[UsagePoint]) -> Vec<UsagePoint> {
    let mut buckets: Vec<(NaiveDateTime, i128, i128, i128)> = Vec::new();

    for point in points {
        match buckets
            .iter_mut()
            .find(|(time, ..)| *time == point.measurement_time)
        {
            Some((_, cpu, memory, count)) => {
                *cpu += i128::from(point.cpu);
                *memory += i128::from(point.memory);
                *count += 1;
            }
            None => buckets.push((
                point.measurement_time,
                i128::from(point.cpu),
                i128::from(point.memory),
                1,
            )),
        }
    }

    buckets
        .into_iter()
        .map(|(measurement_time, cpu, memory, count)| UsagePoint {
            measurement_time,
            cpu: narrow_mean(cpu, count),
            memory: narrow_mean(memory, count),
            app_status: None,
        })
        .collect()
}

/// The mean of `i64` values always lies within `i64`
fn narrow_mean(sum: i128, count: i128) -> i64 {
    let mean = sum / count;
    i64::try_from(mean).unwrap_or(if mean < 0 { i64::MIN } else { i64::MAX })
}

async fn resolve_experiment(store: &dyn SampleStore, chaos_name: &str) -> Result<ChaosExperiment> {
    store
        .find_experiment_by_name(chaos_name)
        .await?
        .ok_or_else(|| ChaosError::NotFound(chaos_name.to_string()))
}

async fn align_resources(
    store: &dyn SampleStore,
    resources: &[ChaosResource],
    config: &AlignmentConfig,
    status: StatusChannel,
) -> Result<Vec<AlignedSeries>> {
    let mut items = Vec::with_capacity(resources.len());
    for resource in resources {
        let samples = store.query_by_resource(resource.resource_id).await?;
        let points: Vec<UsagePoint> = samples.iter().map(UsagePoint::from).collect();
        items.push(align_logged(&resource.resource_name, &points, config, status)?);
    }
    Ok(items)
}

fn align_logged(
    label: &str,
    points: &[UsagePoint],
    config: &AlignmentConfig,
    status: StatusChannel,
) -> Result<AlignedSeries> {
    let series = align(label, points, config, status)?;
    debug!(
        resource = %label,
        samples = points.len(),
        alignment = ?series.alignment,
        sentinel_slots = series.sentinel_slots(),
        "Aligned resource series"
    );
    Ok(series)
}

fn assemble(kind: ReportKind, chaos_name: &str, items: Vec<AlignedSeries>) -> Report {
    let time = items
        .first()
        .map(|first| first.time_axis.clone())
        .unwrap_or_default();

    Report {
        kind,
        chaos_name: chaos_name.to_string(),
        time,
        items,
    }
}
