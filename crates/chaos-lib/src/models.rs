//! Core data models for chaos resource usage

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout shared by ingestion payloads and report time axes
pub const MEASUREMENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Value stored in an aligned slot that has no matching sample
pub const SENTINEL: i64 = -1;

pub type ResourceId = i64;
pub type ExperimentId = i64;

/// One CPU/memory/liveness measurement for a chaos target
///
/// `(resource_id, measurement_time)` is the storage key: writing the same key
/// twice replaces the first sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    pub resource_id: ResourceId,
    #[serde(with = "measurement_time")]
    pub measurement_time: NaiveDateTime,
    pub cpu: i64,
    pub memory: i64,
    /// Application health code, only reported for pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_status: Option<i64>,
}

impl RawSample {
    pub fn point(&self) -> UsagePoint {
        UsagePoint {
            measurement_time: self.measurement_time,
            cpu: self.cpu,
            memory: self.memory,
            app_status: self.app_status,
        }
    }
}

/// Resource-independent view of a sample, as consumed by the alignment engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsagePoint {
    pub measurement_time: NaiveDateTime,
    pub cpu: i64,
    pub memory: i64,
    pub app_status: Option<i64>,
}

impl From<&RawSample> for UsagePoint {
    fn from(sample: &RawSample) -> Self {
        sample.point()
    }
}

/// Kind of chaos target, used to filter store queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pod,
    Node,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Node => "node",
        }
    }
}

/// Kind-specific attributes of a chaos target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResourceTarget {
    #[serde(rename_all = "camelCase")]
    Pod {
        /// Name prefix shared by every replica of the owning workload
        generated_name: String,
        /// Whether the pod was picked for the by-pod report
        #[serde(default)]
        selected: bool,
    },
    Node,
}

impl ResourceTarget {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceTarget::Pod { .. } => ResourceKind::Pod,
            ResourceTarget::Node => ResourceKind::Node,
        }
    }
}

/// Resource definition supplied when an experiment is registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    pub resource_name: String,
    #[serde(flatten)]
    pub target: ResourceTarget,
}

/// A pod or node targeted by a chaos experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosResource {
    pub resource_id: ResourceId,
    pub chaos_experiment_id: ExperimentId,
    pub resource_name: String,
    #[serde(flatten)]
    pub target: ResourceTarget,
}

impl ChaosResource {
    pub fn kind(&self) -> ResourceKind {
        self.target.kind()
    }

    pub fn generated_name(&self) -> Option<&str> {
        match &self.target {
            ResourceTarget::Pod { generated_name, .. } if !generated_name.is_empty() => {
                Some(generated_name)
            }
            _ => None,
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self.target, ResourceTarget::Pod { selected: true, .. })
    }
}

/// Descriptive fields of a StressChaos run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSpec {
    pub chaos_name: String,
    pub namespace: String,
    #[serde(with = "measurement_time")]
    pub creation_time: NaiveDateTime,
    #[serde(default, with = "measurement_time::option")]
    pub end_time: Option<NaiveDateTime>,
    /// Fault duration as declared on the chaos object (e.g. "60s")
    #[serde(default)]
    pub duration: String,
}

/// A registered StressChaos run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosExperiment {
    pub experiment_id: ExperimentId,
    #[serde(flatten)]
    pub spec: ExperimentSpec,
}

/// Which alignment branch produced a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentBranch {
    /// Sample count matched the expected count; store order kept as-is
    Exact,
    /// Axis rebuilt from the first sample on the cadence grid
    Synthesized,
}

/// Fixed-length usage series for one resource, ready for charting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedSeries {
    pub resource_label: String,
    pub alignment: AlignmentBranch,
    #[serde(with = "measurement_time::sequence")]
    pub time_axis: Vec<NaiveDateTime>,
    pub cpu: Vec<i64>,
    pub memory: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_status: Option<Vec<i64>>,
}

impl AlignedSeries {
    /// Number of slots across all channels holding the sentinel
    pub fn sentinel_slots(&self) -> usize {
        let status = self.app_status.as_deref().unwrap_or_default();
        self.cpu
            .iter()
            .chain(self.memory.iter())
            .chain(status.iter())
            .filter(|v| **v == SENTINEL)
            .count()
    }
}

/// Report flavours, each with its own resource selection rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    ByPod,
    ByWorkload,
    ByNode,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::ByPod => "by_pod",
            ReportKind::ByWorkload => "by_workload",
            ReportKind::ByNode => "by_node",
        }
    }
}

/// Aligned series for every resource of one experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub kind: ReportKind,
    pub chaos_name: String,
    /// Display axis, taken from the first resolved resource
    #[serde(with = "measurement_time::sequence")]
    pub time: Vec<NaiveDateTime>,
    pub items: Vec<AlignedSeries>,
}

/// Serde helpers for timestamps in [`MEASUREMENT_TIME_FORMAT`]
pub mod measurement_time {
    use super::MEASUREMENT_TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn format(time: &NaiveDateTime) -> String {
        time.format(MEASUREMENT_TIME_FORMAT).to_string()
    }

    pub fn parse(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(value, MEASUREMENT_TIME_FORMAT)
    }

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => serializer.serialize_some(&format(time)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| parse(&raw).map_err(D::Error::custom))
                .transpose()
        }
    }

    pub mod sequence {
        use super::*;

        pub fn serialize<S: Serializer>(
            times: &[NaiveDateTime],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(times.iter().map(format))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<NaiveDateTime>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|raw| parse(raw).map_err(D::Error::custom))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sample_wire_format() {
        let json = r#"{"resourceId":7,"measurementTime":"2024-09-12T10:00:10","cpu":120,"memory":2048,"appStatus":1}"#;
        let sample: RawSample = serde_json::from_str(json).unwrap();

        assert_eq!(sample.resource_id, 7);
        assert_eq!(
            measurement_time::format(&sample.measurement_time),
            "2024-09-12T10:00:10"
        );
        assert_eq!(sample.app_status, Some(1));
        assert_eq!(serde_json::to_string(&sample).unwrap(), json);
    }

    #[test]
    fn test_raw_sample_rejects_other_time_layouts() {
        let json = r#"{"resourceId":7,"measurementTime":"2024-09-12 10:00:10","cpu":1,"memory":1}"#;
        assert!(serde_json::from_str::<RawSample>(json).is_err());
    }

    #[test]
    fn test_resource_target_tagging() {
        let pod: NewResource = serde_json::from_str(
            r#"{"resourceName":"nginx-7d9f-abcde","type":"pod","generatedName":"nginx-7d9f-","selected":true}"#,
        )
        .unwrap();
        assert_eq!(pod.target.kind(), ResourceKind::Pod);

        let node: NewResource =
            serde_json::from_str(r#"{"resourceName":"worker-1","type":"node"}"#).unwrap();
        assert_eq!(node.target, ResourceTarget::Node);
    }

    #[test]
    fn test_generated_name_absent_for_nodes_and_blank_pods() {
        let node = ChaosResource {
            resource_id: 1,
            chaos_experiment_id: 1,
            resource_name: "worker-1".to_string(),
            target: ResourceTarget::Node,
        };
        let blank_pod = ChaosResource {
            resource_id: 2,
            chaos_experiment_id: 1,
            resource_name: "standalone".to_string(),
            target: ResourceTarget::Pod {
                generated_name: String::new(),
                selected: false,
            },
        };

        assert_eq!(node.generated_name(), None);
        assert_eq!(blank_pod.generated_name(), None);
        assert!(!blank_pod.is_selected());
    }

    #[test]
    fn test_sentinel_slots_counts_every_channel() {
        let t0 = measurement_time::parse("2024-09-12T10:00:00").unwrap();
        let series = AlignedSeries {
            resource_label: "p1".to_string(),
            alignment: AlignmentBranch::Synthesized,
            time_axis: vec![t0, t0 + chrono::Duration::seconds(10)],
            cpu: vec![5, SENTINEL],
            memory: vec![6, SENTINEL],
            app_status: Some(vec![1, SENTINEL]),
        };

        assert_eq!(series.sentinel_slots(), 3);
    }
}
