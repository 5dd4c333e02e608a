//! Alignment engine
//!
//! Rebuilds a fixed-length, cadence-aligned series from the irregular samples
//! collected for one resource during a chaos run. Two branches exist:
//! - exact: the sample count equals the expected count, so the store order is
//!   taken as the time axis without further checks
//! - synthesized: any other count; the axis is generated from the first
//!   sample on the cadence grid and unmatched slots hold [`SENTINEL`]

use crate::error::{ChaosError, Result};
use crate::models::{measurement_time, AlignedSeries, AlignmentBranch, UsagePoint, SENTINEL};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Default number of slots in a series (one minute at a 10 s cadence)
pub const DEFAULT_EXPECTED_SAMPLES: usize = 6;

/// Default interval between consecutive samples
pub const DEFAULT_CADENCE_SECS: u32 = 10;

/// Shape of the aligned series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub expected_count: usize,
    pub cadence_secs: u32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            expected_count: DEFAULT_EXPECTED_SAMPLES,
            cadence_secs: DEFAULT_CADENCE_SECS,
        }
    }
}

impl AlignmentConfig {
    pub fn new(expected_count: usize, cadence_secs: u32) -> Result<Self> {
        let config = Self {
            expected_count,
            cadence_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.expected_count == 0 {
            return Err(ChaosError::InvalidConfig(
                "expected sample count must be at least 1".to_string(),
            ));
        }
        if self.cadence_secs == 0 {
            return Err(ChaosError::InvalidConfig(
                "sample cadence must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cadence(&self) -> Duration {
        Duration::seconds(i64::from(self.cadence_secs))
    }

    /// Slot timestamps anchored at `origin`
    ///
    /// Fails when a slot would fall outside the range chrono can represent.
    pub fn grid(&self, origin: NaiveDateTime) -> Result<Vec<NaiveDateTime>> {
        let cadence = self.cadence();
        let mut slots = Vec::with_capacity(self.expected_count);
        let mut current = origin;

        for slot in 0..self.expected_count {
            if slot > 0 {
                current = current.checked_add_signed(cadence).ok_or_else(|| {
                    ChaosError::InvalidRequest(format!(
                        "time axis starting at {} leaves the supported date range",
                        measurement_time::format(&origin)
                    ))
                })?;
            }
            slots.push(current);
        }

        Ok(slots)
    }
}

/// Whether the series carries the application status channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChannel {
    Include,
    Omit,
}

/// Align one resource's samples, given in store arrival order
pub fn align(
    label: &str,
    points: &[UsagePoint],
    config: &AlignmentConfig,
    status: StatusChannel,
) -> Result<AlignedSeries> {
    let first = points.first().ok_or_else(|| ChaosError::EmptySampleSet {
        resource: label.to_string(),
    })?;

    let (alignment, time_axis, slots): (_, Vec<NaiveDateTime>, Vec<Option<&UsagePoint>>) =
        if points.len() == config.expected_count {
            (
                AlignmentBranch::Exact,
                points.iter().map(|p| p.measurement_time).collect(),
                points.iter().map(Some).collect(),
            )
        } else {
            let grid = config.grid(first.measurement_time)?;
            // First match wins; samples off the grid are ignored
            let slots = grid
                .iter()
                .map(|slot| points.iter().find(|p| p.measurement_time == *slot))
                .collect();
            (AlignmentBranch::Synthesized, grid, slots)
        };

    let channel = |value: fn(&UsagePoint) -> i64| -> Vec<i64> {
        slots
            .iter()
            .map(|slot| slot.map(value).unwrap_or(SENTINEL))
            .collect()
    };

    let cpu = channel(|p| p.cpu);
    let memory = channel(|p| p.memory);
    let app_status = match status {
        StatusChannel::Include => Some(channel(|p| p.app_status.unwrap_or(SENTINEL))),
        StatusChannel::Omit => None,
    };

    Ok(AlignedSeries {
        resource_label: label.to_string(),
        alignment,
        time_axis,
        cpu,
        memory,
        app_status,
    })
}
