//! Ingestion of raw usage samples
//!
//! Samples are written one by one with upsert semantics. A batch is not
//! atomic: the first failing write stops the batch and everything written
//! before it stays in the store.

use crate::error::{ChaosError, Result};
use crate::models::RawSample;
use crate::store::SampleStore;
use serde::{Deserialize, Serialize};

/// Outcome of a fully written batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub written: usize,
}

pub async fn ingest(store: &dyn SampleStore, batch: &[RawSample]) -> Result<IngestSummary> {
    for (written, sample) in batch.iter().enumerate() {
        if let Err(source) = store.upsert(sample).await {
            return Err(ChaosError::PartialIngestionFailure {
                written,
                total: batch.len(),
                failed_resource: sample.resource_id,
                source,
            });
        }
    }

    Ok(IngestSummary {
        written: batch.len(),
    })
}
