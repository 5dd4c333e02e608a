//! Error types for the store contract and the reconstruction engine

use crate::models::ResourceId;
use thiserror::Error;

/// Failure reported by a [`SampleStore`](crate::store::SampleStore)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transient failure; the same call may succeed later
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (unknown owner, duplicate key, ...)
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Errors surfaced to report and ingestion callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChaosError {
    #[error("chaos experiment not found: {0}")]
    NotFound(String),

    /// A resource had no samples, so no time origin exists for its series
    #[error("resource '{resource}' has no usage samples")]
    EmptySampleSet { resource: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Batch write stopped at the first failing item; earlier items are kept
    #[error("ingestion stopped after {written} of {total} samples (resource {failed_resource}): {source}")]
    PartialIngestionFailure {
        written: usize,
        total: usize,
        failed_resource: ResourceId,
        #[source]
        source: StoreError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChaosError {
    /// True when retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ChaosError::StoreUnavailable(_) => true,
            ChaosError::PartialIngestionFailure { source, .. } => {
                matches!(source, StoreError::Unavailable(_))
            }
            _ => false,
        }
    }
}

impl From<StoreError> for ChaosError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => ChaosError::StoreUnavailable(reason),
            StoreError::Rejected(reason) => ChaosError::InvalidRequest(reason),
        }
    }
}

pub type Result<T, E = ChaosError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_unavailable_is_retryable() {
        let err: ChaosError = StoreError::Unavailable("connection reset".into()).into();
        assert!(err.is_retryable());
        assert!(!ChaosError::NotFound("exp1".into()).is_retryable());
    }

    #[test]
    fn test_partial_ingestion_retryable_follows_cause() {
        let transient = ChaosError::PartialIngestionFailure {
            written: 2,
            total: 5,
            failed_resource: 9,
            source: StoreError::Unavailable("timeout".into()),
        };
        let rejected = ChaosError::PartialIngestionFailure {
            written: 2,
            total: 5,
            failed_resource: 9,
            source: StoreError::Rejected("unknown resource 9".into()),
        };

        assert!(transient.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(transient.to_string().contains("after 2 of 5"));
    }
}
