use thiserror::Error;

use crate::database::StoreError;
use crate::migrations::report::BackfillSummary;

/// A batch whose commit failed, identified by its position in the run
#[derive(Debug)]
pub struct BatchFailure {
    pub batch: usize,
    pub writes: usize,
    pub source: StoreError,
}

/// Migration engine errors
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("Invalid batch size {size}: must be between 1 and {max}")]
    InvalidBatchSize { size: usize, max: usize },

    #[error("Colour palette must contain at least one colour")]
    EmptyPalette,

    #[error("Failed to fetch users: {0}")]
    Fetch(#[source] StoreError),

    #[error("Batch {batch} failed to commit: {source}")]
    Commit {
        batch: usize,
        #[source]
        source: StoreError,
    },

    #[error("{} of {} batch commits failed", .failures.len(), .total_batches)]
    PartialCommit {
        failures: Vec<BatchFailure>,
        total_batches: usize,
        summary: BackfillSummary,
    },
}

impl BackfillError {
    /// True when the caller asked for something invalid, as opposed to the
    /// store failing underneath the run
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            BackfillError::InvalidBatchSize { .. } | BackfillError::EmptyPalette
        )
    }
}
