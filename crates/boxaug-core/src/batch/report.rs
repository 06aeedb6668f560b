//! Per-item outcome of a batch run.

use std::path::PathBuf;

use super::BatchError;

/// Files written for one variant of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOutput {
    /// Variant index (0-7 for the standard plan).
    pub index: usize,
    pub image: PathBuf,
    pub annotation: PathBuf,
}

/// A source annotation whose variants were all written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub annotation: PathBuf,
    pub outputs: Vec<VariantOutput>,
}

/// A source annotation that could not be processed.
#[derive(Debug)]
pub struct ItemFailure {
    pub annotation: PathBuf,
    pub error: BatchError,
}

/// Successes and failures of a batch, each sorted by annotation path.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<ItemReport>,
    pub failed: Vec<ItemFailure>,
}

impl BatchReport {
    /// Number of annotations attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when no item failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of image/annotation pairs written.
    pub fn outputs_written(&self) -> usize {
        self.succeeded.iter().map(|item| item.outputs.len()).sum()
    }
}
