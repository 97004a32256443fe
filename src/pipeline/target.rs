//! Outcome label validation
//!
//! The outcome column must be binary 0/1. This module validates it and
//! reports the class balance used by stratified splitting.

use polars::prelude::*;
use serde::Serialize;

use super::error::{PipelineError, PipelineResult};

/// Canonical name of the outcome column
pub const TARGET_COLUMN: &str = "death_event";

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Count of each outcome class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassBalance {
    /// Rows with label 0
    pub negatives: usize,
    /// Rows with label 1
    pub positives: usize,
}

impl ClassBalance {
    /// Count classes in a label vector
    pub fn from_labels(labels: &[u8]) -> Self {
        let positives = labels.iter().filter(|&&y| y == 1).count();
        Self {
            negatives: labels.len() - positives,
            positives,
        }
    }

    pub fn total(&self) -> usize {
        self.negatives + self.positives
    }

    /// Fraction of rows in the positive class (0.0 for an empty set)
    pub fn positive_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.positives as f64 / self.total() as f64
        }
    }

    /// Whether both classes are present
    pub fn has_both_classes(&self) -> bool {
        self.negatives > 0 && self.positives > 0
    }
}

/// Read a binary 0/1 column into labels.
///
/// Fails with [`PipelineError::DataFormat`] if the column holds any value
/// other than 0 or 1.
pub fn extract_binary_labels(df: &DataFrame, target: &str) -> PipelineResult<Vec<u8>> {
    let column = df.column(target).map_err(|_| {
        PipelineError::DataFormat(format!("Target column '{}' not found", target))
    })?;

    let as_f64 = column.cast(&DataType::Float64)?;
    let mut labels = Vec::with_capacity(as_f64.len());

    for (row, value) in as_f64.f64()?.into_iter().enumerate() {
        match value {
            Some(v) if v.abs() < TOLERANCE => labels.push(0),
            Some(v) if (v - 1.0).abs() < TOLERANCE => labels.push(1),
            Some(v) => {
                return Err(PipelineError::DataFormat(format!(
                    "Target column '{}' must be binary 0/1, found {} at row {}",
                    target, v, row
                )))
            }
            None => {
                return Err(PipelineError::MissingData {
                    column: target.to_string(),
                    count: column.null_count(),
                })
            }
        }
    }

    Ok(labels)
}
