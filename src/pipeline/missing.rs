//! Missing value analysis
//!
//! The clinical dataset is asserted complete upstream, so the loader uses
//! these helpers to reject (never impute) any null or NaN entry.

use polars::prelude::*;

use super::error::{PipelineError, PipelineResult};

/// Count missing values per column.
///
/// A value is missing when it is null, or NaN in a floating-point column.
/// Returns `(column, missing_count)` pairs sorted by count descending.
pub fn count_missing_values(df: &DataFrame) -> PipelineResult<Vec<(String, usize)>> {
    let mut counts: Vec<(String, usize)> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let mut missing = column.null_count();

        if matches!(column.dtype(), DataType::Float32 | DataType::Float64) {
            let as_f64 = column.cast(&DataType::Float64)?;
            missing += as_f64
                .f64()?
                .into_iter()
                .filter(|v| matches!(v, Some(x) if x.is_nan()))
                .count();
        }

        counts.push((column.name().to_string(), missing));
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

/// Fail with [`PipelineError::MissingData`] on the worst column if any value is missing
pub fn ensure_complete(df: &DataFrame) -> PipelineResult<()> {
    let counts = count_missing_values(df)?;
    match counts.into_iter().find(|(_, count)| *count > 0) {
        Some((column, count)) => Err(PipelineError::MissingData { column, count }),
        None => Ok(()),
    }
}
