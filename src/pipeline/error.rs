//! Error types for the experiment pipeline.
//!
//! Every fatal condition a stage can raise is a variant of [`PipelineError`].
//! Non-fatal training diagnostics are not errors; see
//! [`ConvergenceWarning`](crate::pipeline::ConvergenceWarning).

use thiserror::Error;

/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input does not have the expected shape: a required column is absent,
    /// a column is not numeric, the label is not 0/1, or the file format is
    /// unsupported.
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// A column contains null values. The dataset is asserted complete
    /// upstream, so nulls are rejected instead of imputed.
    #[error("Missing data: column '{column}' contains {count} null value(s)")]
    MissingData {
        /// Column holding the nulls
        column: String,
        /// Number of null entries
        count: usize,
    },

    /// A requested feature column does not exist in the dataset.
    #[error("Unknown feature '{name}'. Available columns: {available:?}")]
    UnknownFeature {
        /// Requested column name
        name: String,
        /// Columns present in the dataset
        available: Vec<String>,
    },

    /// A requested feature is known only after the outcome occurs.
    #[error("Feature '{0}' leaks the target and cannot be used as a model input")]
    LeakageFeature(String),

    /// A split or evaluation would leave a subset without both classes.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The model configuration is structurally invalid or training diverged.
    #[error("Training error: {0}")]
    Training(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure inside polars while reading or reshaping a frame.
    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Result alias used throughout the pipeline.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
