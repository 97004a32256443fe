//! Dataset loader for CSV and Parquet files
//!
//! Raw clinical headers are mapped onto canonical names, every column is cast
//! to `Float64`, and the frame is checked for completeness and a binary label
//! before a [`Dataset`] is handed to the rest of the pipeline.

use polars::prelude::*;
use std::path::Path;

use super::error::{PipelineError, PipelineResult};
use super::missing::ensure_complete;
use super::target::{extract_binary_labels, ClassBalance, TARGET_COLUMN};

/// Raw header to canonical column name
pub const RAW_COLUMN_MAP: &[(&str, &str)] = &[
    ("TIME", "time"),
    ("Event", "death_event"),
    ("Gender", "sex"),
    ("Smoking", "smoking"),
    ("Diabetes", "diabetes"),
    ("BP", "high_blood_pressure"),
    ("Anaemia", "anaemia"),
    ("Age", "age"),
    ("Ejection.Fraction", "ejection_fraction"),
    ("Sodium", "serum_sodium"),
    ("Creatinine", "serum_creatinine"),
    ("Pletelets", "platelets"),
    ("CPK", "creatinine_phosphokinase"),
];

/// Canonical columns every dataset must contain, in output order
pub const REQUIRED_COLUMNS: &[&str] = &[
    "age",
    "anaemia",
    "creatinine_phosphokinase",
    "diabetes",
    "ejection_fraction",
    "high_blood_pressure",
    "platelets",
    "serum_creatinine",
    "serum_sodium",
    "sex",
    "smoking",
    "time",
    "death_event",
];

/// Map a raw header to its canonical name; canonical headers pass through.
pub fn canonical_name(raw: &str) -> Option<&'static str> {
    RAW_COLUMN_MAP
        .iter()
        .find(|(r, _)| *r == raw)
        .map(|(_, c)| *c)
        .or_else(|| REQUIRED_COLUMNS.iter().find(|c| **c == raw).copied())
}

/// A validated clinical table with canonical, all-`Float64` columns.
///
/// Read-only after load, apart from derived columns appended by the feature
/// stage through [`Dataset::with_derived_column`].
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    /// Canonicalize and validate a raw frame.
    ///
    /// Columns that do not map to a required name are dropped.
    pub fn from_frame(raw: &DataFrame) -> PipelineResult<Self> {
        let mut columns: Vec<Column> = Vec::with_capacity(REQUIRED_COLUMNS.len());

        for &canonical in REQUIRED_COLUMNS {
            let source = raw
                .get_columns()
                .iter()
                .find(|c| canonical_name(c.name().as_str()) == Some(canonical))
                .ok_or_else(|| {
                    PipelineError::DataFormat(format!(
                        "Required column '{}' not found (columns present: {:?})",
                        canonical,
                        raw.get_column_names()
                    ))
                })?;

            if !source.dtype().is_primitive_numeric() && !source.dtype().is_bool() {
                return Err(PipelineError::DataFormat(format!(
                    "Column '{}' must be numeric, found {}",
                    source.name(),
                    source.dtype()
                )));
            }

            let values: Vec<Option<f64>> = source
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .collect();
            columns.push(Column::new(canonical.into(), values));
        }

        let frame = DataFrame::new(columns)?;
        ensure_complete(&frame)?;
        extract_binary_labels(&frame, TARGET_COLUMN)?;

        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Values of a column as `f64`.
    ///
    /// Fails with [`PipelineError::UnknownFeature`] if the column is absent.
    pub fn column_values(&self, name: &str) -> PipelineResult<Vec<f64>> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| PipelineError::UnknownFeature {
                name: name.to_string(),
                available: self.column_names(),
            })?;

        Ok(column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// Outcome labels (0/1)
    pub fn labels(&self) -> PipelineResult<Vec<u8>> {
        extract_binary_labels(&self.frame, TARGET_COLUMN)
    }

    pub fn class_balance(&self) -> PipelineResult<ClassBalance> {
        Ok(ClassBalance::from_labels(&self.labels()?))
    }

    /// Return a copy of the dataset with an extra derived column
    pub fn with_derived_column(&self, name: &str, values: Vec<f64>) -> PipelineResult<Self> {
        if values.len() != self.height() {
            return Err(PipelineError::DataFormat(format!(
                "Derived column '{}' has {} values, dataset has {} rows",
                name,
                values.len(),
                self.height()
            )));
        }
        let mut frame = self.frame.clone();
        frame.with_column(Column::new(name.into(), values))?;
        Ok(Self { frame })
    }
}

/// Read a CSV or Parquet file into a raw frame, dispatching on extension.
///
/// `infer_schema_length` of 0 scans the full file.
pub fn read_frame(path: &Path, infer_schema_length: usize) -> PipelineResult<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())?,
        _ => {
            return Err(PipelineError::DataFormat(format!(
                "Unsupported file format: '{}'. Supported formats: csv, parquet",
                extension
            )))
        }
    };

    Ok(lf.collect()?)
}

/// Load and validate a dataset from disk
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> PipelineResult<Dataset> {
    if !path.exists() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input file not found: {}", path.display()),
        )));
    }
    let raw = read_frame(path, infer_schema_length)?;
    Dataset::from_frame(&raw)
}
