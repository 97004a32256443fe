//! Pearson correlation between dataset columns

use faer::Mat;
use rayon::prelude::*;
use serde::Serialize;

use super::error::{PipelineError, PipelineResult};
use super::loader::Dataset;

/// Represents a correlated pair of columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// Square correlation matrix over named columns
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// Row-major, `values[i][j]` is the correlation of `names[i]` and `names[j]`
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }

    /// Correlation of every other column with `target`, sorted by absolute
    /// value descending
    pub fn with_target(&self, target: &str) -> Vec<(String, f64)> {
        let Some(t) = self.names.iter().position(|n| n == target) else {
            return Vec::new();
        };
        let mut out: Vec<(String, f64)> = self
            .names
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != t)
            .map(|(i, name)| (name.clone(), self.values[t][i]))
            .collect();
        out.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        out
    }

    /// Off-diagonal pairs with `|r| > threshold`, strongest first
    pub fn pairs_above(&self, threshold: f64) -> Vec<CorrelatedPair> {
        let n = self.names.len();
        let mut pairs = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let corr = self.values[i][j];
                if corr.abs() > threshold {
                    pairs.push(CorrelatedPair {
                        feature1: self.names[i].clone(),
                        feature2: self.names[j].clone(),
                        correlation: corr,
                    });
                }
            }
        }
        pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
        pairs
    }
}

/// Standardize one column so that `z^T z` over two columns is their Pearson r.
///
/// Constant columns become all zeros and therefore correlate 0 with
/// everything.
fn standardize(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / (std * n.sqrt())).collect()
}

/// Compute the correlation matrix of every dataset column.
///
/// Columns are standardized in parallel into Z, then R = Z^T Z.
pub fn correlation_matrix(dataset: &Dataset) -> PipelineResult<CorrelationMatrix> {
    if dataset.height() < 2 {
        return Err(PipelineError::InsufficientData(
            "correlation needs at least two rows".to_string(),
        ));
    }
    let names = dataset.column_names();
    let columns = names
        .iter()
        .map(|n| dataset.column_values(n))
        .collect::<PipelineResult<Vec<_>>>()?;

    let standardized: Vec<Vec<f64>> = columns.par_iter().map(|c| standardize(c)).collect();

    let n_rows = dataset.height();
    let mut z = Mat::<f64>::zeros(n_rows, names.len());
    for (col_idx, col) in standardized.iter().enumerate() {
        for (row_idx, &val) in col.iter().enumerate() {
            z[(row_idx, col_idx)] = val;
        }
    }
    let r = z.transpose() * &z;

    let values = (0..names.len())
        .map(|i| {
            (0..names.len())
                .map(|j| if i == j { 1.0 } else { r[(i, j)].clamp(-1.0, 1.0) })
                .collect()
        })
        .collect();

    Ok(CorrelationMatrix { names, values })
}
