//! Descriptive statistics of a loaded dataset
//!
//! Whole-cohort summaries, the same summaries split by outcome, Welch t-tests
//! for continuous columns and chi-square tests of independence for binary
//! columns.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

use super::correlation::{correlation_matrix, CorrelatedPair};
use super::error::{PipelineError, PipelineResult};
use super::loader::Dataset;
use super::target::{ClassBalance, TARGET_COLUMN};

/// Pairs above this absolute correlation are listed in the profile
pub const STRONG_CORRELATION: f64 = 0.3;

/// Continuous columns compared between outcomes with a t-test
pub const NUMERICAL_COLUMNS: &[&str] = &[
    "age",
    "ejection_fraction",
    "serum_creatinine",
    "serum_sodium",
    "platelets",
    "creatinine_phosphokinase",
    "time",
];

/// 0/1 columns tested for independence from the outcome
pub const BINARY_COLUMNS: &[&str] = &["sex", "smoking", "diabetes", "high_blood_pressure", "anaemia"];

/// Summary of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// A continuous column summarized per outcome, with Welch's t-test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeComparison {
    pub column: String,
    pub survived: ColumnSummary,
    pub died: ColumnSummary,
    /// Mean of survivors minus mean of deaths over the unpooled standard error
    pub t_statistic: Option<f64>,
    /// Welch-Satterthwaite degrees of freedom
    pub degrees_of_freedom: Option<f64>,
    /// Two-sided
    pub p_value: Option<f64>,
}

/// Chi-square test of independence between a binary column and the outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationTest {
    pub column: String,
    /// `contingency[value][outcome]`
    pub contingency: [[usize; 2]; 2],
    /// With Yates' continuity correction
    pub chi_square: Option<f64>,
    pub p_value: Option<f64>,
}

/// Everything `describe` reports about a dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
    pub class_balance: ClassBalance,
    /// Correlation of each column with the outcome, strongest first
    pub target_correlations: Vec<(String, f64)>,
    pub strong_pairs: Vec<CorrelatedPair>,
    /// Empty when only one outcome is present
    pub by_outcome: Vec<OutcomeComparison>,
    pub binary_associations: Vec<AssociationTest>,
}

/// Quantile with linear interpolation between closest ranks
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn summarize_column(name: &str, values: &[f64]) -> PipelineResult<ColumnSummary> {
    if values.is_empty() {
        return Err(PipelineError::InsufficientData(format!(
            "column '{}' has no values",
            name
        )));
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(ColumnSummary {
        name: name.to_string(),
        count: values.len(),
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

/// Welch's unequal-variance t-test of `a` against `b`.
///
/// Returns `(t, df, two-sided p)`, or `None` when either group has fewer
/// than two values or both groups are constant.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> PipelineResult<Option<(f64, f64, f64)>> {
    if a.len() < 2 || b.len() < 2 {
        return Ok(None);
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (se1, se2) = (sample_variance(a) / n1, sample_variance(b) / n2);
    let se = se1 + se2;
    if se <= 0.0 {
        return Ok(None);
    }

    let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
    let t = (mean(a) - mean(b)) / se.sqrt();
    let df = se.powi(2) / (se1.powi(2) / (n1 - 1.0) + se2.powi(2) / (n2 - 1.0));

    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| PipelineError::InsufficientData(format!("t distribution: {}", e)))?;
    Ok(Some((t, df, 2.0 * dist.sf(t.abs()))))
}

/// Chi-square statistic of a 2x2 table with Yates' correction, and its p-value.
///
/// `None` when a row or column total is zero.
pub fn chi_square_2x2(table: &[[usize; 2]; 2]) -> PipelineResult<Option<(f64, f64)>> {
    let rows = [table[0][0] + table[0][1], table[1][0] + table[1][1]];
    let cols = [table[0][0] + table[1][0], table[0][1] + table[1][1]];
    let total = (rows[0] + rows[1]) as f64;
    if rows.contains(&0) || cols.contains(&0) {
        return Ok(None);
    }

    let mut statistic = 0.0;
    for (i, row) in table.iter().enumerate() {
        for (j, &observed) in row.iter().enumerate() {
            let expected = rows[i] as f64 * cols[j] as f64 / total;
            // observed moves toward expected by at most 0.5
            let corrected = ((expected - observed as f64).abs() - 0.5).max(0.0);
            statistic += corrected.powi(2) / expected;
        }
    }

    let dist = ChiSquared::new(1.0)
        .map_err(|e| PipelineError::InsufficientData(format!("chi-square distribution: {}", e)))?;
    Ok(Some((statistic, dist.sf(statistic))))
}

fn split_by_outcome(values: &[f64], labels: &[u8]) -> (Vec<f64>, Vec<f64>) {
    let mut survived = Vec::new();
    let mut died = Vec::new();
    for (&v, &y) in values.iter().zip(labels) {
        if y == 1 {
            died.push(v);
        } else {
            survived.push(v);
        }
    }
    (survived, died)
}

fn compare_outcomes(dataset: &Dataset, labels: &[u8]) -> PipelineResult<Vec<OutcomeComparison>> {
    NUMERICAL_COLUMNS
        .iter()
        .map(|&name| {
            let (survived, died) = split_by_outcome(&dataset.column_values(name)?, labels);
            let test = welch_t_test(&survived, &died)?;
            Ok(OutcomeComparison {
                column: name.to_string(),
                survived: summarize_column(name, &survived)?,
                died: summarize_column(name, &died)?,
                t_statistic: test.map(|(t, _, _)| t),
                degrees_of_freedom: test.map(|(_, df, _)| df),
                p_value: test.map(|(_, _, p)| p),
            })
        })
        .collect()
}

fn test_associations(dataset: &Dataset, labels: &[u8]) -> PipelineResult<Vec<AssociationTest>> {
    BINARY_COLUMNS
        .iter()
        .map(|&name| {
            let mut contingency = [[0usize; 2]; 2];
            for (v, &y) in dataset.column_values(name)?.iter().zip(labels) {
                contingency[usize::from(*v >= 0.5)][usize::from(y == 1)] += 1;
            }
            let test = chi_square_2x2(&contingency)?;
            Ok(AssociationTest {
                column: name.to_string(),
                contingency,
                chi_square: test.map(|(chi, _)| chi),
                p_value: test.map(|(_, p)| p),
            })
        })
        .collect()
}

/// Profile every column, the class balance, outcome correlations and the
/// per-outcome comparisons
pub fn describe_dataset(dataset: &Dataset) -> PipelineResult<DatasetProfile> {
    let columns = dataset
        .column_names()
        .iter()
        .map(|name| summarize_column(name, &dataset.column_values(name)?))
        .collect::<PipelineResult<Vec<_>>>()?;

    let correlations = correlation_matrix(dataset)?;
    let class_balance = dataset.class_balance()?;
    let labels = dataset.labels()?;

    let (by_outcome, binary_associations) = if class_balance.has_both_classes() {
        (
            compare_outcomes(dataset, &labels)?,
            test_associations(dataset, &labels)?,
        )
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(DatasetProfile {
        rows: dataset.height(),
        columns,
        class_balance,
        target_correlations: correlations.with_target(TARGET_COLUMN),
        strong_pairs: correlations.pairs_above(STRONG_CORRELATION),
        by_outcome,
        binary_associations,
    })
}
