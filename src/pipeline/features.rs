//! Feature selection and derived features
//!
//! A [`FeaturePolicy`] turns a [`Dataset`] into a [`FeatureSet`]: an ordered
//! row-major matrix of model inputs with the outcome label split out.

use serde::Serialize;

use super::error::{PipelineError, PipelineResult};
use super::loader::Dataset;
use super::target::TARGET_COLUMN;

/// Columns known only after the outcome occurs. Never usable as inputs.
pub const LEAKAGE_COLUMNS: &[&str] = &["time"];

/// Columns of the three-feature baseline model
pub const BASELINE_FEATURES: &[&str] = &["age", "ejection_fraction", "serum_creatinine"];

/// Every non-leakage clinical column
pub const CLINICAL_FEATURES: &[&str] = &[
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
];

/// Pairwise products: `(name, left, right)`
pub const INTERACTIONS: &[(&str, &str, &str)] = &[
    ("age_x_creat", "age", "serum_creatinine"),
    ("ef_x_sodium", "ejection_fraction", "serum_sodium"),
    ("age_x_ef", "age", "ejection_fraction"),
];

/// Fixed clinical bins for a continuous column.
///
/// `edges` has one more entry than there are bins. Bins are half-open
/// `[lo, hi)` except the last, which is closed.
#[derive(Debug, Clone, Copy)]
pub struct Discretization {
    pub name: &'static str,
    pub source: &'static str,
    pub edges: &'static [f64],
}

pub const DISCRETIZATIONS: &[Discretization] = &[
    Discretization {
        name: "age_cat",
        source: "age",
        edges: &[0.0, 60.0, 80.0, 100.0],
    },
    Discretization {
        name: "ef_cat",
        source: "ejection_fraction",
        edges: &[0.0, 30.0, 45.0, 100.0],
    },
    Discretization {
        name: "creat_cat",
        source: "serum_creatinine",
        edges: &[0.0, 1.2, 3.0, 10.0],
    },
];

impl Discretization {
    /// Bin index of `value`, or `None` outside the outer edges
    pub fn bin(&self, value: f64) -> Option<usize> {
        let n_bins = self.edges.len() - 1;
        let (first, last) = (self.edges[0], self.edges[n_bins]);
        if !(value >= first && value <= last) {
            return None;
        }
        if value == last {
            return Some(n_bins - 1);
        }
        self.edges.windows(2).position(|w| value >= w[0] && value < w[1])
    }

    fn apply(&self, values: &[f64]) -> PipelineResult<Vec<f64>> {
        values
            .iter()
            .map(|&v| {
                self.bin(v).map(|b| b as f64).ok_or_else(|| {
                    PipelineError::DataFormat(format!(
                        "Value {} of '{}' lies outside the bins of '{}' [{}, {}]",
                        v,
                        self.source,
                        self.name,
                        self.edges[0],
                        self.edges[self.edges.len() - 1]
                    ))
                })
            })
            .collect()
    }
}

/// How the feature matrix is derived from the dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "policy", content = "columns", rename_all = "snake_case")]
pub enum FeaturePolicy {
    /// Age, ejection fraction, serum creatinine
    Baseline,
    /// The three binned baseline columns only
    Discretized,
    /// Baseline plus the interaction products
    Interactions,
    /// All clinical columns plus the interaction products
    Full,
    /// An explicit column selection
    Columns(Vec<String>),
}

impl FeaturePolicy {
    pub fn label(&self) -> String {
        match self {
            FeaturePolicy::Baseline => "baseline".to_string(),
            FeaturePolicy::Discretized => "discretized".to_string(),
            FeaturePolicy::Interactions => "interactions".to_string(),
            FeaturePolicy::Full => "full".to_string(),
            FeaturePolicy::Columns(cols) => format!("columns({})", cols.join(", ")),
        }
    }
}

/// Named, ordered model inputs plus the separated label vector
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub names: Vec<String>,
    /// Row-major: `rows[i][j]` is feature `j` of sample `i`
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl FeatureSet {
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Values of one feature across samples
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[index]).collect()
    }
}

fn check_requested(dataset: &Dataset, name: &str) -> PipelineResult<()> {
    if LEAKAGE_COLUMNS.contains(&name) {
        return Err(PipelineError::LeakageFeature(name.to_string()));
    }
    if name == TARGET_COLUMN {
        return Err(PipelineError::LeakageFeature(name.to_string()));
    }
    if !dataset.has_column(name) {
        return Err(PipelineError::UnknownFeature {
            name: name.to_string(),
            available: dataset.column_names(),
        });
    }
    Ok(())
}

fn with_interactions(dataset: &Dataset) -> PipelineResult<Dataset> {
    let mut extended = dataset.clone();
    for &(name, left, right) in INTERACTIONS {
        let a = extended.column_values(left)?;
        let b = extended.column_values(right)?;
        let product = a.iter().zip(&b).map(|(x, y)| x * y).collect();
        extended = extended.with_derived_column(name, product)?;
    }
    Ok(extended)
}

fn with_discretizations(dataset: &Dataset) -> PipelineResult<Dataset> {
    let mut extended = dataset.clone();
    for bins in DISCRETIZATIONS {
        let binned = bins.apply(&extended.column_values(bins.source)?)?;
        extended = extended.with_derived_column(bins.name, binned)?;
    }
    Ok(extended)
}

fn interaction_names() -> impl Iterator<Item = String> {
    INTERACTIONS.iter().map(|(name, _, _)| name.to_string())
}

/// Build the feature matrix for `policy`.
///
/// Errors with [`PipelineError::LeakageFeature`] if a leakage column (or the
/// label itself) is requested and [`PipelineError::UnknownFeature`] if a
/// column is absent.
pub fn build_feature_set(dataset: &Dataset, policy: &FeaturePolicy) -> PipelineResult<FeatureSet> {
    let owned = |cols: &[&str]| cols.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let (source, names): (Dataset, Vec<String>) = match policy {
        FeaturePolicy::Baseline => (dataset.clone(), owned(BASELINE_FEATURES)),
        FeaturePolicy::Discretized => (
            with_discretizations(dataset)?,
            DISCRETIZATIONS.iter().map(|d| d.name.to_string()).collect(),
        ),
        FeaturePolicy::Interactions => {
            let mut names = owned(BASELINE_FEATURES);
            names.extend(interaction_names());
            (with_interactions(dataset)?, names)
        }
        FeaturePolicy::Full => {
            let mut names = owned(CLINICAL_FEATURES);
            names.extend(interaction_names());
            (with_interactions(dataset)?, names)
        }
        FeaturePolicy::Columns(cols) => {
            if cols.is_empty() {
                return Err(PipelineError::DataFormat(
                    "Explicit column selection is empty".to_string(),
                ));
            }
            (dataset.clone(), cols.clone())
        }
    };

    for name in &names {
        check_requested(&source, name)?;
    }

    let columns: Vec<Vec<f64>> = names
        .iter()
        .map(|n| source.column_values(n))
        .collect::<PipelineResult<_>>()?;

    let rows = (0..source.height())
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect();

    Ok(FeatureSet {
        names,
        rows,
        labels: source.labels()?,
    })
}
