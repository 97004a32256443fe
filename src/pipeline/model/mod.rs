//! Classifier capability shared by every model family
//!
//! Models are fit on scaled training samples, optionally monitored on a
//! validation subset, and queried for positive-class probabilities.

pub mod forest;
pub mod network;

use serde::Serialize;
use std::fmt;

use super::error::{PipelineError, PipelineResult};
use super::search::SearchSpace;
use super::split::Samples;

pub use forest::{ClassWeight, ForestParams, MaxFeatures, RandomForest};
pub use network::{Activation, NeuralNetwork, NetworkParams, Optimizer};

/// Probability strictly above which a sample is predicted positive
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Non-fatal training diagnostic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceWarning {
    /// Epochs completed when the warning was raised
    pub epochs: usize,
    pub message: String,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} epochs)", self.message, self.epochs)
    }
}

/// What happened during `fit`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingTrace {
    /// Epochs run; 0 for models trained in a single pass
    pub epochs_trained: usize,
    /// Mean training loss per epoch
    pub train_loss: Vec<f64>,
    /// Validation loss per epoch, when a validation subset was given
    pub validation_loss: Vec<f64>,
    /// Epoch (1-based) whose weights were kept
    pub best_epoch: Option<usize>,
    pub stopped_early: bool,
    pub warnings: Vec<ConvergenceWarning>,
}

impl TrainingTrace {
    pub fn final_train_loss(&self) -> Option<f64> {
        self.train_loss.last().copied()
    }

    pub fn best_validation_loss(&self) -> Option<f64> {
        self.validation_loss
            .iter()
            .copied()
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// A binary classifier over row-major `f64` features
pub trait Classifier: Send + Sync {
    fn fit(&mut self, train: &Samples, validation: Option<&Samples>) -> PipelineResult<TrainingTrace>;

    /// Positive-class probability for each row
    fn predict_proba(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<f64>>;

    /// Hard labels: 1 when the probability exceeds [`DECISION_THRESHOLD`]
    fn predict(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<u8>> {
        Ok(threshold_labels(&self.predict_proba(x)?))
    }

    /// Normalized per-feature importances, for families that have them
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Hard labels for already computed probabilities
pub fn threshold_labels(probabilities: &[f64]) -> Vec<u8> {
    probabilities
        .iter()
        .map(|&p| u8::from(p > DECISION_THRESHOLD))
        .collect()
}

/// Hyperparameters of one experiment's model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", content = "params", rename_all = "snake_case")]
pub enum ModelConfiguration {
    Forest(ForestParams),
    /// Randomized search over forest parameters, refit on the best
    ForestSearch(SearchSpace),
    Network(NetworkParams),
}

impl ModelConfiguration {
    /// Instantiate an untrained model.
    ///
    /// Search configurations are resolved by the search stage and have no
    /// direct model.
    pub fn build(&self) -> PipelineResult<Box<dyn Classifier>> {
        match self {
            ModelConfiguration::Forest(params) => Ok(Box::new(RandomForest::new(params.clone()))),
            ModelConfiguration::Network(params) => Ok(Box::new(NeuralNetwork::new(params.clone()))),
            ModelConfiguration::ForestSearch(_) => Err(PipelineError::Training(
                "a search configuration must be resolved before building a model".to_string(),
            )),
        }
    }
}

/// Reject empty, ragged, or non-finite input rows
pub(crate) fn validate_rows(x: &[Vec<f64>], expected: Option<usize>) -> PipelineResult<usize> {
    let width = match (expected, x.first()) {
        (Some(w), _) => w,
        (None, Some(row)) => row.len(),
        (None, None) => {
            return Err(PipelineError::InsufficientData(
                "cannot train on zero rows".to_string(),
            ))
        }
    };
    if width == 0 {
        return Err(PipelineError::DataFormat("rows have zero features".to_string()));
    }
    for (i, row) in x.iter().enumerate() {
        if row.len() != width {
            return Err(PipelineError::DataFormat(format!(
                "row {} has {} features, expected {}",
                i,
                row.len(),
                width
            )));
        }
        if let Some(j) = row.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::DataFormat(format!(
                "non-finite value at row {}, feature {}",
                i, j
            )));
        }
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl Classifier for Constant {
        fn fit(&mut self, _: &Samples, _: Option<&Samples>) -> PipelineResult<TrainingTrace> {
            Ok(TrainingTrace::default())
        }
        fn predict_proba(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<f64>> {
            Ok(vec![self.0; x.len()])
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let rows = vec![vec![0.0]; 2];
        assert_eq!(Constant(0.5).predict(&rows).unwrap(), vec![0, 0]);
        assert_eq!(Constant(0.51).predict(&rows).unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_validate_rows() {
        assert_eq!(validate_rows(&[vec![1.0, 2.0]], None).unwrap(), 2);
        assert!(validate_rows(&[vec![1.0, 2.0], vec![1.0]], None).is_err());
        assert!(validate_rows(&[vec![f64::NAN]], None).is_err());
        assert!(validate_rows(&[], None).is_err());
        assert!(validate_rows(&[vec![1.0]], Some(2)).is_err());
    }

    #[test]
    fn test_search_configuration_has_no_direct_model() {
        let config = ModelConfiguration::ForestSearch(SearchSpace::default());
        assert!(config.build().is_err());
    }
}
