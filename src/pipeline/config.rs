//! Run-wide experiment configuration
//!
//! Every stage receives the same immutable [`ExperimentConfig`] instead of
//! reading module-level constants, so a single experiment can be reproduced
//! in isolation.

use serde::Serialize;

/// Default seed for every random draw in a run
pub const DEFAULT_SEED: u64 = 42;

/// Default fraction of rows held out for testing
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Default fraction of the training rows held out for validation
pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

/// Default number of cross-validation folds
pub const DEFAULT_CV_FOLDS: usize = 5;

/// Default number of random configurations tried by the forest search
pub const DEFAULT_SEARCH_ITERATIONS: usize = 100;

/// Epoch budget and early-stopping policy for network training
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingBudget {
    /// Maximum number of passes over the training subset
    pub max_epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Epochs without validation-loss improvement before halting
    pub patience: usize,
}

impl Default for TrainingBudget {
    fn default() -> Self {
        Self {
            max_epochs: 100,
            batch_size: 16,
            patience: 15,
        }
    }
}

/// Immutable configuration shared by all stages of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub validation_fraction: f64,
    pub cv_folds: usize,
    pub search_iterations: usize,
    pub budget: TrainingBudget,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
            cv_folds: DEFAULT_CV_FOLDS,
            search_iterations: DEFAULT_SEARCH_ITERATIONS,
            budget: TrainingBudget::default(),
        }
    }
}

impl ExperimentConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    #[must_use]
    pub fn with_search_iterations(mut self, iterations: usize) -> Self {
        self.search_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_budget(mut self, budget: TrainingBudget) -> Self {
        self.budget = budget;
        self
    }
}
