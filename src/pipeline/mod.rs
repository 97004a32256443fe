//! Pipeline module - loads, transforms, trains and evaluates
//!
//! Stages, leaves first: loader → features → split → scaler → model →
//! metrics. `experiment` strings them together; `search` drives the forest
//! hyperparameter search; `stats` and `correlation` profile the dataset.

pub mod config;
pub mod correlation;
pub mod error;
pub mod experiment;
pub mod features;
pub mod loader;
pub mod metrics;
pub mod missing;
pub mod model;
pub mod scaler;
pub mod search;
pub mod split;
pub mod stats;
pub mod target;

pub use config::*;
pub use correlation::{correlation_matrix, CorrelatedPair, CorrelationMatrix};
pub use error::{PipelineError, PipelineResult};
pub use experiment::*;
pub use features::*;
pub use loader::*;
pub use metrics::*;
pub use missing::*;
pub use model::{
    Activation, ClassWeight, Classifier, ConvergenceWarning, ForestParams, MaxFeatures,
    ModelConfiguration, NetworkParams, NeuralNetwork, Optimizer, RandomForest, TrainingTrace,
    DECISION_THRESHOLD,
};
pub use scaler::*;
pub use search::*;
pub use split::*;
pub use stats::*;
pub use target::*;
