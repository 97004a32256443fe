//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::{
    ExperimentConfig, TrainingBudget, DEFAULT_CV_FOLDS, DEFAULT_SEARCH_ITERATIONS, DEFAULT_SEED,
    DEFAULT_TEST_FRACTION, DEFAULT_VALIDATION_FRACTION,
};

/// File name of the public heart-failure clinical records dataset
pub const DEFAULT_INPUT: &str = "heart_failure_clinical_records_dataset.csv";

/// hfpipe - Train and compare survival classifiers on heart-failure clinical records
#[derive(Parser, Debug)]
#[command(name = "hfpipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input file path (CSV or Parquet) with the clinical records
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Directory receiving comparison tables, details and bundles
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Seed for splits, bootstraps, search sampling and weight initialization
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Fraction of rows held out for the test subset
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION, value_parser = validate_fraction)]
    pub test_fraction: f64,

    /// Fraction of the training rows held out for network early stopping
    #[arg(long, default_value_t = DEFAULT_VALIDATION_FRACTION, value_parser = validate_fraction)]
    pub validation_fraction: f64,

    /// Stratified folds used by the forest search and cross-validation
    #[arg(long, default_value_t = DEFAULT_CV_FOLDS, value_parser = validate_folds)]
    pub cv_folds: usize,

    /// Number of forest configurations sampled by the randomized search
    #[arg(long, default_value_t = DEFAULT_SEARCH_ITERATIONS)]
    pub search_iterations: usize,

    /// Maximum training epochs for networks
    #[arg(long, default_value_t = TrainingBudget::default().max_epochs)]
    pub max_epochs: usize,

    /// Epochs without validation improvement before training stops
    #[arg(long, default_value_t = TrainingBudget::default().patience)]
    pub patience: usize,

    /// Mini-batch size for network training
    #[arg(long, default_value_t = TrainingBudget::default().batch_size)]
    pub batch_size: usize,

    /// Also package the comparison CSV and details JSON into a zip archive
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Profile the dataset: column statistics, class balance, outcome correlations
    Describe,
    /// Compare feature engineering strategies with the tuned random forest
    Features,
    /// Randomized hyperparameter search for the random forest
    Forest,
    /// Sweep network architectures, activations, regularization and optimizers
    Network,
    /// Run the features, forest and network suites in sequence
    All,
}

impl Commands {
    /// Suite names run by this command, in order
    pub fn suites(self) -> &'static [&'static str] {
        match self {
            Commands::Describe => &[],
            Commands::Features => &["features"],
            Commands::Forest => &["forest"],
            Commands::Network => &["network"],
            Commands::All => &["features", "forest", "network"],
        }
    }
}

impl Cli {
    /// Selected command; `all` when none is given
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::All)
    }

    pub fn experiment_config(&self) -> ExperimentConfig {
        ExperimentConfig::default()
            .with_seed(self.seed)
            .with_test_fraction(self.test_fraction)
            .with_validation_fraction(self.validation_fraction)
            .with_cv_folds(self.cv_folds)
            .with_search_iterations(self.search_iterations)
            .with_budget(TrainingBudget {
                max_epochs: self.max_epochs,
                batch_size: self.batch_size,
                patience: self.patience,
            })
    }
}

/// Validator for split fractions, exclusive on both ends
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("fraction must be strictly between 0.0 and 1.0, got {}", value))
    }
}

fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid fold count", s))?;

    if value >= 2 {
        Ok(value)
    } else {
        Err(format!("cv_folds must be at least 2, got {}", value))
    }
}
