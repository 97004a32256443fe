//! Parameterized experiments and the declared suites
//!
//! An [`ExperimentSpec`] names a feature policy, a scaler and a model
//! configuration. [`run_experiment`] takes it through
//! features → split → scale → train → evaluate. Suites are plain lists of
//! specs run in order against one [`ResultsTable`].

use serde::Serialize;

use super::config::ExperimentConfig;
use super::error::PipelineResult;
use super::features::{build_feature_set, FeaturePolicy};
use super::loader::Dataset;
use super::metrics::{evaluate, ConfusionMatrix, MetricResult};
use super::model::{
    Activation, Classifier, ClassWeight, ConvergenceWarning, ForestParams, MaxFeatures,
    ModelConfiguration, NetworkParams, Optimizer, RandomForest, TrainingTrace,
};
use super::scaler::{ScaledSplit, Scaler};
use super::search::{cross_validate, random_search, CvSummary, SearchSpace};
use super::split::{stratified_split, Samples, SplitPlan};
use crate::report::ResultsTable;
use crate::utils::progress::{create_spinner, finish_with_success, finish_with_warning};

/// Name of the published forest baseline shown next to the network suite
pub const REFERENCE_BASELINE: &str = "RF_Baseline";

/// Figures of the published forest baseline
pub const REFERENCE_BASELINE_METRICS: MetricResult = MetricResult {
    accuracy: 0.7333,
    precision: 0.5484,
    recall: 0.8947,
    f1: 0.68,
    auc: 0.7689,
    n_features: 3,
};

/// One experiment of a suite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSpec {
    pub name: String,
    pub features: FeaturePolicy,
    pub scaler: Scaler,
    pub model: ModelConfiguration,
}

impl ExperimentSpec {
    pub fn new(name: &str, features: FeaturePolicy, scaler: Scaler, model: ModelConfiguration) -> Self {
        Self {
            name: name.to_string(),
            features,
            scaler,
            model,
        }
    }

    /// Networks monitor a validation subset carved out of the training rows
    fn split_plan(&self, config: &ExperimentConfig) -> SplitPlan {
        let plan = SplitPlan::train_test(config.test_fraction);
        match self.model {
            ModelConfiguration::Network(_) => plan.with_validation(config.validation_fraction),
            _ => plan,
        }
    }
}

/// Training trace stored with results, per-epoch losses included
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    pub epochs_trained: usize,
    pub best_epoch: Option<usize>,
    pub stopped_early: bool,
    pub final_train_loss: Option<f64>,
    pub best_validation_loss: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub train_loss: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_loss: Vec<f64>,
    pub warnings: Vec<ConvergenceWarning>,
}

impl From<&TrainingTrace> for TraceSummary {
    fn from(trace: &TrainingTrace) -> Self {
        Self {
            epochs_trained: trace.epochs_trained,
            best_epoch: trace.best_epoch,
            stopped_early: trace.stopped_early,
            final_train_loss: trace.final_train_loss(),
            best_validation_loss: trace.best_validation_loss(),
            train_loss: trace.train_loss.clone(),
            validation_loss: trace.validation_loss.clone(),
            warnings: trace.warnings.clone(),
        }
    }
}

/// Outcome of the forest hyperparameter search
#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub selected: ForestParams,
    pub best_cv_f1: f64,
    pub candidates_evaluated: usize,
    pub candidates_failed: usize,
}

/// Everything known about a finished experiment besides its metrics
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentDetails {
    pub feature_policy: String,
    pub feature_names: Vec<String>,
    pub scaler: Scaler,
    pub model: ModelConfiguration,
    pub train_rows: usize,
    pub validation_rows: Option<usize>,
    pub test_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<(String, f64)>>,
    pub training: TraceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_validation: Option<CvSummary>,
    pub confusion_matrix: ConfusionMatrix,
}

/// A finished experiment
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub name: String,
    pub metrics: MetricResult,
    pub details: ExperimentDetails,
}

impl ExperimentOutcome {
    pub fn warnings(&self) -> &[ConvergenceWarning] {
        &self.details.training.warnings
    }
}

/// Run one experiment end to end
pub fn run_experiment(
    dataset: &Dataset,
    spec: &ExperimentSpec,
    config: &ExperimentConfig,
) -> PipelineResult<ExperimentOutcome> {
    let features = build_feature_set(dataset, &spec.features)?;
    let split = stratified_split(&features, &spec.split_plan(config), config.seed)?;
    let scaled = ScaledSplit::fit(&split, spec.scaler)?;

    let mut search = None;
    let mut cross_validation = None;

    let (model, trace): (Box<dyn Classifier>, TrainingTrace) = match &spec.model {
        ModelConfiguration::ForestSearch(space) => {
            let outcome = random_search(space, &scaled.train)?;
            let mut forest = RandomForest::new(outcome.best_params.clone());
            let trace = forest.fit(&scaled.train, None)?;

            cross_validation = Some(cross_validate(
                &outcome.best_params,
                &Samples::from(&features),
                spec.scaler,
                space.cv_folds,
                config.seed,
            )?);
            search = Some(SearchSummary {
                best_cv_f1: outcome.best_score,
                candidates_evaluated: outcome.trials.len(),
                candidates_failed: outcome.failed_trials(),
                selected: outcome.best_params,
            });
            (Box::new(forest) as Box<dyn Classifier>, trace)
        }
        other => {
            let mut model = other.build()?;
            let trace = model.fit(&scaled.train, scaled.validation.as_ref())?;
            (model, trace)
        }
    };

    let (metrics, confusion_matrix) = evaluate(model.as_ref(), &scaled.test, features.n_features())?;

    let feature_importances = model.feature_importances().map(|values| {
        let mut ranked: Vec<(String, f64)> = features.names.iter().cloned().zip(values).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    });

    Ok(ExperimentOutcome {
        name: spec.name.clone(),
        metrics,
        details: ExperimentDetails {
            feature_policy: spec.features.label(),
            feature_names: features.names.clone(),
            scaler: spec.scaler,
            model: spec.model.clone(),
            train_rows: scaled.train.len(),
            validation_rows: scaled.validation.as_ref().map(Samples::len),
            test_rows: scaled.test.len(),
            feature_importances,
            training: TraceSummary::from(&trace),
            search,
            cross_validation,
            confusion_matrix,
        },
    })
}

/// Named list of experiments plus any reference rows
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub experiments: Vec<ExperimentSpec>,
    pub references: Vec<(String, MetricResult)>,
}

/// An experiment that raised an error and was skipped
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentFailure {
    pub name: String,
    pub configuration: ExperimentSpec,
    pub error: String,
}

/// What a suite run produced besides the table rows
#[derive(Debug, Default)]
pub struct SuiteRun {
    pub completed: Vec<ExperimentOutcome>,
    pub failures: Vec<ExperimentFailure>,
}

/// Run every experiment of `suite` in order, recording into `table`.
///
/// A failing experiment is reported and skipped; rows already recorded are
/// left alone.
pub fn run_suite(
    dataset: &Dataset,
    suite: &Suite,
    config: &ExperimentConfig,
    table: &mut ResultsTable,
) -> SuiteRun {
    let mut run = SuiteRun::default();

    for spec in &suite.experiments {
        let spinner = create_spinner(&format!("Running {}", spec.name));
        match run_experiment(dataset, spec, config) {
            Ok(outcome) => {
                finish_with_success(
                    &spinner,
                    &format!("{}: F1 {:.4}, AUC {:.4}", outcome.name, outcome.metrics.f1, outcome.metrics.auc),
                );
                table.record_detailed(&outcome.name, outcome.metrics, outcome.details.clone());
                run.completed.push(outcome);
            }
            Err(e) => {
                finish_with_warning(&spinner, &format!("{} skipped: {}", spec.name, e));
                run.failures.push(ExperimentFailure {
                    name: spec.name.clone(),
                    configuration: spec.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    for (name, metrics) in &suite.references {
        table.record_reference(name, *metrics);
    }

    run
}

/// Forest parameters selected by the published search
pub fn tuned_forest_params(seed: u64) -> ForestParams {
    ForestParams::default()
        .with_n_estimators(100)
        .with_max_depth(Some(50))
        .with_min_samples_split(5)
        .with_min_samples_leaf(8)
        .with_max_features(MaxFeatures::All)
        .with_class_weight(ClassWeight::Balanced)
        .with_bootstrap(true)
        .with_seed(seed)
}

/// Randomized search on the baseline features
pub fn forest_suite(config: &ExperimentConfig) -> Suite {
    let space = SearchSpace::default()
        .with_n_iter(config.search_iterations)
        .with_cv_folds(config.cv_folds)
        .with_seed(config.seed);

    Suite {
        name: "forest".to_string(),
        experiments: vec![ExperimentSpec::new(
            "RF_Search_Baseline",
            FeaturePolicy::Baseline,
            Scaler::Standard,
            ModelConfiguration::ForestSearch(space),
        )],
        references: Vec::new(),
    }
}

/// Feature-engineering comparison with the tuned forest
pub fn features_suite(config: &ExperimentConfig) -> Suite {
    let model = ModelConfiguration::Forest(tuned_forest_params(config.seed));
    let spec = |name: &str, features: FeaturePolicy, scaler: Scaler| {
        ExperimentSpec::new(name, features, scaler, model.clone())
    };

    Suite {
        name: "features".to_string(),
        experiments: vec![
            spec("Baseline", FeaturePolicy::Baseline, Scaler::Standard),
            spec("Discretization", FeaturePolicy::Discretized, Scaler::Standard),
            spec("Interactions", FeaturePolicy::Interactions, Scaler::Standard),
            spec("MinMax", FeaturePolicy::Baseline, Scaler::MinMax),
            spec("All_Features", FeaturePolicy::Full, Scaler::Standard),
        ],
        references: Vec::new(),
    }
}

/// Architecture, activation, regularization and optimizer sweeps of the network
pub fn network_suite(config: &ExperimentConfig) -> Suite {
    let base = NetworkParams::default()
        .with_hidden_layers(vec![128, 64])
        .with_budget(config.budget)
        .with_seed(config.seed);
    let adam = Optimizer::Adam { learning_rate: 0.001 };

    let mut configs: Vec<(String, NetworkParams)> = Vec::new();

    let architectures: [(&str, &[usize]); 7] = [
        ("Shallow_32", &[32]),
        ("Shallow_64", &[64]),
        ("Shallow_128", &[128]),
        ("Medium_64_32", &[64, 32]),
        ("Medium_128_64", &[128, 64]),
        ("Deep_128_64_32", &[128, 64, 32]),
        ("Deep_256_128_64", &[256, 128, 64]),
    ];
    for (name, widths) in architectures {
        configs.push((format!("Arch_{}", name), base.clone().with_hidden_layers(widths.to_vec())));
    }

    for (name, activation) in [
        ("relu", Activation::Relu),
        ("leaky_relu", Activation::LeakyRelu),
        ("elu", Activation::Elu),
    ] {
        configs.push((format!("Activation_{}", name), base.clone().with_activation(activation)));
    }

    for (label, rate) in [("0.0", 0.0), ("0.2", 0.2), ("0.3", 0.3), ("0.5", 0.5)] {
        configs.push((format!("Dropout_{}", label), base.clone().with_dropout(rate)));
    }

    for (label, l2) in [("0.0", 0.0), ("0.001", 0.001), ("0.01", 0.01), ("0.1", 0.1)] {
        configs.push((format!("L2_{}", label), base.clone().with_l2(l2)));
    }

    let regularized = base.clone().with_dropout(0.3).with_l2(0.01);
    for optimizer in [
        adam,
        Optimizer::Sgd {
            learning_rate: 0.01,
            momentum: 0.9,
        },
        Optimizer::RmsProp { learning_rate: 0.001 },
    ] {
        configs.push((
            format!("Optimizer_{}", optimizer.label()),
            regularized.clone().with_optimizer(optimizer),
        ));
    }

    configs.push(("Best_MLP".to_string(), regularized.with_optimizer(adam)));

    Suite {
        name: "network".to_string(),
        experiments: configs
            .into_iter()
            .map(|(name, params)| {
                ExperimentSpec::new(
                    &name,
                    FeaturePolicy::Baseline,
                    Scaler::Standard,
                    ModelConfiguration::Network(params),
                )
            })
            .collect(),
        references: vec![(REFERENCE_BASELINE.to_string(), REFERENCE_BASELINE_METRICS)],
    }
}
