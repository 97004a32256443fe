//! Randomized hyperparameter search and cross-validation for the forest
//!
//! Candidates are drawn without replacement from a declared grid and scored
//! by mean F1 over shuffled stratified k-fold. Candidates are scored in
//! parallel; the winner is chosen deterministically from the collected
//! scores.

use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use super::error::{PipelineError, PipelineResult};
use super::metrics::{compute_metrics, ConfusionMatrix, MetricResult};
use super::model::{threshold_labels, Classifier, ClassWeight, ForestParams, MaxFeatures, RandomForest};
use super::scaler::Scaler;
use super::split::{stratified_k_fold, Fold, Samples};
use crate::utils::progress::{create_progress_bar, finish_with_success};

/// Declared forest parameter grid and search settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSpace {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
    pub max_features: Vec<MaxFeatures>,
    pub bootstrap: Vec<bool>,
    pub class_weight: Vec<ClassWeight>,
    /// Candidates to evaluate
    pub n_iter: usize,
    pub cv_folds: usize,
    pub seed: u64,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 200, 300, 500],
            max_depth: vec![None, Some(10), Some(20), Some(30), Some(40), Some(50)],
            min_samples_split: vec![2, 5, 10, 15],
            min_samples_leaf: vec![1, 2, 4, 8],
            max_features: vec![MaxFeatures::Sqrt, MaxFeatures::Log2, MaxFeatures::All],
            bootstrap: vec![true, false],
            class_weight: vec![
                ClassWeight::Balanced,
                ClassWeight::BalancedSubsample,
                ClassWeight::None,
            ],
            n_iter: 100,
            cv_folds: 5,
            seed: 42,
        }
    }
}

impl SearchSpace {
    #[must_use]
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    #[must_use]
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn radices(&self) -> [usize; 7] {
        [
            self.n_estimators.len(),
            self.max_depth.len(),
            self.min_samples_split.len(),
            self.min_samples_leaf.len(),
            self.max_features.len(),
            self.bootstrap.len(),
            self.class_weight.len(),
        ]
    }

    /// Number of distinct grid points
    pub fn size(&self) -> usize {
        self.radices().iter().product()
    }

    /// Grid point `index` in mixed-radix order
    pub fn candidate(&self, index: usize) -> ForestParams {
        let mut digits = [0usize; 7];
        let mut rest = index;
        for (digit, radix) in digits.iter_mut().zip(self.radices()).rev() {
            *digit = rest % radix;
            rest /= radix;
        }
        ForestParams {
            n_estimators: self.n_estimators[digits[0]],
            max_depth: self.max_depth[digits[1]],
            min_samples_split: self.min_samples_split[digits[2]],
            min_samples_leaf: self.min_samples_leaf[digits[3]],
            max_features: self.max_features[digits[4]],
            bootstrap: self.bootstrap[digits[5]],
            class_weight: self.class_weight[digits[6]],
            seed: self.seed,
        }
    }

    /// Draw `n_iter` distinct candidates (all of them if the grid is smaller)
    pub fn sample_candidates(&self) -> PipelineResult<Vec<ForestParams>> {
        let size = self.size();
        if size == 0 {
            return Err(PipelineError::Training("search grid has an empty dimension".to_string()));
        }
        if self.n_iter == 0 {
            return Err(PipelineError::Training("search needs at least one iteration".to_string()));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        Ok(sample(&mut rng, size, self.n_iter.min(size))
            .into_iter()
            .map(|i| self.candidate(i))
            .collect())
    }
}

/// One evaluated candidate
#[derive(Debug, Clone, Serialize)]
pub struct Trial {
    pub params: ForestParams,
    /// Mean F1 across folds; `None` when the candidate failed
    pub mean_f1: Option<f64>,
    pub error: Option<String>,
}

/// Result of a completed search
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub best_params: ForestParams,
    pub best_score: f64,
    pub trials: Vec<Trial>,
}

impl SearchOutcome {
    pub fn failed_trials(&self) -> usize {
        self.trials.iter().filter(|t| t.mean_f1.is_none()).count()
    }
}

fn fold_f1(params: &ForestParams, samples: &Samples, fold: &Fold) -> PipelineResult<f64> {
    let mut forest = RandomForest::new(params.clone());
    forest.fit(&samples.select(&fold.train_indices), None)?;
    let test = samples.select(&fold.test_indices);
    let predicted = forest.predict(&test.x)?;
    Ok(ConfusionMatrix::from_labels(&test.y, &predicted).f1())
}

fn score_candidate(params: &ForestParams, samples: &Samples, folds: &[Fold]) -> PipelineResult<f64> {
    let scores = folds
        .iter()
        .map(|fold| fold_f1(params, samples, fold))
        .collect::<PipelineResult<Vec<f64>>>()?;
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Run the randomized search over `train`.
///
/// Failed candidates are recorded but excluded; ties keep the earliest
/// drawn candidate. Fails if every candidate fails.
pub fn random_search(space: &SearchSpace, train: &Samples) -> PipelineResult<SearchOutcome> {
    let candidates = space.sample_candidates()?;
    let folds = stratified_k_fold(&train.y, space.cv_folds, space.seed)?;

    let pb = create_progress_bar(candidates.len() as u64, "   Searching forest configurations");
    let trials: Vec<Trial> = candidates
        .into_par_iter()
        .map(|params| {
            let result = score_candidate(&params, train, &folds);
            pb.inc(1);
            match result {
                Ok(score) => Trial {
                    params,
                    mean_f1: Some(score),
                    error: None,
                },
                Err(e) => Trial {
                    params,
                    mean_f1: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (i, trial) in trials.iter().enumerate() {
        if let Some(score) = trial.mean_f1 {
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((i, score));
            }
        }
    }

    let (best_index, best_score) = best.ok_or_else(|| {
        PipelineError::Training(format!("all {} search candidates failed", trials.len()))
    })?;
    finish_with_success(
        &pb,
        &format!("Search complete: best mean CV F1 {:.4}", best_score),
    );

    Ok(SearchOutcome {
        best_params: trials[best_index].params.clone(),
        best_score,
        trials,
    })
}

/// Mean and population standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

impl MeanStd {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: var.sqrt(),
        }
    }
}

/// Cross-validated scores of one forest configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvSummary {
    pub folds: usize,
    pub accuracy: MeanStd,
    pub f1: MeanStd,
    pub auc: MeanStd,
}

/// Stratified k-fold of `params` on unscaled `samples`; the scaler is fit
/// inside each fold on that fold's training rows.
pub fn cross_validate(
    params: &ForestParams,
    samples: &Samples,
    scaler: Scaler,
    k: usize,
    seed: u64,
) -> PipelineResult<CvSummary> {
    let folds = stratified_k_fold(&samples.y, k, seed)?;

    let results = folds
        .par_iter()
        .map(|fold| {
            let train = samples.select(&fold.train_indices);
            let test = samples.select(&fold.test_indices);
            let fitted = scaler.fit(&train)?;
            let (train, test) = (fitted.transform(&train)?, fitted.transform(&test)?);

            let mut forest = RandomForest::new(params.clone());
            forest.fit(&train, None)?;
            let scores = forest.predict_proba(&test.x)?;
            let predicted = threshold_labels(&scores);
            compute_metrics(&test.y, &predicted, &scores, samples.n_features())
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    let pick = |f: fn(&MetricResult) -> f64| {
        MeanStd::of(&results.iter().map(f).collect::<Vec<_>>())
    };

    Ok(CvSummary {
        folds: k,
        accuracy: pick(|m| m.accuracy),
        f1: pick(|m| m.f1),
        auc: pick(|m| m.auc),
    })
}
