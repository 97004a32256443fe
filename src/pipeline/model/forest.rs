//! Random forest of weighted CART trees
//!
//! Trees are grown in parallel on rayon's pool. Each tree gets its own
//! `ChaCha8Rng` seeded from a master generator, so a fixed seed yields the
//! same forest regardless of thread scheduling.

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use super::{validate_rows, Classifier, TrainingTrace};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::split::Samples;

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count in `[1, n_features]`
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features as f64;
        let resolved = match self {
            MaxFeatures::Sqrt => n.sqrt() as usize,
            MaxFeatures::Log2 => n.log2() as usize,
            MaxFeatures::All => n_features,
        };
        resolved.clamp(1, n_features.max(1))
    }
}

/// Per-class sample weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    None,
    /// `n / (2 * n_class)` from the full training labels
    Balanced,
    /// `n / (2 * n_class)` recomputed from each tree's bootstrap sample
    BalancedSubsample,
}

/// Forest hyperparameters.
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `n_estimators`      | 100     |
/// | `max_depth`         | `None`  |
/// | `min_samples_split` | 2       |
/// | `min_samples_leaf`  | 1       |
/// | `max_features`      | `Sqrt`  |
/// | `bootstrap`         | `true`  |
/// | `class_weight`      | `None`  |
/// | `seed`              | 42      |
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::None,
            seed: 42,
        }
    }
}

impl ForestParams {
    #[must_use]
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    #[must_use]
    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::Training("n_estimators must be at least 1".to_string()));
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::Training("max_depth must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::Training(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(PipelineError::Training("min_samples_leaf must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Arena node. Children are indices into the owning tree's node vector.
#[derive(Debug, Clone)]
enum Node {
    Leaf {
        /// Weighted fraction of positive samples
        proba: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
    /// Weighted impurity decrease per feature, normalized to sum to 1
    importances: Vec<f64>,
}

impl Tree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }
}

/// Weighted Gini impurity of a two-class node
fn gini(w_neg: f64, w_pos: f64) -> f64 {
    let total = w_neg + w_pos;
    if total <= 0.0 {
        return 0.0;
    }
    let (p0, p1) = (w_neg / total, w_pos / total);
    1.0 - p0 * p0 - p1 * p1
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Grows one tree over `rows` (unique sample indices) with per-sample weights.
struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [u8],
    weights: &'a [f64],
    params: &'a ForestParams,
    max_features: usize,
    n_features: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn class_weights(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(neg, pos), &i| {
            if self.y[i] == 1 {
                (neg, pos + self.weights[i])
            } else {
                (neg + self.weights[i], pos)
            }
        })
    }

    fn build(&mut self, rows: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let (w_neg, w_pos) = self.class_weights(rows);
        let total = w_neg + w_pos;
        let impurity = gini(w_neg, w_pos);

        let leaf = Node::Leaf {
            proba: if total > 0.0 { w_pos / total } else { 0.0 },
        };

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if rows.len() < self.params.min_samples_split || impurity == 0.0 || depth_reached {
            self.nodes.push(leaf);
            return self.nodes.len() - 1;
        }

        let Some(split) = self.best_split(rows, impurity * total, rng) else {
            self.nodes.push(leaf);
            return self.nodes.len() - 1;
        };

        self.importances[split.feature] += split.gain;

        // reserve the parent slot, children fill in after it
        let idx = self.nodes.len();
        self.nodes.push(leaf);
        let left = self.build(&split.left, depth + 1, rng);
        let right = self.build(&split.right, depth + 1, rng);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], parent: f64, rng: &mut ChaCha8Rng) -> Option<SplitCandidate> {
        let min_leaf = self.params.min_samples_leaf;
        let (w_neg_total, w_pos_total) = self.class_weights(rows);
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in sample(rng, self.n_features, self.max_features).into_iter() {
            let mut sorted = rows.to_vec();
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let (mut l_neg, mut l_pos) = (0.0, 0.0);
            for k in 0..sorted.len() - 1 {
                let i = sorted[k];
                if self.y[i] == 1 {
                    l_pos += self.weights[i];
                } else {
                    l_neg += self.weights[i];
                }

                let (v, next) = (self.x[i][feature], self.x[sorted[k + 1]][feature]);
                if v == next || k + 1 < min_leaf || sorted.len() - k - 1 < min_leaf {
                    continue;
                }

                let (r_neg, r_pos) = (w_neg_total - l_neg, w_pos_total - l_pos);
                let children = gini(l_neg, l_pos) * (l_neg + l_pos) + gini(r_neg, r_pos) * (r_neg + r_pos);
                let gain = parent - children;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, (v + next) / 2.0, gain));
                }
            }
        }

        best.map(|(feature, threshold, gain)| {
            let (left, right) = rows
                .iter()
                .copied()
                .partition(|&i| self.x[i][feature] <= threshold);
            SplitCandidate {
                feature,
                threshold,
                gain,
                left,
                right,
            }
        })
    }
}

fn balanced_weights(counts: (f64, f64)) -> (f64, f64) {
    let (neg, pos) = counts;
    let n = neg + pos;
    let w = |c: f64| if c > 0.0 { n / (2.0 * c) } else { 0.0 };
    (w(neg), w(pos))
}

fn grow_tree(
    x: &[Vec<f64>],
    y: &[u8],
    params: &ForestParams,
    max_features: usize,
    full_class_weights: (f64, f64),
    seed: u64,
) -> Tree {
    let n = y.len();
    let n_features = x[0].len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut multiplicity = vec![0.0f64; n];
    if params.bootstrap {
        for _ in 0..n {
            multiplicity[rng.gen_range(0..n)] += 1.0;
        }
    } else {
        multiplicity.iter_mut().for_each(|m| *m = 1.0);
    }

    let class_weights = match params.class_weight {
        ClassWeight::None => (1.0, 1.0),
        ClassWeight::Balanced => full_class_weights,
        ClassWeight::BalancedSubsample => {
            let counts = y.iter().zip(&multiplicity).fold((0.0, 0.0), |(neg, pos), (&c, &m)| {
                if c == 1 {
                    (neg, pos + m)
                } else {
                    (neg + m, pos)
                }
            });
            balanced_weights(counts)
        }
    };

    let weights: Vec<f64> = y
        .iter()
        .zip(&multiplicity)
        .map(|(&c, &m)| m * if c == 1 { class_weights.1 } else { class_weights.0 })
        .collect();
    let rows: Vec<usize> = (0..n).filter(|&i| multiplicity[i] > 0.0).collect();

    let mut builder = TreeBuilder {
        x,
        y,
        weights: &weights,
        params,
        max_features,
        n_features,
        nodes: Vec::new(),
        importances: vec![0.0; n_features],
    };
    builder.build(&rows, 0, &mut rng);

    let mut importances = builder.importances;
    let sum: f64 = importances.iter().sum();
    if sum > 0.0 {
        importances.iter_mut().for_each(|v| *v /= sum);
    }

    Tree {
        nodes: builder.nodes,
        importances,
    }
}

/// Bagged ensemble of CART trees for binary classification
#[derive(Debug, Clone)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<Tree>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, train: &Samples, _validation: Option<&Samples>) -> PipelineResult<TrainingTrace> {
        self.params.validate()?;
        let n_features = validate_rows(&train.x, None)?;
        let max_features = self.params.max_features.resolve(n_features);

        let positives = train.y.iter().filter(|&&c| c == 1).count() as f64;
        let full_weights = balanced_weights((train.len() as f64 - positives, positives));

        let mut master = ChaCha8Rng::seed_from_u64(self.params.seed);
        let seeds: Vec<u64> = (0..self.params.n_estimators).map(|_| master.gen()).collect();

        let params = &self.params;
        self.trees = seeds
            .into_par_iter()
            .map(|seed| grow_tree(&train.x, &train.y, params, max_features, full_weights, seed))
            .collect();
        self.n_features = n_features;

        Ok(TrainingTrace::default())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::Training("forest has not been fit".to_string()));
        }
        if x.is_empty() {
            return Ok(Vec::new());
        }
        validate_rows(x, Some(self.n_features))?;
        let n_trees = self.trees.len() as f64;
        Ok(x
            .par_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    /// Mean of per-tree normalized importances, renormalized; trees that
    /// never split are skipped.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut totals = vec![0.0; self.n_features];
        for tree in self.trees.iter().filter(|t| t.nodes.len() > 1) {
            for (total, v) in totals.iter_mut().zip(&tree.importances) {
                *total += v;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        Some(totals)
    }
}
