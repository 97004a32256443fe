//! Stratified train/validation/test splitting and stratified k-fold
//!
//! Each class is shuffled independently with a seeded `ChaCha8Rng` and
//! allocated to subsets by rounded fraction, so the positive rate of every
//! subset stays within rounding of the full dataset.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::error::{PipelineError, PipelineResult};
use super::features::FeatureSet;
use super::target::ClassBalance;

/// A feature matrix with labels, as consumed by models and the evaluator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Samples {
    /// Row-major feature values
    pub x: Vec<Vec<f64>>,
    pub y: Vec<u8>,
}

impl Samples {
    pub fn new(x: Vec<Vec<f64>>, y: Vec<u8>) -> Self {
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.x.first().map_or(0, |r| r.len())
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }

    pub fn class_balance(&self) -> ClassBalance {
        ClassBalance::from_labels(&self.y)
    }
}

impl From<&FeatureSet> for Samples {
    fn from(features: &FeatureSet) -> Self {
        Self {
            x: features.rows.clone(),
            y: features.labels.clone(),
        }
    }
}

/// Subset fractions for [`stratified_split`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitPlan {
    /// Fraction of all rows held out for testing
    pub test_fraction: f64,
    /// Fraction of the remaining training rows held out for validation
    pub validation_fraction: Option<f64>,
}

impl SplitPlan {
    pub fn train_test(test_fraction: f64) -> Self {
        Self {
            test_fraction,
            validation_fraction: None,
        }
    }

    #[must_use]
    pub fn with_validation(mut self, fraction: f64) -> Self {
        self.validation_fraction = Some(fraction);
        self
    }
}

/// Disjoint, stratified subsets of a feature set
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub feature_names: Vec<String>,
    pub train: Samples,
    pub validation: Option<Samples>,
    pub test: Samples,
}

fn check_fraction(name: &str, fraction: f64) -> PipelineResult<()> {
    if fraction > 0.0 && fraction < 1.0 {
        Ok(())
    } else {
        Err(PipelineError::InsufficientData(format!(
            "{} fraction must lie strictly between 0 and 1, got {}",
            name, fraction
        )))
    }
}

/// Number of a class's `available` rows to move into a held-out subset.
///
/// Rounded, then clamped so both sides keep at least one row.
fn held_out_count(available: usize, fraction: f64, class: u8, subset: &str) -> PipelineResult<usize> {
    if available < 2 {
        return Err(PipelineError::InsufficientData(format!(
            "class {} has {} row(s); the {} split needs at least 2",
            class, available, subset
        )));
    }
    let wanted = (available as f64 * fraction).round() as usize;
    Ok(wanted.clamp(1, available - 1))
}

fn class_indices(labels: &[u8]) -> [Vec<usize>; 2] {
    let mut by_class = [Vec::new(), Vec::new()];
    for (i, &y) in labels.iter().enumerate() {
        by_class[usize::from(y == 1)].push(i);
    }
    by_class
}

/// Split `features` into stratified train/(validation)/test subsets.
///
/// Fails with [`PipelineError::InsufficientData`] if any subset would be left
/// without an example of each class.
pub fn stratified_split(features: &FeatureSet, plan: &SplitPlan, seed: u64) -> PipelineResult<DataSplit> {
    check_fraction("Test", plan.test_fraction)?;
    if let Some(v) = plan.validation_fraction {
        check_fraction("Validation", v)?;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut val_idx = Vec::new();
    let mut test_idx = Vec::new();

    for (class, mut indices) in class_indices(&features.labels).into_iter().enumerate() {
        let class = class as u8;
        indices.shuffle(&mut rng);

        let n_test = held_out_count(indices.len(), plan.test_fraction, class, "test")?;
        test_idx.extend_from_slice(&indices[..n_test]);
        let mut rest = &indices[n_test..];

        if let Some(fraction) = plan.validation_fraction {
            let n_val = held_out_count(rest.len(), fraction, class, "validation")?;
            val_idx.extend_from_slice(&rest[..n_val]);
            rest = &rest[n_val..];
        }
        train_idx.extend_from_slice(rest);
    }

    // interleave classes so mini-batches see both
    train_idx.shuffle(&mut rng);
    val_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    let all = Samples::from(features);
    Ok(DataSplit {
        feature_names: features.names.clone(),
        train: all.select(&train_idx),
        validation: plan.validation_fraction.map(|_| all.select(&val_idx)),
        test: all.select(&test_idx),
    })
}

/// One cross-validation fold as row indices into the fitted samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Shuffled stratified k-fold.
///
/// Each class is shuffled and dealt round-robin across folds. Every class
/// must have at least `k` rows so each test fold contains both classes.
pub fn stratified_k_fold(labels: &[u8], k: usize, seed: u64) -> PipelineResult<Vec<Fold>> {
    if k < 2 {
        return Err(PipelineError::InsufficientData(format!(
            "cross-validation needs at least 2 folds, got {}",
            k
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];

    for (class, mut indices) in class_indices(labels).into_iter().enumerate() {
        if indices.len() < k {
            return Err(PipelineError::InsufficientData(format!(
                "class {} has {} row(s), fewer than the {} cross-validation folds",
                class,
                indices.len(),
                k
            )));
        }
        indices.shuffle(&mut rng);
        for (i, idx) in indices.into_iter().enumerate() {
            folds[i % k].push(idx);
        }
    }

    Ok((0..k)
        .map(|f| Fold {
            test_indices: folds[f].clone(),
            train_indices: folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != f)
                .flat_map(|(_, fold)| fold.iter().copied())
                .collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_set(n_neg: usize, n_pos: usize) -> FeatureSet {
        let n = n_neg + n_pos;
        FeatureSet {
            names: vec!["x".to_string()],
            rows: (0..n).map(|i| vec![i as f64]).collect(),
            labels: (0..n).map(|i| u8::from(i >= n_neg)).collect(),
        }
    }

    #[test]
    fn test_subsets_are_disjoint_and_complete() {
        let fs = feature_set(70, 30);
        let split = stratified_split(&fs, &SplitPlan::train_test(0.2).with_validation(0.2), 42).unwrap();
        let val = split.validation.as_ref().unwrap();

        let mut seen: Vec<f64> = split
            .train
            .x
            .iter()
            .chain(&val.x)
            .chain(&split.test.x)
            .map(|r| r[0])
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, (0..100).map(|i| i as f64).collect::<Vec<_>>());
        assert_eq!(split.test.len(), 20);
        assert_eq!(val.len(), 16);
        assert_eq!(split.train.len(), 64);
    }

    #[test]
    fn test_same_seed_same_split() {
        let fs = feature_set(20, 10);
        let a = stratified_split(&fs, &SplitPlan::train_test(0.2), 7).unwrap();
        let b = stratified_split(&fs, &SplitPlan::train_test(0.2), 7).unwrap();
        assert_eq!(a.test, b.test);
        assert_eq!(a.train, b.train);
    }

    #[test]
    fn test_single_example_class_is_insufficient() {
        let fs = feature_set(9, 1);
        let err = stratified_split(&fs, &SplitPlan::train_test(0.2), 42).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let fs = feature_set(9, 9);
        assert!(stratified_split(&fs, &SplitPlan::train_test(1.0), 42).is_err());
        assert!(stratified_split(&fs, &SplitPlan::train_test(0.0), 42).is_err());
    }

    #[test]
    fn test_k_fold_covers_every_row_once() {
        let labels: Vec<u8> = (0..23).map(|i| u8::from(i % 3 == 0)).collect();
        let folds = stratified_k_fold(&labels, 5, 42).unwrap();
        assert_eq!(folds.len(), 5);

        let mut tested: Vec<usize> = folds.iter().flat_map(|f| f.test_indices.clone()).collect();
        tested.sort_unstable();
        assert_eq!(tested, (0..23).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train_indices.len() + fold.test_indices.len(), 23);
            assert!(fold.test_indices.iter().any(|&i| labels[i] == 1));
            assert!(fold.test_indices.iter().any(|&i| labels[i] == 0));
        }
    }

    #[test]
    fn test_k_fold_rejects_small_class() {
        let labels = vec![0, 0, 0, 0, 0, 0, 1, 1];
        assert!(stratified_k_fold(&labels, 3, 1).is_err());
        assert!(stratified_k_fold(&labels, 1, 1).is_err());
    }
}
