//! Integration tests for stratified splitting and scaling

use hfpipe::pipeline::{
    build_feature_set, stratified_k_fold, stratified_split, Dataset, FeaturePolicy, FeatureSet,
    PipelineError, ScaledSplit, Scaler, SplitPlan,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

fn features(rows: usize) -> FeatureSet {
    let dataset = Dataset::from_frame(&create_heart_dataframe(rows, 7)).unwrap();
    build_feature_set(&dataset, &FeaturePolicy::Baseline).unwrap()
}

#[test]
fn test_split_preserves_class_ratio() {
    let features = features(300);
    let overall = features.labels.iter().filter(|&&y| y == 1).count() as f64 / 300.0;

    let plan = SplitPlan::train_test(0.2).with_validation(0.2);
    let split = stratified_split(&features, &plan, 42).unwrap();
    let validation = split.validation.as_ref().unwrap();

    assert_eq!(split.train.len() + validation.len() + split.test.len(), 300);
    for subset in [&split.train, validation, &split.test] {
        let rate = subset.class_balance().positive_rate();
        assert!(
            (rate - overall).abs() <= 1.0 / subset.len() as f64 + 1e-12,
            "subset rate {} vs overall {}",
            rate,
            overall
        );
    }
}

#[test]
fn test_subsets_are_disjoint_and_cover_every_row() {
    let features = features(120);
    let plan = SplitPlan::train_test(0.2).with_validation(0.2);
    let split = stratified_split(&features, &plan, 5).unwrap();

    let validation = split.validation.as_ref().unwrap();
    assert_eq!(split.train.len() + validation.len() + split.test.len(), 120);

    let mut seen: Vec<&Vec<f64>> = split
        .train
        .x
        .iter()
        .chain(&validation.x)
        .chain(&split.test.x)
        .collect();
    seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut expected: Vec<&Vec<f64>> = features.rows.iter().collect();
    expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(seen, expected);
}

#[test]
fn test_same_seed_same_split() {
    let features = features(80);
    let plan = SplitPlan::train_test(0.25);
    let a = stratified_split(&features, &plan, 11).unwrap();
    let b = stratified_split(&features, &plan, 11).unwrap();
    assert_eq!(a.train, b.train);
    assert_eq!(a.test, b.test);
}

#[test]
fn test_invalid_fraction() {
    let features = features(50);
    let err = stratified_split(&features, &SplitPlan::train_test(1.0), 0).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData(_)));
}

#[test]
fn test_scaler_is_fit_on_train_only() {
    let features = features(100);
    let split = stratified_split(&features, &SplitPlan::train_test(0.2), 3).unwrap();
    let scaled = ScaledSplit::fit(&split, Scaler::Standard).unwrap();

    for j in 0..3 {
        let column: Vec<f64> = scaled.train.x.iter().map(|r| r[j]).collect();
        let mean = column.iter().sum::<f64>() / column.len() as f64;
        let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-9);
    }

    let again = ScaledSplit::fit(&split, Scaler::Standard).unwrap();
    assert_eq!(scaled.test, again.test);
}

#[test]
fn test_minmax_train_range() {
    let features = features(60);
    let split = stratified_split(&features, &SplitPlan::train_test(0.2), 9).unwrap();
    let scaled = ScaledSplit::fit(&split, Scaler::MinMax).unwrap();

    for row in &scaled.train.x {
        for &v in row {
            assert!((-1e-12..=1.0 + 1e-12).contains(&v));
        }
    }
}

#[test]
fn test_k_fold_partitions_rows() {
    let features = features(100);
    let folds = stratified_k_fold(&features.labels, 5, 42).unwrap();

    assert_eq!(folds.len(), 5);
    let mut all_test: Vec<usize> = folds.iter().flat_map(|f| f.test_indices.clone()).collect();
    all_test.sort_unstable();
    assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    for fold in &folds {
        assert_eq!(fold.train_indices.len() + fold.test_indices.len(), 100);
    }
}
