//! End-to-end tests: load → features → split → scale → train → evaluate → record

use hfpipe::pipeline::*;
use hfpipe::report::{MetricKind, ResultsTable, RunMetadata};

#[path = "common/mod.rs"]
mod common;

use common::*;

fn small_forest(seed: u64) -> ModelConfiguration {
    ModelConfiguration::Forest(ForestParams::default().with_n_estimators(10).with_seed(seed))
}

fn small_budget() -> TrainingBudget {
    TrainingBudget {
        max_epochs: 15,
        batch_size: 16,
        patience: 5,
    }
}

#[test]
fn test_ten_row_dataset_end_to_end() {
    let mut df = create_ten_row_dataframe();
    let (_temp_dir, csv_path) = create_temp_csv(&mut df);

    let dataset = load_dataset(&csv_path, 100).unwrap();
    let balance = dataset.class_balance().unwrap();
    assert_eq!((balance.negatives, balance.positives), (7, 3));

    let suite = Suite {
        name: "smoke".to_string(),
        experiments: vec![ExperimentSpec::new(
            "RF_Small_Baseline",
            FeaturePolicy::Baseline,
            Scaler::Standard,
            small_forest(42),
        )],
        references: Vec::new(),
    };
    let mut table = ResultsTable::new();
    let run = run_suite(&dataset, &suite, &ExperimentConfig::default(), &mut table);

    assert!(run.failures.is_empty(), "{:?}", run.failures);
    let row = table.get("RF_Small_Baseline").unwrap();
    assert!((0.0..=1.0).contains(&row.metrics.accuracy));
    assert_eq!(row.metrics.n_features, 3);

    let details = row.details.as_ref().unwrap();
    assert_eq!(details.test_rows, 2);
    assert_eq!(details.train_rows, 8);
    assert!(details.feature_importances.is_some());
}

#[test]
fn test_experiment_is_reproducible() {
    let dataset = Dataset::from_frame(&create_heart_dataframe(120, 4)).unwrap();
    let spec = ExperimentSpec::new("RF", FeaturePolicy::Interactions, Scaler::Standard, small_forest(3));
    let config = ExperimentConfig::default();

    let a = run_experiment(&dataset, &spec, &config).unwrap();
    let b = run_experiment(&dataset, &spec, &config).unwrap();

    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.details.confusion_matrix, b.details.confusion_matrix);
}

#[test]
fn test_network_experiment_uses_validation_subset() {
    let dataset = Dataset::from_frame(&create_heart_dataframe(150, 5)).unwrap();
    let params = NetworkParams::default()
        .with_hidden_layers(vec![8])
        .with_budget(small_budget())
        .with_seed(1);
    let spec = ExperimentSpec::new(
        "MLP_Small",
        FeaturePolicy::Full,
        Scaler::Standard,
        ModelConfiguration::Network(params),
    );

    let outcome = run_experiment(&dataset, &spec, &ExperimentConfig::default()).unwrap();

    assert!(outcome.details.validation_rows.unwrap() > 0);
    assert!(outcome.details.training.epochs_trained <= 15);
    assert!(outcome.details.training.best_validation_loss.is_some());
    assert!(outcome.details.feature_importances.is_none());
    assert_eq!(outcome.metrics.n_features, 14);
}

#[test]
fn test_network_loss_history_is_exported() {
    let dataset = Dataset::from_frame(&create_heart_dataframe(120, 8)).unwrap();
    let params = NetworkParams::default()
        .with_hidden_layers(vec![8])
        .with_budget(small_budget())
        .with_seed(3);
    let spec = ExperimentSpec::new(
        "MLP_History",
        FeaturePolicy::Baseline,
        Scaler::Standard,
        ModelConfiguration::Network(params),
    );

    let outcome = run_experiment(&dataset, &spec, &ExperimentConfig::default()).unwrap();
    let training = &outcome.details.training;
    assert_eq!(training.train_loss.len(), training.epochs_trained);
    assert_eq!(training.validation_loss.len(), training.epochs_trained);
    assert_eq!(training.final_train_loss, training.train_loss.last().copied());

    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("network_details.json");
    let mut table = ResultsTable::new();
    table.record_detailed(&outcome.name, outcome.metrics, outcome.details.clone());
    let config = ExperimentConfig::default();
    let metadata = RunMetadata::new("network", std::path::Path::new("heart.csv"), &config);
    table.write_json(&path, &metadata, MetricKind::F1).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let exported = &json["experiments"][0]["details"]["training"];
    assert_eq!(
        exported["train_loss"].as_array().unwrap().len(),
        training.epochs_trained
    );
    assert_eq!(
        exported["validation_loss"].as_array().unwrap().len(),
        training.epochs_trained
    );
}

#[test]
fn test_failing_experiment_is_skipped() {
    let dataset = Dataset::from_frame(&create_heart_dataframe(60, 6)).unwrap();
    let suite = Suite {
        name: "mixed".to_string(),
        experiments: vec![
            ExperimentSpec::new("Good", FeaturePolicy::Baseline, Scaler::Standard, small_forest(1)),
            ExperimentSpec::new(
                "Leaky",
                FeaturePolicy::Columns(vec!["age".into(), "time".into()]),
                Scaler::Standard,
                small_forest(1),
            ),
            ExperimentSpec::new("AlsoGood", FeaturePolicy::Baseline, Scaler::MinMax, small_forest(2)),
        ],
        references: vec![(REFERENCE_BASELINE.to_string(), REFERENCE_BASELINE_METRICS)],
    };

    let mut table = ResultsTable::new();
    let run = run_suite(&dataset, &suite, &ExperimentConfig::default(), &mut table);

    assert_eq!(run.completed.len(), 2);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].name, "Leaky");
    assert!(run.failures[0].error.contains("time"));

    let names: Vec<&str> = table.rows().iter().map(|r| r.experiment.as_str()).collect();
    assert_eq!(names, ["Good", "AlsoGood", REFERENCE_BASELINE]);
    assert!(table.get(REFERENCE_BASELINE).unwrap().reference);
}

#[test]
fn test_forest_search_reports_cross_validation() {
    let dataset = Dataset::from_frame(&create_heart_dataframe(150, 8)).unwrap();
    let mut space = SearchSpace::default().with_n_iter(3).with_cv_folds(3).with_seed(42);
    space.n_estimators = vec![10, 20];
    let spec = ExperimentSpec::new(
        "RF_Search",
        FeaturePolicy::Baseline,
        Scaler::Standard,
        ModelConfiguration::ForestSearch(space),
    );

    let outcome = run_experiment(&dataset, &spec, &ExperimentConfig::default()).unwrap();

    let search = outcome.details.search.as_ref().unwrap();
    assert_eq!(search.candidates_evaluated, 3);
    assert!((0.0..=1.0).contains(&search.best_cv_f1));
    assert!([10, 20].contains(&search.selected.n_estimators));

    let cv = outcome.details.cross_validation.as_ref().unwrap();
    assert_eq!(cv.folds, 3);
    assert!((0.0..=1.0).contains(&cv.auc.mean));
}

#[test]
fn test_features_suite_runs_every_policy() {
    let dataset = Dataset::from_frame(&create_heart_dataframe(150, 9)).unwrap();
    let config = ExperimentConfig::default();
    let mut table = ResultsTable::new();

    let run = run_suite(&dataset, &features_suite(&config), &config, &mut table);

    assert!(run.failures.is_empty(), "{:?}", run.failures);
    assert_eq!(table.len(), 5);
    assert_eq!(table.get("Discretization").unwrap().metrics.n_features, 3);
    assert_eq!(table.get("All_Features").unwrap().metrics.n_features, 14);
}

#[test]
fn test_describe_dataset_profile() {
    let dataset = Dataset::from_frame(&create_ten_row_dataframe()).unwrap();
    let profile = describe_dataset(&dataset).unwrap();

    assert_eq!(profile.rows, 10);
    assert_eq!(profile.columns.len(), REQUIRED_COLUMNS.len());
    assert_eq!(profile.class_balance.positives, 3);
    // every column but the outcome itself
    assert_eq!(profile.target_correlations.len(), REQUIRED_COLUMNS.len() - 1);
    let strongest = profile.target_correlations[0].1.abs();
    assert!(profile
        .target_correlations
        .iter()
        .all(|(_, r)| r.abs() <= strongest + 1e-12));

    let age = profile.columns.iter().find(|c| c.name == "age").unwrap();
    assert_eq!(age.min, 45.0);
    assert_eq!(age.max, 90.0);
}

#[test]
fn test_describe_splits_by_outcome() {
    let dataset = Dataset::from_frame(&create_ten_row_dataframe()).unwrap();
    let profile = describe_dataset(&dataset).unwrap();

    assert_eq!(profile.by_outcome.len(), NUMERICAL_COLUMNS.len());
    let age = profile.by_outcome.iter().find(|c| c.column == "age").unwrap();
    assert_eq!(age.survived.count, 7);
    assert_eq!(age.died.count, 3);
    assert!((age.died.mean - 253.0 / 3.0).abs() < 1e-12);
    assert!((age.t_statistic.unwrap() + 7.156193799465088).abs() < 1e-9);
    assert!(age.p_value.unwrap() < 0.01);

    let ef = profile
        .by_outcome
        .iter()
        .find(|c| c.column == "ejection_fraction")
        .unwrap();
    assert!((ef.t_statistic.unwrap() - 5.761101232688112).abs() < 1e-9);
    assert!((ef.p_value.unwrap() - 0.0006578090418375426).abs() < 1e-6);

    assert_eq!(profile.binary_associations.len(), BINARY_COLUMNS.len());
    let anaemia = profile
        .binary_associations
        .iter()
        .find(|a| a.column == "anaemia")
        .unwrap();
    assert_eq!(anaemia.contingency, [[5, 1], [2, 2]]);
    assert!((anaemia.chi_square.unwrap() - 0.17857142857142855).abs() < 1e-12);
    assert!((anaemia.p_value.unwrap() - 0.6726038174415166).abs() < 1e-9);
}
