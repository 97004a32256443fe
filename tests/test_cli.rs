//! Tests for CLI argument parsing and the binary's outputs

use assert_cmd::Command;
use clap::Parser;
use hfpipe::cli::{Cli, Commands, DEFAULT_INPUT};
use predicates::prelude::*;
use std::path::PathBuf;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_cli_default_values() {
    let cli = Cli::parse_from(["hfpipe"]);

    assert_eq!(cli.command(), Commands::All);
    assert_eq!(cli.input, PathBuf::from(DEFAULT_INPUT));
    assert_eq!(cli.output_dir, PathBuf::from("."));
    assert_eq!(cli.seed, 42);
    assert_eq!(cli.test_fraction, 0.2);
    assert_eq!(cli.validation_fraction, 0.2);
    assert_eq!(cli.cv_folds, 5);
    assert_eq!(cli.search_iterations, 100);
    assert_eq!(cli.max_epochs, 100);
    assert_eq!(cli.patience, 15);
    assert_eq!(cli.batch_size, 16);
    assert!(!cli.bundle);
    assert!(!cli.no_confirm);
    assert_eq!(cli.infer_schema_length, 10000);
}

#[test]
fn test_cli_builds_experiment_config() {
    let cli = Cli::parse_from([
        "hfpipe",
        "--seed",
        "7",
        "--test-fraction",
        "0.3",
        "--cv-folds",
        "3",
        "--max-epochs",
        "50",
        "--patience",
        "4",
        "network",
    ]);

    assert_eq!(cli.command(), Commands::Network);
    let config = cli.experiment_config();
    assert_eq!(config.seed, 7);
    assert_eq!(config.test_fraction, 0.3);
    assert_eq!(config.validation_fraction, 0.2);
    assert_eq!(config.cv_folds, 3);
    assert_eq!(config.budget.max_epochs, 50);
    assert_eq!(config.budget.patience, 4);
    assert_eq!(config.budget.batch_size, 16);
}

#[test]
fn test_cli_rejects_out_of_range_fraction() {
    assert!(Cli::try_parse_from(["hfpipe", "--test-fraction", "1.5"]).is_err());
    assert!(Cli::try_parse_from(["hfpipe", "--cv-folds", "1"]).is_err());
}

#[test]
fn test_cli_subcommands() {
    for (arg, expected) in [
        ("describe", Commands::Describe),
        ("features", Commands::Features),
        ("forest", Commands::Forest),
        ("all", Commands::All),
    ] {
        assert_eq!(Cli::parse_from(["hfpipe", arg]).command(), expected);
    }
}

#[test]
fn test_binary_describe_writes_profile() {
    let mut df = create_heart_dataframe(60, 12);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let out = temp_dir.path().join("out");

    Command::cargo_bin("hfpipe")
        .unwrap()
        .args(["describe", "--no-confirm", "-i"])
        .arg(&csv_path)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("DATASET PROFILE"));

    let profile: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("dataset_profile.json")).unwrap())
            .unwrap();
    assert_eq!(profile["rows"], 60);
    assert_eq!(profile["by_outcome"].as_array().unwrap().len(), 7);
    assert!(profile["by_outcome"][0]["p_value"].is_number());
    assert_eq!(profile["binary_associations"].as_array().unwrap().len(), 5);
}

#[test]
fn test_binary_features_suite_writes_reports_and_bundle() {
    let mut df = create_heart_dataframe(120, 13);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let out = temp_dir.path().to_path_buf();

    Command::cargo_bin("hfpipe")
        .unwrap()
        .args(["features", "--no-confirm", "--bundle", "-i"])
        .arg(&csv_path)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let csv = std::fs::read_to_string(out.join("features_comparison.csv")).unwrap();
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.contains("All_Features,"));
    assert!(out.join("features_details.json").exists());
    assert!(out.join("features_results.zip").exists());
}

#[test]
fn test_binary_missing_input_fails() {
    let temp_dir = tempfile::TempDir::new().unwrap();

    Command::cargo_bin("hfpipe")
        .unwrap()
        .args(["describe", "--no-confirm", "-i", "/nonexistent/heart.csv", "-o"])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load dataset"));
}
