//! hfpipe: heart-failure experiment CLI
//!
//! Loads the clinical records, then either profiles the dataset or runs one
//! or more experiment suites and writes their comparison reports.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use hfpipe::cli::{confirm_overwrite, Cli, Commands};
use hfpipe::pipeline::{
    describe_dataset, features_suite, forest_suite, load_dataset, network_suite, run_suite,
    Dataset, ExperimentConfig, Suite,
};
use hfpipe::report::{
    display_cross_validation, display_failures, display_profile, display_results,
    package_results, MetricKind, ResultsTable, RunMetadata, SuiteArtifacts, PROFILE_FILE,
};
use hfpipe::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config,
    print_info, print_step_header, print_step_time, print_success, print_warning,
};

/// Metric used to pick the best experiment of a suite
const RANKING_METRIC: MetricKind = MetricKind::F1;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command();
    let config = cli.experiment_config();
    let label = format!("{:?}", command).to_lowercase();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&cli.input, &cli.output_dir, &label, &config);

    std::fs::create_dir_all(&cli.output_dir).with_context(|| {
        format!("Failed to create output directory: {}", cli.output_dir.display())
    })?;

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading clinical records...");
    let dataset = load_dataset(&cli.input, cli.infer_schema_length)
        .with_context(|| format!("Failed to load dataset: {}", cli.input.display()))?;
    finish_with_success(&spinner, "Dataset loaded");

    let balance = dataset.class_balance()?;
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", dataset.height());
    println!("      Columns: {}", dataset.column_names().len());
    println!(
        "      Deaths: {} ({:.1}%)",
        balance.positives,
        balance.positive_rate() * 100.0
    );
    print_step_time(step_start.elapsed());

    if command == Commands::Describe {
        run_describe(&dataset, &cli.output_dir, cli.no_confirm)?;
    } else {
        for (index, name) in command.suites().iter().enumerate() {
            run_named_suite(&cli, &dataset, &config, name, index as u8 + 2)?;
        }
    }

    print_completion(&label);
    Ok(())
}

fn build_suite(name: &str, config: &ExperimentConfig) -> Result<Suite> {
    match name {
        "features" => Ok(features_suite(config)),
        "forest" => Ok(forest_suite(config)),
        "network" => Ok(network_suite(config)),
        other => anyhow::bail!("Unknown suite: {}", other),
    }
}

fn run_describe(dataset: &Dataset, output_dir: &Path, no_confirm: bool) -> Result<()> {
    print_step_header(2, "Describe Dataset");
    let step_start = Instant::now();

    let spinner = create_spinner("Computing column statistics and correlations...");
    let profile = describe_dataset(dataset)?;
    finish_with_success(&spinner, "Profile computed");
    display_profile(&profile);

    let path = output_dir.join(PROFILE_FILE);
    if path.exists() && !no_confirm && !confirm_overwrite(&[path.as_path()])? {
        print_info("Kept existing dataset profile");
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&profile)
        .context("Failed to serialize dataset profile to JSON")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write profile to {}", path.display()))?;
    println!();
    print_success(&format!("Profile saved to {}", path.display()));
    print_step_time(step_start.elapsed());
    Ok(())
}

fn run_named_suite(
    cli: &Cli,
    dataset: &Dataset,
    config: &ExperimentConfig,
    name: &str,
    step: u8,
) -> Result<()> {
    let suite = build_suite(name, config)?;
    print_step_header(step, &format!("Suite: {} ({} experiments)", name, suite.experiments.len()));

    let artifacts = SuiteArtifacts::for_suite(&cli.output_dir, name);
    let existing = artifacts.existing(cli.bundle);
    if !existing.is_empty() && !cli.no_confirm && !confirm_overwrite(&existing)? {
        print_info(&format!("Skipped suite '{}'", name));
        return Ok(());
    }

    let step_start = Instant::now();
    let mut table = ResultsTable::new();
    let run = run_suite(dataset, &suite, config, &mut table);

    for outcome in &run.completed {
        for warning in outcome.warnings() {
            print_warning(&format!("{}: {}", outcome.name, warning));
        }
    }
    display_failures(&run.failures);
    display_results(&table, RANKING_METRIC);
    for outcome in &run.completed {
        if let Some(cv) = &outcome.details.cross_validation {
            display_cross_validation(cv);
        }
    }

    let metadata = RunMetadata::new(name, &cli.input, config);
    table.write_csv(&artifacts.comparison_csv)?;
    table.write_json(&artifacts.details_json, &metadata, RANKING_METRIC)?;
    println!();
    print_success(&format!("Comparison saved to {}", artifacts.comparison_csv.display()));
    print_success(&format!("Details saved to {}", artifacts.details_json.display()));

    if cli.bundle {
        package_results(&artifacts)?;
        print_success(&format!("Bundle saved to {}", artifacts.bundle_zip.display()));
    }
    print_step_time(step_start.elapsed());
    Ok(())
}
