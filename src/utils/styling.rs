//! Terminal styling for step headers, status lines and the configuration card

use std::path::Path;
use std::time::Duration;

use console::{style, Emoji};

use crate::pipeline::ExperimentConfig;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static SEED: Emoji<'_, '_> = Emoji("🎲 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ██╗  ██╗███████╗██████╗ ██╗██████╗ ███████╗
    ██║  ██║██╔════╝██╔══██╗██║██╔══██╗██╔════╝
    ███████║█████╗  ██████╔╝██║██████╔╝█████╗
    ██╔══██║██╔══╝  ██╔═══╝ ██║██╔═══╝ ██╔══╝
    ██║  ██║██║     ██║     ██║██║     ███████╗
    ╚═╝  ╚═╝╚═╝     ╚═╝     ╚═╝╚═╝     ╚══════╝
    "#;

    println!();
    println!("{}", style(banner).red().bold());
    println!(
        "    {} {}",
        style("♥").red().bold(),
        style("Heart-failure survival experiments").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print the run configuration card
pub fn print_config(input: &Path, output_dir: &Path, suite: &str, config: &ExperimentConfig) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Input:  {:<39}│", FOLDER, truncate_path(input, 38));
    println!("    │  {} Suite:  {:<39}│", TARGET, truncate_string(suite, 38));
    println!("    │  {} Output: {:<39}│", SAVE, truncate_path(output_dir, 38));
    println!("    ├{}┤", line);
    println!(
        "    │  {} Seed:                  {:<24}│",
        SEED,
        style(config.seed).yellow()
    );
    println!(
        "    │  {} Test / validation:     {:<24}│",
        CHART,
        style(format!(
            "{:.0}% / {:.0}%",
            config.test_fraction * 100.0,
            config.validation_fraction * 100.0
        ))
        .yellow()
    );
    println!(
        "    │  {} CV folds / iterations: {:<24}│",
        CHART,
        style(format!("{} / {}", config.cv_folds, config.search_iterations)).yellow()
    );
    println!(
        "    │  {} Epochs / patience:     {:<24}│",
        CHART,
        style(format!(
            "{} / {} (batch {})",
            config.budget.max_epochs, config.budget.patience, config.budget.batch_size
        ))
        .yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Non-fatal problems: convergence warnings and skipped experiments
pub fn print_warning(message: &str) {
    println!("    {} {}", WARNING, style(message).yellow());
}

pub fn print_step_time(elapsed: Duration) {
    println!("      {}", style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim());
}

/// Print the final completion message
pub fn print_completion(suite: &str) {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style(format!("Suite '{}' complete!", suite)).green().bold()
    );
    println!();
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - (max_len - 3)).collect();
        format!("...{}", tail)
    }
}
