//! Terminal summaries rendered with comfy-table

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use super::results::{MetricKind, ResultsTable};
use crate::pipeline::{CvSummary, DatasetProfile, ExperimentFailure};

fn section_title(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|l| Cell::new(l).add_attribute(Attribute::Bold))
        .collect()
}

/// Build the comparison table; the best row by `metric` is highlighted
pub fn results_table(results: &ResultsTable, metric: MetricKind) -> Table {
    let best = results.best_by(metric).map(|row| row.experiment.as_str());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&[
        "Experiment",
        "Accuracy",
        "Precision",
        "Recall",
        "F1",
        "AUC",
        "Features",
    ]));

    for row in results.rows() {
        let m = &row.metrics;
        let name = if row.reference {
            Cell::new(format!("{} (reference)", row.experiment)).fg(Color::DarkGrey)
        } else if Some(row.experiment.as_str()) == best {
            Cell::new(format!("★ {}", row.experiment))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(&row.experiment)
        };
        table.add_row(vec![
            name,
            Cell::new(format!("{:.4}", m.accuracy)),
            Cell::new(format!("{:.4}", m.precision)),
            Cell::new(format!("{:.4}", m.recall)),
            Cell::new(format!("{:.4}", m.f1)),
            Cell::new(format!("{:.4}", m.auc)),
            Cell::new(m.n_features),
        ]);
    }
    table
}

pub fn display_results(results: &ResultsTable, metric: MetricKind) {
    section_title("📋", "EXPERIMENT COMPARISON");
    if results.is_empty() {
        println!("      {}", style("No experiments recorded").dim());
        return;
    }
    print_indented(&results_table(results, metric));

    if let Some(best) = results.best_by(metric) {
        println!();
        println!(
            "      Best by {}: {} ({:.4})",
            metric.label(),
            style(&best.experiment).green().bold(),
            metric.value(&best.metrics)
        );
    }
}

/// Show experiments that were skipped along with the reason
pub fn display_failures(failures: &[ExperimentFailure]) {
    if failures.is_empty() {
        return;
    }
    section_title("📝", "SKIPPED EXPERIMENTS");
    for failure in failures {
        println!(
            "      {} {}: {}",
            style("•").dim(),
            style(&failure.name).yellow(),
            failure.error
        );
    }
}

/// Mean ± std of the cross-validated forest
pub fn display_cross_validation(cv: &CvSummary) {
    section_title("🔁", &format!("{}-FOLD CROSS-VALIDATION", cv.folds));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Metric", "Mean", "Std"]));
    for (label, score) in [("Accuracy", cv.accuracy), ("F1", cv.f1), ("AUC", cv.auc)] {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format!("{:.4}", score.mean)),
            Cell::new(format!("{:.4}", score.std)),
        ]);
    }
    print_indented(&table);
}

pub fn display_profile(profile: &DatasetProfile) {
    section_title("📋", "DATASET PROFILE");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&[
        "Column", "Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max",
    ]));
    for c in &profile.columns {
        table.add_row(vec![
            Cell::new(&c.name),
            Cell::new(c.count),
            Cell::new(format!("{:.2}", c.mean)),
            Cell::new(format!("{:.2}", c.std)),
            Cell::new(format!("{:.2}", c.min)),
            Cell::new(format!("{:.2}", c.q25)),
            Cell::new(format!("{:.2}", c.median)),
            Cell::new(format!("{:.2}", c.q75)),
            Cell::new(format!("{:.2}", c.max)),
        ]);
    }
    print_indented(&table);

    let balance = &profile.class_balance;
    println!();
    println!(
        "      Outcome: {} survived, {} died ({:.1}% positive)",
        style(balance.negatives).cyan(),
        style(balance.positives).red(),
        balance.positive_rate() * 100.0
    );

    section_title("🔗", "CORRELATION WITH DEATH_EVENT");
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Column", "Pearson r"]));
    for (name, r) in &profile.target_correlations {
        let color = if r.abs() >= 0.2 { Color::Yellow } else { Color::White };
        table.add_row(vec![Cell::new(name), Cell::new(format!("{:+.4}", r)).fg(color)]);
    }
    print_indented(&table);

    if !profile.strong_pairs.is_empty() {
        println!();
        for pair in &profile.strong_pairs {
            println!(
                "      {} {} ↔ {}: {:+.4}",
                style("•").dim(),
                pair.feature1,
                pair.feature2,
                pair.correlation
            );
        }
    }

    if !profile.by_outcome.is_empty() {
        section_title("⚖️", "SURVIVED VS DIED");
        print_indented(&outcome_table(profile));
    }
}

fn format_p(p: Option<f64>) -> Cell {
    match p {
        Some(p) => {
            let stars = if p < 0.001 {
                "***"
            } else if p < 0.01 {
                "**"
            } else if p < 0.05 {
                "*"
            } else {
                "ns"
            };
            let color = if p < 0.05 { Color::Yellow } else { Color::White };
            Cell::new(format!("{:.4} {}", p, stars)).fg(color)
        }
        None => Cell::new("-"),
    }
}

/// Per-outcome means with Welch t-tests, then chi-square tests for binary columns
fn outcome_table(profile: &DatasetProfile) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Column", "Survived", "Died", "Statistic", "p-value"]));
    for c in &profile.by_outcome {
        table.add_row(vec![
            Cell::new(&c.column),
            Cell::new(format!("{:.2} ± {:.2}", c.survived.mean, c.survived.std)),
            Cell::new(format!("{:.2} ± {:.2}", c.died.mean, c.died.std)),
            Cell::new(c.t_statistic.map_or("-".to_string(), |t| format!("t = {:+.3}", t))),
            format_p(c.p_value),
        ]);
    }
    for a in &profile.binary_associations {
        let [[s0, d0], [s1, d1]] = a.contingency;
        table.add_row(vec![
            Cell::new(&a.column),
            Cell::new(format!("{}/{}", s1, s0 + s1)),
            Cell::new(format!("{}/{}", d1, d0 + d1)),
            Cell::new(a.chi_square.map_or("-".to_string(), |c| format!("χ² = {:.3}", c))),
            format_p(a.p_value),
        ]);
    }
    table
}
