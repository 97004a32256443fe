//! Results aggregation and export
//!
//! [`ResultsTable`] keeps one row per experiment name in first-insertion
//! order. Recording a name twice replaces the row's values in place.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{ExperimentConfig, ExperimentDetails, MetricResult};

/// Metric used to rank experiments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Accuracy,
    Precision,
    Recall,
    F1,
    Auc,
}

impl MetricKind {
    pub fn value(self, metrics: &MetricResult) -> f64 {
        match self {
            MetricKind::Accuracy => metrics.accuracy,
            MetricKind::Precision => metrics.precision,
            MetricKind::Recall => metrics.recall,
            MetricKind::F1 => metrics.f1,
            MetricKind::Auc => metrics.auc,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Accuracy => "accuracy",
            MetricKind::Precision => "precision",
            MetricKind::Recall => "recall",
            MetricKind::F1 => "f1",
            MetricKind::Auc => "auc",
        }
    }
}

/// One experiment's entry
#[derive(Debug, Clone, Serialize)]
pub struct ResultRow {
    pub experiment: String,
    /// Published figures shown for comparison; never selected as best
    pub reference: bool,
    pub metrics: MetricResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ExperimentDetails>,
}

/// Run-level context stored alongside the rows in JSON exports
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub generated_at: String,
    pub tool_version: String,
    pub suite: String,
    pub input_file: String,
    pub configuration: ExperimentConfig,
}

impl RunMetadata {
    pub fn new(suite: &str, input_file: &Path, configuration: &ExperimentConfig) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            suite: suite.to_string(),
            input_file: input_file.display().to_string(),
            configuration: configuration.clone(),
        }
    }
}

#[derive(Serialize)]
struct BestEntry<'a> {
    metric: MetricKind,
    experiment: &'a str,
    value: f64,
}

#[derive(Serialize)]
struct DetailsExport<'a> {
    metadata: &'a RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    best: Option<BestEntry<'a>>,
    experiments: &'a [ResultRow],
}

/// Insertion-ordered experiment results keyed by name
#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    rows: Vec<ResultRow>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn upsert(&mut self, row: ResultRow) {
        match self.rows.iter_mut().find(|r| r.experiment == row.experiment) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
    }

    pub fn record(&mut self, name: &str, metrics: MetricResult) {
        self.upsert(ResultRow {
            experiment: name.to_string(),
            reference: false,
            metrics,
            details: None,
        });
    }

    pub fn record_detailed(&mut self, name: &str, metrics: MetricResult, details: ExperimentDetails) {
        self.upsert(ResultRow {
            experiment: name.to_string(),
            reference: false,
            metrics,
            details: Some(details),
        });
    }

    /// Record externally published figures for side-by-side comparison
    pub fn record_reference(&mut self, name: &str, metrics: MetricResult) {
        self.upsert(ResultRow {
            experiment: name.to_string(),
            reference: true,
            metrics,
            details: None,
        });
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn get(&self, name: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.experiment == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Non-reference row maximizing `metric`; ties keep the earliest row
    pub fn best_by(&self, metric: MetricKind) -> Option<&ResultRow> {
        self.rows
            .iter()
            .filter(|r| !r.reference && !metric.value(&r.metrics).is_nan())
            .fold(None, |best: Option<&ResultRow>, row| match best {
                Some(b) if metric.value(&b.metrics) >= metric.value(&row.metrics) => Some(b),
                _ => Some(row),
            })
    }

    /// Write the comparison table: one row per experiment, metrics to 4 decimals
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        use std::io::Write;

        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

        writeln!(file, "experiment,accuracy,precision,recall,f1,auc,n_features")?;
        for row in &self.rows {
            let m = &row.metrics;
            writeln!(
                file,
                "{},{:.4},{:.4},{:.4},{:.4},{:.4},{}",
                escape_csv_field(&row.experiment),
                m.accuracy,
                m.precision,
                m.recall,
                m.f1,
                m.auc,
                m.n_features
            )?;
        }

        Ok(())
    }

    /// Write every row with its details plus run metadata
    pub fn write_json(&self, path: &Path, metadata: &RunMetadata, metric: MetricKind) -> Result<()> {
        let export = DetailsExport {
            metadata,
            best: self.best_by(metric).map(|row| BestEntry {
                metric,
                experiment: &row.experiment,
                value: metric.value(&row.metrics),
            }),
            experiments: &self.rows,
        };

        let json = serde_json::to_string_pretty(&export)
            .context("Failed to serialize experiment results to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;

        Ok(())
    }
}

/// Escape a field for CSV (handle commas and quotes)
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(f1: f64) -> MetricResult {
        MetricResult {
            accuracy: 0.8,
            precision: 0.7,
            recall: 0.6,
            f1,
            auc: 0.9,
            n_features: 3,
        }
    }

    #[test]
    fn test_overwrite_keeps_position_and_latest_values() {
        let mut table = ResultsTable::new();
        table.record("a", metrics(0.1));
        table.record("b", metrics(0.2));
        table.record("a", metrics(0.3));
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].experiment, "a");
        assert_eq!(table.rows()[0].metrics.f1, 0.3);
    }

    #[test]
    fn test_best_skips_reference_rows_and_keeps_first_tie() {
        let mut table = ResultsTable::new();
        table.record("first", metrics(0.5));
        table.record("second", metrics(0.5));
        table.record_reference("published", metrics(0.9));
        assert_eq!(table.best_by(MetricKind::F1).unwrap().experiment, "first");
    }

    #[test]
    fn test_best_of_empty_table() {
        assert!(ResultsTable::new().best_by(MetricKind::Auc).is_none());
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
    }
}
