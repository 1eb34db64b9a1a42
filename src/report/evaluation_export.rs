//! Evaluation report export and display

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use serde::Serialize;

use crate::config::ModelKind;
use crate::model::EvaluationReport;

/// Metadata about the training run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the export (ISO 8601 format)
    pub timestamp: String,
    pub churnflow_version: String,
    pub model_path: String,
    pub model_kind: ModelKind,
    pub target_column: String,
    pub feature_columns: Vec<String>,
    /// Accuracy on the training rows (not a generalization estimate)
    pub training_score: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Parameters for the evaluation export
pub struct ExportParams<'a> {
    pub model_path: &'a Path,
    pub model_kind: ModelKind,
    pub target_column: &'a str,
    pub feature_columns: &'a [String],
    pub training_score: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Serialize)]
struct EvaluationExport<'a> {
    metadata: RunMetadata,
    metrics: &'a EvaluationReport,
}

/// Write the evaluation metrics plus run metadata as pretty JSON.
pub fn export_evaluation(report: &EvaluationReport, output_path: &Path, params: &ExportParams) -> Result<()> {
    let export = EvaluationExport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            churnflow_version: env!("CARGO_PKG_VERSION").to_string(),
            model_path: params.model_path.display().to_string(),
            model_kind: params.model_kind,
            target_column: params.target_column.to_string(),
            feature_columns: params.feature_columns.to_vec(),
            training_score: params.training_score,
            train_rows: params.train_rows,
            test_rows: params.test_rows,
        },
        metrics: report,
    };

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize evaluation report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write evaluation report to {}", output_path.display()))?;

    Ok(())
}

/// Render metrics and the confusion matrix.
pub fn display_evaluation(report: &EvaluationReport, training_score: f64) {
    println!();
    println!(
        "    {} {}",
        style("📈").cyan(),
        style("MODEL EVALUATION").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut metrics = Table::new();
    metrics.load_preset(UTF8_FULL_CONDENSED);
    metrics.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    metrics.add_row(vec![
        Cell::new("Training score"),
        Cell::new(format!("{:.4}", training_score)).fg(Color::DarkGrey),
    ]);
    for (name, value) in [
        ("Accuracy", report.accuracy),
        ("Precision", report.precision),
        ("Recall", report.recall),
        ("F1", report.f1),
    ] {
        metrics.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.4}", value))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
    }

    for line in metrics.to_string().lines() {
        println!("    {}", line);
    }

    let mut cm = Table::new();
    cm.load_preset(UTF8_FULL_CONDENSED);
    cm.set_header(vec![
        Cell::new(""),
        Cell::new("Predicted 0").add_attribute(Attribute::Bold),
        Cell::new("Predicted 1").add_attribute(Attribute::Bold),
    ]);
    cm.add_row(vec![
        Cell::new("Actual 0").add_attribute(Attribute::Bold),
        Cell::new(report.true_negatives()).fg(Color::Green),
        Cell::new(report.false_positives()).fg(Color::Red),
    ]);
    cm.add_row(vec![
        Cell::new("Actual 1").add_attribute(Attribute::Bold),
        Cell::new(report.false_negatives()).fg(Color::Red),
        Cell::new(report.true_positives()).fg(Color::Green),
    ]);

    println!();
    for line in cm.to_string().lines() {
        println!("    {}", line);
    }
}
