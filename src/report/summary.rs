//! Data pipeline summary report

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use polars::prelude::DataFrame;

/// Table shape after one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageShape {
    pub stage: String,
    pub rows: usize,
    pub cols: usize,
}

/// What the data pipeline did, stage by stage.
#[derive(Debug, Default, Clone)]
pub struct PipelineSummary {
    pub stages: Vec<StageShape>,
    pub dropped_columns: Vec<String>,
    pub imputed: usize,
    pub unresolved: usize,
    pub encoded_columns: Vec<String>,
    pub from_cache: bool,
}

impl PipelineSummary {
    pub fn record(&mut self, stage: &str, df: &DataFrame) {
        let (rows, cols) = df.shape();
        self.stages.push(StageShape {
            stage: stage.to_string(),
            rows,
            cols,
        });
    }

    pub fn initial_rows(&self) -> Option<usize> {
        self.stages.first().map(|s| s.rows)
    }

    pub fn final_rows(&self) -> Option<usize> {
        self.stages.last().map(|s| s.rows)
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("DATA PIPELINE SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        if self.from_cache {
            println!(
                "      {}",
                style("Train/test split reused from cached artifacts").dim()
            );
            return;
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Rows").add_attribute(Attribute::Bold),
            Cell::new("Columns").add_attribute(Attribute::Bold),
            Cell::new("Δ Rows").add_attribute(Attribute::Bold),
        ]);

        let mut previous_rows: Option<usize> = None;
        for shape in &self.stages {
            let delta = previous_rows.map(|prev| shape.rows as i64 - prev as i64).unwrap_or(0);
            table.add_row(vec![
                Cell::new(&shape.stage),
                Cell::new(shape.rows),
                Cell::new(shape.cols),
                Cell::new(delta).fg(if delta < 0 { Color::Red } else { Color::White }),
            ]);
            previous_rows = Some(shape.rows);
        }

        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        println!();
        if let (Some(initial), Some(last)) = (self.initial_rows(), self.final_rows()) {
            println!(
                "      Rows kept: {} of {}",
                style(last).green().bold(),
                initial
            );
        }
        println!(
            "      Imputed values: {}   Unresolved: {}",
            style(self.imputed).green().bold(),
            style(self.unresolved).yellow().bold()
        );

        if !self.encoded_columns.is_empty() {
            println!(
                "      Nominal encoders saved: {}",
                style(self.encoded_columns.join(", ")).cyan()
            );
        }

        if !self.dropped_columns.is_empty() {
            println!(
                "      {}:",
                style(format!("Dropped columns ({})", self.dropped_columns.len())).yellow()
            );
            for column in &self.dropped_columns {
                println!("        {} {}", style("•").dim(), column);
            }
        }
    }
}
