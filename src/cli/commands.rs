//! Subcommand runners

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use console::style;
use serde_json::{Map, Value};

use crate::config::PipelineConfig;
use crate::model::{evaluate, InferenceEngine, ModelArtifact, ModelTrainer, Prediction};
use crate::pipeline::{DataPipeline, PreparedData};
use crate::report::{display_evaluation, export_evaluation, ExportParams};
use crate::utils::{
    create_spinner, finish_with_success, print_count, print_info, print_step_header,
    print_step_time, print_success,
};

/// Run the data pipeline and show what it did.
pub fn run_data(config: &PipelineConfig, force_rebuild: bool) -> Result<PreparedData> {
    print_step_header(1, "Data Pipeline");
    let step_start = Instant::now();

    let prepared = DataPipeline::new(config)
        .run(force_rebuild)
        .context("Data pipeline failed")?;

    prepared.summary.display();
    println!();
    print_count("training rows", prepared.split.x_train.height());
    print_count("test rows", prepared.split.x_test.height());
    print_success(&format!(
        "Split saved to {}",
        config.data.splits_dir().display()
    ));
    print_step_time(step_start.elapsed());
    Ok(prepared)
}

/// Data pipeline, then training, evaluation, and artifact export.
pub fn run_train(config: &PipelineConfig, force_rebuild: bool) -> Result<()> {
    let prepared = run_data(config, force_rebuild)?;
    let split = &prepared.split;

    print_step_header(2, "Model Training");
    let step_start = Instant::now();
    let spinner = create_spinner(&format!("Fitting {}...", config.model.kind.display_name()));
    let (classifier, training_score) = ModelTrainer::new(config.model.clone())
        .train(&split.x_train, &split.y_train)
        .context("Training failed")?;
    finish_with_success(
        &spinner,
        &format!("Model fitted (training score {:.4})", training_score),
    );
    print_step_time(step_start.elapsed());

    print_step_header(3, "Evaluation");
    let report = evaluate(&classifier, &split.x_test, &split.y_test).context("Evaluation failed")?;
    display_evaluation(&report, training_score);

    print_step_header(4, "Saving Artifacts");
    let model_path = config.data.model_path();
    let artifact = ModelArtifact::new(classifier, prepared.scaler, config.split.target.clone());
    artifact
        .save(&model_path)
        .with_context(|| format!("Failed to save model to {}", model_path.display()))?;
    print_success(&format!("Model saved to {}", model_path.display()));

    let report_path = config.data.evaluation_path();
    export_evaluation(
        &report,
        &report_path,
        &ExportParams {
            model_path: &model_path,
            model_kind: artifact.kind(),
            target_column: &config.split.target,
            feature_columns: artifact.feature_columns(),
            training_score,
            train_rows: split.x_train.height(),
            test_rows: split.x_test.height(),
        },
    )?;
    print_success(&format!("Evaluation saved to {}", report_path.display()));
    Ok(())
}

/// Parse a record given literally or through a file.
pub fn read_record(record: Option<&str>, record_file: Option<&Path>) -> Result<Map<String, Value>> {
    let text = match (record, record_file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read record file {}", path.display()))?,
        (None, None) => anyhow::bail!("A record is required. Use --record or --record-file."),
    };

    match serde_json::from_str::<Value>(&text).context("Record is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Record must be a JSON object, got {}", other),
    }
}

/// Load the persisted model and encoders, then score one record.
pub fn run_predict(config: &PipelineConfig, record: &Map<String, Value>) -> Result<Prediction> {
    let mut engine = InferenceEngine::new(config);
    engine
        .load_model(&config.data.model_path())
        .context("Failed to load model. Run `churnflow train` first.")?;
    engine
        .load_encoders(&config.data.encoders_dir())
        .context("Failed to load encoders")?;

    let prediction = engine.predict(record).context("Prediction failed")?;

    println!();
    let status = if prediction.prediction == 1 {
        style(prediction.status.as_str()).red().bold()
    } else {
        style(prediction.status.as_str()).green().bold()
    };
    println!(
        "    {} {}  (churn probability {:.4})",
        style("Prediction:").bold(),
        status,
        prediction.confidence
    );
    for warning in &prediction.warnings {
        print_info(&format!(
            "Unseen value '{}' in column '{}' was encoded as missing",
            warning.value, warning.column
        ));
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(prediction)
}
