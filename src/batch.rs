//! ## Batch inference
//!
//! [`BatchPredictor`] scores every new dataset file of a production directory against a trained
//! [`ModelArtifact`]. Each file moves through the [`FileStage`]s in order; a failure aborts that
//! file only and is reported with the last stage it completed. Predictions are written as a JSON
//! array of numbers to `<stem>_predicted.json`, and a file with an existing prediction is skipped.

use crate::exceptions::{ImmoError, ImmoResult};
use crate::io;
use crate::matrix::FeatureMatrix;
use crate::model::ModelArtifact;
use crate::schema::TrainingSchema;
use crate::workflow::FeaturePipeline;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Progress of one inference file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileStage {
    Unprocessed,
    Validated,
    Imputed,
    Encoded,
    Reconciled,
    Predicted,
    Persisted,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStage::Unprocessed => "unprocessed",
            FileStage::Validated => "validated",
            FileStage::Imputed => "imputed",
            FileStage::Encoded => "encoded",
            FileStage::Reconciled => "reconciled",
            FileStage::Predicted => "predicted",
            FileStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// A file whose processing stopped with an error.
#[derive(Debug)]
pub struct FileFailure {
    pub input: PathBuf,
    /// Last stage the file completed.
    pub stage: FileStage,
    pub error: ImmoError,
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Prediction files written in this run.
    pub predicted: Vec<PathBuf>,
    /// Inputs that already had a prediction file.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
}

pub struct BatchPredictor {
    schema: TrainingSchema,
    model: ModelArtifact,
    predictions_dir: PathBuf,
    pipeline: FeaturePipeline,
}

impl BatchPredictor {
    /// Fails with a validation error when the model and the schema disagree on the feature count.
    pub fn new(
        schema: TrainingSchema,
        model: ModelArtifact,
        predictions_dir: PathBuf,
    ) -> ImmoResult<Self> {
        if model.n_features() != schema.features.len() {
            return Err(ImmoError::ValidationFailure(format!(
                "model expects {} features but the schema lists {}",
                model.n_features(),
                schema.features.len()
            )));
        }
        Ok(Self {
            schema,
            model,
            predictions_dir,
            pipeline: FeaturePipeline::new(),
        })
    }

    /// Where the predictions for `input` are written.
    pub fn prediction_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.predictions_dir.join(format!("{}_predicted.json", stem))
    }

    pub fn is_processed(&self, input: &Path) -> bool {
        self.prediction_path(input).exists()
    }

    /// Predicts every pending file of `input_dir`, in name order.
    ///
    /// Returns [`ImmoError::AllAlreadyProcessed`] when the directory has dataset files and all of
    /// them already have predictions.
    pub async fn run(&self, input_dir: &Path) -> ImmoResult<BatchReport> {
        let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        inputs.retain(|path| path.is_file() && io::is_dataset_file(path));
        inputs.sort();
        info!(dir = %input_dir.display(), files = inputs.len(), "found production files");

        let mut report = BatchReport::default();
        let (done, pending): (Vec<PathBuf>, Vec<PathBuf>) =
            inputs.into_iter().partition(|path| self.is_processed(path));
        for path in &done {
            info!(input = %path.display(), "skipping, predictions already exist");
        }
        report.skipped = done;
        if pending.is_empty() && !report.skipped.is_empty() {
            return Err(ImmoError::AllAlreadyProcessed(
                input_dir.display().to_string(),
            ));
        }

        for input in pending {
            let mut stage = FileStage::Unprocessed;
            match self.predict_file(&input, &mut stage).await {
                Ok(output) => {
                    info!(input = %input.display(), output = %output.display(), "saved predictions");
                    report.predicted.push(output);
                }
                Err(err) => {
                    error!(input = %input.display(), %stage, error = %err, "prediction failed");
                    report.failed.push(FileFailure {
                        input,
                        stage,
                        error: err,
                    });
                }
            }
        }
        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "some files could not be predicted");
        }
        Ok(report)
    }

    /// Runs one file through every stage, recording progress in `stage`. Returns the path of the
    /// written predictions.
    pub async fn predict_file(&self, input: &Path, stage: &mut FileStage) -> ImmoResult<PathBuf> {
        let ctx = io::session_context();
        let raw = io::load_dataset(&ctx, input).await?;

        let reconciled = self
            .pipeline
            .prepare_inference_tracked(raw, &self.schema, stage)
            .await?;
        let batches = reconciled.collect().await?;
        let matrix = FeatureMatrix::from_batches(&batches, &self.schema.feature_names(), None)?;
        *stage = FileStage::Reconciled;

        let predictions = self.model.predict(&matrix.features)?;
        *stage = FileStage::Predicted;

        let output = self.prediction_path(input);
        io::write_json_atomic(&predictions.to_vec(), &output)?;
        *stage = FileStage::Persisted;
        Ok(output)
    }
}
