//! ## Workflow
//!
//! [`FeaturePipeline`] sequences the preprocessing stages for both paths:
//!
//! - **training**: impute → encode → sort columns by name, then derive the [`TrainingSchema`];
//! - **inference**: check raw columns against the schema → impute → encode → reconcile.
//!
//! The `preprocess`, `train`, `predict` and `run` functions are the commands exposed by the binary.
//! Errors in the training commands propagate to the caller; the prediction command isolates
//! failures per input file (see [`crate::batch`]).

use crate::batch::{BatchPredictor, BatchReport, FileStage};
use crate::diagnostics;
use crate::exceptions::{ImmoError, ImmoResult};
use crate::io;
use crate::make_pipeline;
use crate::matrix::FeatureMatrix;
use crate::model::{r2_score, rmse, train_test_split, ModelArtifact};
use crate::schema::TrainingSchema;
use crate::settings::Settings;
use crate::transformers::categorical_encoding::CategoryEncoder;
use crate::transformers::column_order::ColumnSorter;
use crate::transformers::imputation::MissingValueImputer;
use crate::transformers::reconciliation::{reconcile, SchemaReconciler};
use datafusion::prelude::DataFrame;
use tracing::info;

/// A training frame ready to be persisted, with the schema derived from it.
#[derive(Debug)]
pub struct PreparedTraining {
    /// Imputed, encoded and name-sorted frame, target included.
    pub frame: DataFrame,
    pub schema: TrainingSchema,
}

/// Orchestrates the preprocessing stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturePipeline {
    diagnostics: bool,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables missing-value and type reports after each stage. They execute the plan, so they
    /// are off by default.
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Fills missing values of `df` with statistics learned from `df` itself.
    pub async fn impute(&self, df: DataFrame) -> ImmoResult<DataFrame> {
        let mut imputer = MissingValueImputer::new();
        imputer.fit(&df).await?;
        let imputed = imputer.transform(df)?;
        if self.diagnostics {
            diagnostics::log_missing("imputation", &imputed).await?;
        }
        Ok(imputed)
    }

    /// Encodes the categorical columns of an imputed frame.
    pub async fn encode(&self, df: DataFrame) -> ImmoResult<DataFrame> {
        let mut encoder = CategoryEncoder::new();
        encoder.fit(&df).await?;
        let encoded = encoder.transform(df)?;
        if self.diagnostics {
            diagnostics::log_missing("encoding", &encoded).await?;
            diagnostics::log_types("encoding", &encoded);
        }
        Ok(encoded)
    }

    /// Aligns an encoded frame to the training schema.
    pub fn reconcile(&self, df: DataFrame, schema: &TrainingSchema) -> ImmoResult<DataFrame> {
        SchemaReconciler::new(schema.clone()).transform(df)
    }

    /// Training path: impute, encode, sort columns and derive the training schema.
    pub async fn prepare_training(
        &self,
        raw: DataFrame,
        target: &str,
    ) -> ImmoResult<PreparedTraining> {
        info!("start preprocessing the training data");
        let raw_schema = raw.schema().clone();
        let mut pipeline = make_pipeline!(
            ("impute", MissingValueImputer::new()),
            ("encode", CategoryEncoder::new()),
            ("sort", ColumnSorter::new()),
        );
        let frame = pipeline.fit_transform(&raw).await?;
        if self.diagnostics {
            diagnostics::log_missing("training", &frame).await?;
            diagnostics::log_types("training", &frame);
        }
        let schema = TrainingSchema::from_frames(&raw_schema, frame.schema(), target)?;
        info!(features = schema.features.len(), "derived training schema");
        Ok(PreparedTraining { frame, schema })
    }

    /// Inference path: validate raw columns, impute, encode and reconcile against `schema`.
    pub async fn prepare_inference(
        &self,
        raw: DataFrame,
        schema: &TrainingSchema,
    ) -> ImmoResult<DataFrame> {
        let mut stage = FileStage::Unprocessed;
        self.prepare_inference_tracked(raw, schema, &mut stage).await
    }

    /// Same as [`FeaturePipeline::prepare_inference`], recording in `stage` the last stage the
    /// frame completed. On success the stage is [`FileStage::Encoded`]: the reconciled plan has
    /// not been executed yet.
    pub async fn prepare_inference_tracked(
        &self,
        raw: DataFrame,
        schema: &TrainingSchema,
        stage: &mut FileStage,
    ) -> ImmoResult<DataFrame> {
        schema.validate_raw(raw.schema())?;
        let raw = drop_target(raw, &schema.target)?;
        *stage = FileStage::Validated;

        let imputed = self.impute(raw).await?;
        *stage = FileStage::Imputed;

        let encoded = self.encode(imputed).await?;
        *stage = FileStage::Encoded;

        self.reconcile(encoded, schema)
    }
}

/// Removes the target column from an inference frame if it is present.
fn drop_target(df: DataFrame, target: &str) -> ImmoResult<DataFrame> {
    if df.schema().field_with_unqualified_name(target).is_ok() {
        Ok(df.drop_columns(&[target])?)
    } else {
        Ok(df)
    }
}

/// Evaluation of a freshly trained model on the held-out rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub rmse: f64,
    pub r2: f64,
}

/// Loads the raw training data, preprocesses it and writes the preprocessed CSV and the schema.
pub async fn preprocess(settings: &Settings) -> ImmoResult<TrainingSchema> {
    let ctx = io::session_context();
    let raw = io::load_dataset(&ctx, &settings.raw_data_path).await?;
    let prepared = FeaturePipeline::new()
        .with_diagnostics(true)
        .prepare_training(raw, &settings.target_column)
        .await?;
    io::write_csv(prepared.frame, &settings.preprocessed_data_path).await?;
    prepared.schema.save(&settings.schema_path)?;
    info!(path = %settings.schema_path.display(), "saved training schema");
    Ok(prepared.schema)
}

/// Trains the model on the preprocessed CSV and saves it next to the schema.
pub async fn train(settings: &Settings) -> ImmoResult<TrainingReport> {
    let schema = TrainingSchema::load(&settings.schema_path)?;
    let ctx = io::session_context();
    let df = io::load_dataset(&ctx, &settings.preprocessed_data_path).await?;
    let df = reconcile(df, &schema.features, &[schema.target.as_str()])?;
    let batches = df.collect().await?;
    let matrix =
        FeatureMatrix::from_batches(&batches, &schema.feature_names(), Some(&schema.target))?;
    let y = matrix
        .target
        .ok_or_else(|| ImmoError::SchemaMismatch(schema.target.clone()))?;

    let split = train_test_split(&matrix.features, &y, settings.test_size, settings.split_seed)?;
    info!(
        train = split.y_train.len(),
        test = split.y_test.len(),
        "split the data into training and testing sets"
    );
    let model = ModelArtifact::fit(&split.x_train, &split.y_train, settings.ridge_alpha)?;
    let predictions = model.predict(&split.x_test)?;
    let report = TrainingReport {
        train_rows: split.y_train.len(),
        test_rows: split.y_test.len(),
        rmse: rmse(&split.y_test, &predictions),
        r2: r2_score(&split.y_test, &predictions),
    };
    info!(rmse = report.rmse, r2 = report.r2, "trained ridge regression");
    model.save(&settings.model_path)?;
    info!(path = %settings.model_path.display(), "saved the model");
    Ok(report)
}

/// Predicts every new file in the production directory.
pub async fn predict(settings: &Settings) -> ImmoResult<BatchReport> {
    let schema = TrainingSchema::load(&settings.schema_path)?;
    let model = ModelArtifact::load(&settings.model_path)?;
    let predictor = BatchPredictor::new(schema, model, settings.predictions_dir.clone())?;
    predictor.run(&settings.production_dir).await
}

/// Preprocesses and trains in one go.
pub async fn run(settings: &Settings) -> ImmoResult<TrainingReport> {
    preprocess(settings).await?;
    train(settings).await
}
