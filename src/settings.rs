//! ## Settings
//!
//! Paths and parameters consumed by the workflow commands. Every value can be overridden
//! through an environment variable; unset variables fall back to the defaults below.

use crate::exceptions::{ImmoError, ImmoResult};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_TARGET_COLUMN: &str = "Verkaufspreis";

/// Runtime configuration for the preprocess, train and predict commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Raw training CSV.
    pub raw_data_path: PathBuf,
    /// Imputed and encoded training CSV, written by `preprocess`.
    pub preprocessed_data_path: PathBuf,
    /// Fitted model artifact.
    pub model_path: PathBuf,
    /// Training schema artifact, persisted next to the model.
    pub schema_path: PathBuf,
    /// Directory receiving `<stem>_predicted.json` files.
    pub predictions_dir: PathBuf,
    /// Directory scanned for new input files at prediction time.
    pub production_dir: PathBuf,
    pub target_column: String,
    /// L2 penalty of the ridge regression.
    pub ridge_alpha: f64,
    /// Fraction of rows held out for evaluation.
    pub test_size: f64,
    pub split_seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            raw_data_path: PathBuf::from("data/train.csv"),
            preprocessed_data_path: PathBuf::from("data/preprocessed.csv"),
            model_path: PathBuf::from("models/model.json"),
            schema_path: PathBuf::from("models/schema.json"),
            predictions_dir: PathBuf::from("predictions"),
            production_dir: PathBuf::from("data/production"),
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            ridge_alpha: 1.0,
            test_size: 0.2,
            split_seed: 42,
        }
    }
}

impl Settings {
    /// Builds settings from the process environment.
    pub fn from_env() -> ImmoResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> ImmoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(path) = lookup("RAW_DATA_PATH") {
            settings.raw_data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("PREPROCESSED_DATA_PATH") {
            settings.preprocessed_data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("MODEL_PATH") {
            settings.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("SCHEMA_PATH") {
            settings.schema_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("PREDICTIONS_PATH") {
            settings.predictions_dir = PathBuf::from(path);
        }
        if let Some(path) = lookup("PRODUCTION_DATA_PATH") {
            settings.production_dir = PathBuf::from(path);
        }
        if let Some(target) = lookup("TARGET_COLUMN") {
            settings.target_column = target;
        }
        if let Some(alpha) = lookup("RIDGE_ALPHA") {
            settings.ridge_alpha = parse_var("RIDGE_ALPHA", &alpha)?;
        }
        if let Some(test_size) = lookup("TEST_SIZE") {
            settings.test_size = parse_var("TEST_SIZE", &test_size)?;
        }
        if let Some(seed) = lookup("SPLIT_SEED") {
            settings.split_seed = parse_var("SPLIT_SEED", &seed)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> ImmoResult<()> {
        if self.target_column.trim().is_empty() {
            return Err(ImmoError::Config("TARGET_COLUMN must not be empty".into()));
        }
        if !(self.ridge_alpha.is_finite() && self.ridge_alpha >= 0.0) {
            return Err(ImmoError::Config(format!(
                "RIDGE_ALPHA must be a non-negative number, got {}",
                self.ridge_alpha
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ImmoError::Config(format!(
                "TEST_SIZE must be strictly between 0 and 1, got {}",
                self.test_size
            )));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> ImmoResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ImmoError::Config(format!("Invalid {}: {}", key, e)))
}
