//! ## Custom Errors for the Immo Pipeline
//!
//! This module defines the error type shared by every stage of the pipeline.
//! It uses the `thiserror` crate to derive the `Error` trait.
//! The [`ImmoError`] enum covers both the domain failures of the pipeline (schema mismatches,
//! unmapped categories, validation failures) and the wrapped errors of the underlying
//! DataFusion, Arrow, Parquet, JSON and I/O layers.
//!
//! The [`ImmoResult`] type alias is used for every fallible operation in the crate.
//!
//! ### Example
//!
//! ```rust
//! use immo_pipeline::exceptions::{ImmoError, ImmoResult};
//!
//! fn check_column(present: bool) -> ImmoResult<()> {
//!     if present {
//!         Ok(())
//!     } else {
//!         Err(ImmoError::SchemaMismatch("Strassenlaenge".into()))
//!     }
//! }
//! ```

use thiserror::Error;

/// Errors raised by the Immo pipeline.
#[derive(Debug, Error)]
pub enum ImmoError {
    /// Wraps underlying I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from Parquet.
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Wraps JSON (de)serialization errors for artifacts and predictions.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A column the rule tables expect is absent from the raw input.
    #[error("Schema mismatch: expected column '{0}' is missing")]
    SchemaMismatch(String),

    /// The input does not match what the persisted artifacts were built for.
    #[error("Validation failure: {0}")]
    ValidationFailure(String),

    /// An ordinal or flag column holds a value outside its lookup table.
    #[error("Unmapped category: column '{column}' contains value '{value}'")]
    UnmappedCategory { column: String, value: String },

    /// Every file of an inference batch already has a prediction on disk.
    #[error("All files in '{0}' have already been processed")]
    AllAlreadyProcessed(String),

    /// A column has a type the feature matrix cannot hold.
    #[error("Unsupported type for column '{column}': {data_type}")]
    UnsupportedType { column: String, data_type: String },

    /// A missing value reached the numeric feature matrix.
    #[error("Missing value in column '{0}'")]
    MissingValue(String),

    /// Indicates that an invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An environment setting could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Indicates the transform method was called before calling fit for a stateful transformer.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,
}

/// A convenient result type for pipeline operations.
pub type ImmoResult<T> = std::result::Result<T, ImmoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test io error");
        let err: ImmoError = io_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("I/O error:"));
        assert!(err_msg.contains("test io error"));
    }

    #[test]
    fn test_datafusion_error() {
        let df_err = datafusion::error::DataFusionError::Plan("test plan error".into());
        let err: ImmoError = df_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("DataFusion error:"));
        assert!(err_msg.contains("test plan error"));
    }

    #[test]
    fn test_arrow_error() {
        let arrow_err = arrow::error::ArrowError::ComputeError("test compute error".into());
        let err: ImmoError = arrow_err.into();
        assert!(format!("{}", err).contains("Arrow error:"));
    }

    #[test]
    fn test_json_error() {
        let json_err = serde_json::from_str::<Vec<f64>>("not json").unwrap_err();
        let err: ImmoError = json_err.into();
        assert!(format!("{}", err).contains("JSON error:"));
    }

    #[test]
    fn test_schema_mismatch_error() {
        let err = ImmoError::SchemaMismatch("Id".into());
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Schema mismatch"));
        assert!(err_msg.contains("'Id'"));
    }

    #[test]
    fn test_unmapped_category_error() {
        let err = ImmoError::UnmappedCategory {
            column: "Versorgung".into(),
            value: "XYZ".into(),
        };
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Versorgung"));
        assert!(err_msg.contains("XYZ"));
    }

    #[test]
    fn test_fit_not_called_error() {
        let err = ImmoError::FitNotCalled;
        assert!(format!("{}", err).contains("before fit"));
    }

    #[test]
    fn test_all_already_processed_error() {
        let err = ImmoError::AllAlreadyProcessed("data/production".into());
        assert!(format!("{}", err).contains("already been processed"));
    }
}
