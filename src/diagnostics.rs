//! Stage diagnostics: missing-value counts and column type summaries.
//!
//! These reports are telemetry for the person running the pipeline. They execute the plan built so
//! far, so the orchestrator only computes them when diagnostics are enabled.

use crate::exceptions::ImmoResult;
use crate::schema::FeatureKind;
use datafusion::prelude::DataFrame;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Column type summary of an encoded frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeReport {
    /// Distinct Arrow type names present in the frame.
    pub types: BTreeSet<String>,
    /// Columns whose type is not boolean, integer or floating point.
    pub residual: Vec<String>,
}

impl TypeReport {
    pub fn is_numeric(&self) -> bool {
        self.residual.is_empty()
    }
}

/// Counts the nulls of every column of `df`.
pub async fn missing_value_count(df: &DataFrame) -> ImmoResult<usize> {
    let batches = df.clone().collect().await?;
    Ok(batches
        .iter()
        .flat_map(|batch| batch.columns().iter().map(|column| column.null_count()))
        .sum())
}

/// Summarises the column types of `df` and flags non-numeric residue.
pub fn column_type_report(df: &DataFrame) -> TypeReport {
    let mut report = TypeReport::default();
    for field in df.schema().fields() {
        report.types.insert(field.data_type().to_string());
        if FeatureKind::from_data_type(field.name(), field.data_type()).is_err() {
            report.residual.push(field.name().clone());
        }
    }
    report
}

/// Logs the missing-value count after a stage.
pub async fn log_missing(stage: &str, df: &DataFrame) -> ImmoResult<usize> {
    let missing = missing_value_count(df).await?;
    if missing == 0 {
        info!(stage, missing, "no missing values remain");
    } else {
        warn!(stage, missing, "missing values remain");
    }
    Ok(missing)
}

/// Logs the column type summary after encoding.
pub fn log_types(stage: &str, df: &DataFrame) -> TypeReport {
    let report = column_type_report(df);
    let types = report.types.iter().cloned().collect::<Vec<_>>().join(", ");
    if report.is_numeric() {
        info!(stage, %types, "all columns are numeric or boolean");
    } else {
        warn!(stage, %types, residual = ?report.residual, "non-numeric columns remain");
    }
    report
}
