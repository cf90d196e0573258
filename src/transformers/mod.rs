//! # Transformer Implementations
//!
//! The submodules contain the stages of the preprocessing pipeline.

pub mod categorical_encoding;
pub mod column_order;
pub mod imputation;
pub mod reconciliation;

use crate::exceptions::{ImmoError, ImmoResult};
use arrow::datatypes::DataType;
use datafusion::prelude::DataFrame;

/// Validates that every column in `target_cols` exists in the DataFrame.
/// Returns a schema mismatch naming the first missing column.
pub(crate) fn validate_columns(df: &DataFrame, target_cols: &[&str]) -> ImmoResult<()> {
    let schema = df.schema();
    for col_name in target_cols {
        if schema.field_with_name(None, col_name).is_err() {
            return Err(ImmoError::SchemaMismatch(col_name.to_string()));
        }
    }
    Ok(())
}

pub(crate) fn is_string_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}
