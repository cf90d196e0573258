//! Conversion of collected record batches into a dense `f64` feature matrix.

use crate::exceptions::{ImmoError, ImmoResult};
use crate::schema::FeatureKind;
use arrow::array::{Array, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use ndarray::{Array1, Array2};

/// Dense features (one row per observation) with an optional target vector.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub features: Array2<f64>,
    pub target: Option<Array1<f64>>,
}

/// Reads one column of every batch as `f64`, rejecting nulls and non-numeric types.
fn column_values(batches: &[RecordBatch], name: &str) -> ImmoResult<Vec<f64>> {
    let mut values = Vec::new();
    for batch in batches {
        let column = batch
            .column_by_name(name)
            .ok_or_else(|| ImmoError::SchemaMismatch(name.to_string()))?;
        FeatureKind::from_data_type(name, column.data_type())?;
        if column.null_count() > 0 {
            return Err(ImmoError::MissingValue(name.to_string()));
        }
        let floats = cast(column, &DataType::Float64)?;
        let floats = floats
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| {
                ImmoError::ArrowError(arrow::error::ArrowError::CastError(format!(
                    "Expected Float64 array for column {}",
                    name
                )))
            })?;
        values.extend(floats.values().iter().copied());
    }
    Ok(values)
}

impl FeatureMatrix {
    /// Builds the matrix from `batches`, taking `feature_names` in the given order.
    pub fn from_batches(
        batches: &[RecordBatch],
        feature_names: &[String],
        target: Option<&str>,
    ) -> ImmoResult<Self> {
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        let mut features = Array2::<f64>::zeros((rows, feature_names.len()));
        for (j, name) in feature_names.iter().enumerate() {
            let values = column_values(batches, name)?;
            for (i, value) in values.into_iter().enumerate() {
                features[[i, j]] = value;
            }
        }
        let target = target
            .map(|name| column_values(batches, name).map(Array1::from_vec))
            .transpose()?;
        Ok(Self {
            feature_names: feature_names.to_vec(),
            features,
            target,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }
}
