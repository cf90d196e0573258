//! ## Training Schema
//!
//! The training schema is the contract between training and inference: the raw input columns the
//! model was trained from and the exact ordered list of encoded feature columns with their kinds.
//! It is persisted as a versioned JSON artifact next to the model and passed explicitly to the
//! inference path.

use crate::exceptions::{ImmoError, ImmoResult};
use arrow::datatypes::DataType;
use datafusion::common::DFSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Version written into every schema artifact. Loading a different version fails.
pub const SCHEMA_VERSION: u32 = 1;

/// Value domain of an encoded feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Boolean,
    Integer,
    Float,
}

impl FeatureKind {
    /// Classifies an Arrow type. Anything that is not boolean, integer or floating point is
    /// rejected.
    pub fn from_data_type(column: &str, data_type: &DataType) -> ImmoResult<Self> {
        match data_type {
            DataType::Boolean => Ok(FeatureKind::Boolean),
            dt if dt.is_integer() => Ok(FeatureKind::Integer),
            dt if dt.is_floating() => Ok(FeatureKind::Float),
            DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => Ok(FeatureKind::Float),
            other => Err(ImmoError::UnsupportedType {
                column: column.to_string(),
                data_type: other.to_string(),
            }),
        }
    }

    /// The Arrow type a column of this kind is stored as.
    pub fn data_type(&self) -> DataType {
        match self {
            FeatureKind::Boolean => DataType::Boolean,
            FeatureKind::Integer => DataType::Int64,
            FeatureKind::Float => DataType::Float64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: FeatureKind,
}

/// Persisted description of the frame a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSchema {
    pub version: u32,
    /// Name of the regression target.
    pub target: String,
    /// Raw input columns of the training data, target excluded.
    pub raw_columns: Vec<String>,
    /// Encoded feature columns in model order, target excluded.
    pub features: Vec<FeatureColumn>,
}

impl TrainingSchema {
    /// Builds the schema from the raw training frame and its encoded counterpart. Feature order is
    /// taken from `encoded` as is.
    pub fn from_frames(raw: &DFSchema, encoded: &DFSchema, target: &str) -> ImmoResult<Self> {
        if raw.field_with_unqualified_name(target).is_err()
            || encoded.field_with_unqualified_name(target).is_err()
        {
            return Err(ImmoError::SchemaMismatch(target.to_string()));
        }
        let raw_columns = raw
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .filter(|name| name != target)
            .collect();
        let features = encoded
            .fields()
            .iter()
            .filter(|field| field.name() != target)
            .map(|field| {
                Ok(FeatureColumn {
                    name: field.name().clone(),
                    kind: FeatureKind::from_data_type(field.name(), field.data_type())?,
                })
            })
            .collect::<ImmoResult<Vec<_>>>()?;
        Ok(Self {
            version: SCHEMA_VERSION,
            target: target.to_string(),
            raw_columns,
            features,
        })
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// Checks that a raw inference frame has exactly the raw columns seen at training time. A
    /// target column in the inference frame is tolerated.
    pub fn validate_raw(&self, raw: &DFSchema) -> ImmoResult<()> {
        let actual: HashSet<&str> = raw
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .filter(|name| *name != self.target)
            .collect();
        let expected: HashSet<&str> = self.raw_columns.iter().map(String::as_str).collect();

        let mut missing: Vec<&str> = expected.difference(&actual).copied().collect();
        let mut unexpected: Vec<&str> = actual.difference(&expected).copied().collect();
        if missing.is_empty() && unexpected.is_empty() {
            return Ok(());
        }
        missing.sort_unstable();
        unexpected.sort_unstable();
        Err(ImmoError::ValidationFailure(format!(
            "raw columns differ from training data (missing: [{}], unexpected: [{}])",
            missing.join(", "),
            unexpected.join(", ")
        )))
    }

    /// Writes the schema as JSON.
    pub fn save(&self, path: &Path) -> ImmoResult<()> {
        crate::io::write_json_atomic(self, path)
    }

    /// Reads a schema written by [`TrainingSchema::save`] and checks its version.
    pub fn load(path: &Path) -> ImmoResult<Self> {
        let schema: TrainingSchema = crate::io::read_json(path)?;
        if schema.version != SCHEMA_VERSION {
            return Err(ImmoError::ValidationFailure(format!(
                "schema artifact {} has version {}, expected {}",
                path.display(),
                schema.version,
                SCHEMA_VERSION
            )));
        }
        Ok(schema)
    }
}
