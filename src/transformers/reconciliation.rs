//! ## Schema reconciliation
//!
//! One-hot expansion produces a column set that depends on the values present in the data, so an
//! encoded inference frame rarely has the exact columns of the training frame. [`SchemaReconciler`]
//! reindexes such a frame onto the training schema:
//!
//! - every schema column is emitted, in schema order, cast to the schema's type;
//! - a schema column absent from the input is filled with zero (`false` for booleans);
//! - an input column absent from the schema is dropped.
//!
//! Reconciling an already reconciled frame against the same schema returns it unchanged.

use crate::exceptions::{ImmoError, ImmoResult};
use crate::impl_transformer;
use crate::schema::{FeatureColumn, TrainingSchema};
use crate::transformers::validate_columns;
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use datafusion_expr::{cast, ident, lit};
use std::collections::HashSet;
use tracing::debug;

/// Projects `df` onto `features`, followed by the `passthrough` columns unchanged.
///
/// Passthrough columns (such as the regression target) must be present in `df`.
pub fn reconcile(
    df: DataFrame,
    features: &[FeatureColumn],
    passthrough: &[&str],
) -> ImmoResult<DataFrame> {
    validate_columns(&df, passthrough)?;
    let present: HashSet<String> = df
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect();

    let mut exprs = Vec::with_capacity(features.len() + passthrough.len());
    let mut filled = 0usize;
    for feature in features {
        let data_type = feature.kind.data_type();
        let expr = if present.contains(&feature.name) {
            cast(ident(&feature.name), data_type)
        } else {
            filled += 1;
            lit(ScalarValue::new_zero(&data_type)?)
        };
        exprs.push(expr.alias(&feature.name));
    }
    exprs.extend(passthrough.iter().map(|name| ident(*name)));

    let known: HashSet<&str> = features
        .iter()
        .map(|f| f.name.as_str())
        .chain(passthrough.iter().copied())
        .collect();
    let dropped = present.iter().filter(|name| !known.contains(name.as_str())).count();
    debug!(filled, dropped, "reconciled frame against training schema");

    df.select(exprs).map_err(ImmoError::from)
}

/// Pipeline step aligning an encoded inference frame to a training schema.
pub struct SchemaReconciler {
    pub schema: TrainingSchema,
}

impl SchemaReconciler {
    pub fn new(schema: TrainingSchema) -> Self {
        Self { schema }
    }

    /// This transformer is stateless, so fit does nothing.
    pub async fn fit(&mut self, _df: &DataFrame) -> ImmoResult<()> {
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> ImmoResult<DataFrame> {
        reconcile(df, &self.schema.features, &[])
    }

    pub fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl_transformer!(SchemaReconciler);
