//! ## Missing-value imputation
//!
//! [`MissingValueImputer`] applies the imputation groups of the schema registry to a DataFrame:
//!
//! - **Sentinel**: categorical columns are filled with a literal string (`"None"`, or `"Kein"` for
//!   the masonry type).
//! - **Mean**: numeric columns are filled with the column mean.
//! - **Mode**: columns are filled with their most frequent value (ties go to the smallest value).
//! - **Zero**: numeric columns are filled with `0`.
//! - **Drop**: the column is removed.
//!
//! Means and modes are learned in `fit` from the same DataFrame that is then transformed; the
//! pipeline refits the imputer for every frame, so inference data never reuses statistics of the
//! training data. Every configured column must be present, otherwise a
//! [`ImmoError::SchemaMismatch`] is returned.

use crate::exceptions::{ImmoError, ImmoResult};
use crate::impl_transformer;
use crate::registry::{ImputationGroup, ImputationRule, IMPUTATION_GROUPS, NONE_SENTINEL};
use crate::transformers::{is_string_type, validate_columns};
use arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{avg, count};
use datafusion::logical_expr::{Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use datafusion_expr::{cast, ident, lit, try_cast};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Constructs an expression equivalent to SQL COALESCE(value, fallback).
/// This is implemented as a CASE expression: if `value` is not null then return it, otherwise
/// return `fallback`.
fn coalesce_expr(value: Expr, fallback: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(value.clone().is_not_null()), Box::new(value))],
        else_expr: Some(Box::new(fallback)),
    })
}

/// Numeric view of a column: numeric columns are used as they are, anything else is parsed as
/// Float64 with unparsable values becoming null.
fn numeric_expr(name: &str, data_type: &DataType) -> (Expr, DataType) {
    if data_type.is_numeric() {
        (ident(name), data_type.clone())
    } else {
        (try_cast(ident(name), DataType::Float64), DataType::Float64)
    }
}

/// Returns the first row of the first non-empty batch of a single-column result.
async fn first_scalar(df: DataFrame) -> ImmoResult<Option<ScalarValue>> {
    let batches = df.collect().await?;
    for batch in batches {
        if batch.num_rows() > 0 {
            return Ok(Some(ScalarValue::try_from_array(batch.column(0), 0)?));
        }
    }
    Ok(None)
}

async fn column_mean(df: &DataFrame, name: &str, data_type: &DataType) -> ImmoResult<Option<f64>> {
    let (value, _) = numeric_expr(name, data_type);
    let agg_df = df.clone().aggregate(
        vec![],
        vec![avg(cast(value, DataType::Float64)).alias("avg")],
    )?;
    match first_scalar(agg_df).await? {
        Some(ScalarValue::Float64(mean)) => Ok(mean),
        Some(other) => Err(ImmoError::DataFusionError(
            datafusion::error::DataFusionError::Plan(format!(
                "Failed to compute average for column {}: got {:?}",
                name, other
            )),
        )),
        None => Ok(None),
    }
}

async fn column_mode(df: &DataFrame, name: &str) -> ImmoResult<Option<ScalarValue>> {
    let grouped = df
        .clone()
        .filter(ident(name).is_not_null())?
        .aggregate(vec![ident(name)], vec![count(ident(name)).alias("cnt")])?
        .sort(vec![ident("cnt").sort(false, false), ident(name).sort(true, false)])?
        .limit(0, Some(1))?;
    first_scalar(grouped).await
}

/// Fills missing values according to the registry's imputation groups.
pub struct MissingValueImputer {
    pub groups: Vec<ImputationGroup>,
    /// Learned fill values for the Mean and Mode groups.
    pub impute_values: HashMap<String, ScalarValue>,
}

impl MissingValueImputer {
    /// Create an imputer for the built-in registry groups.
    pub fn new() -> Self {
        Self::with_groups(IMPUTATION_GROUPS.to_vec())
    }

    /// Create an imputer for custom groups.
    pub fn with_groups(groups: Vec<ImputationGroup>) -> Self {
        Self {
            groups,
            impute_values: HashMap::new(),
        }
    }

    /// All columns named by the groups.
    pub fn columns(&self) -> Vec<&'static str> {
        self.groups
            .iter()
            .flat_map(|group| group.columns.iter().copied())
            .collect()
    }

    fn rule_for(&self, name: &str) -> Option<ImputationRule> {
        self.groups
            .iter()
            .find(|group| group.columns.contains(&name))
            .map(|group| group.rule)
    }

    /// Computes the mean and mode fill values from `df`.
    pub async fn fit(&mut self, df: &DataFrame) -> ImmoResult<()> {
        validate_columns(df, &self.columns())?;
        self.impute_values.clear();
        let schema = df.schema().clone();
        for group in &self.groups {
            for &name in group.columns {
                let field = schema.field_with_unqualified_name(name)?;
                let data_type = field.data_type();
                let value = match group.rule {
                    ImputationRule::Mean => {
                        let mean = column_mean(df, name, data_type).await?.unwrap_or_else(|| {
                            warn!(column = name, "no observed values, mean falls back to 0");
                            0.0
                        });
                        ScalarValue::Float64(Some(mean))
                    }
                    ImputationRule::Mode => match column_mode(df, name).await? {
                        Some(mode) => mode,
                        None => {
                            warn!(column = name, "no observed values, mode falls back to a default");
                            if is_string_type(data_type) || *data_type == DataType::Null {
                                ScalarValue::Utf8(Some(NONE_SENTINEL.to_string()))
                            } else {
                                ScalarValue::new_zero(data_type)?
                            }
                        }
                    },
                    _ => continue,
                };
                debug!(column = name, value = %value, "learned imputation value");
                self.impute_values.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    fn fill_expr(&self, name: &str, data_type: &DataType, rule: ImputationRule) -> ImmoResult<Expr> {
        let expr = match rule {
            ImputationRule::Sentinel(sentinel) => {
                coalesce_expr(cast(ident(name), DataType::Utf8), lit(sentinel))
            }
            ImputationRule::Mean => {
                let mean = self.impute_values.get(name).ok_or(ImmoError::FitNotCalled)?;
                let (value, _) = numeric_expr(name, data_type);
                coalesce_expr(cast(value, DataType::Float64), lit(mean.clone()))
            }
            ImputationRule::Mode => {
                let mode = self.impute_values.get(name).ok_or(ImmoError::FitNotCalled)?;
                // An all-empty CSV column has no type of its own.
                let value = if *data_type == DataType::Null {
                    cast(ident(name), DataType::Utf8)
                } else {
                    ident(name)
                };
                coalesce_expr(value, lit(mode.clone()))
            }
            ImputationRule::Zero => {
                let (value, value_type) = numeric_expr(name, data_type);
                coalesce_expr(value, lit(ScalarValue::new_zero(&value_type)?))
            }
            ImputationRule::Drop => {
                return Err(ImmoError::InvalidParameter(format!(
                    "Column '{}' is dropped and cannot be filled",
                    name
                )))
            }
        };
        Ok(expr.alias(name))
    }

    /// Returns a new DataFrame with governed columns filled and dropped columns removed.
    pub fn transform(&self, df: DataFrame) -> ImmoResult<DataFrame> {
        validate_columns(&df, &self.columns())?;
        let mut exprs = Vec::with_capacity(df.schema().fields().len());
        for field in df.schema().fields() {
            let name = field.name();
            match self.rule_for(name) {
                None => exprs.push(ident(name)),
                Some(ImputationRule::Drop) => {}
                Some(rule) => exprs.push(self.fill_expr(name, field.data_type(), rule)?),
            }
        }
        df.select(exprs).map_err(ImmoError::from)
    }

    pub fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl Default for MissingValueImputer {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(MissingValueImputer);
