//! # Categorical Encoding
//!
//! [`CategoryEncoder`] turns every categorical column named by the schema registry into numeric or
//! boolean form:
//!
//! - **One-hot:** the column is replaced by one boolean column per distinct value observed in the
//!   current DataFrame, named `<column>_<value>`. Rows with a missing value are `false` everywhere.
//! - **Ordinal:** the column is replaced in place by the integer code of its lookup table.
//! - **Flag:** a two-valued code is replaced in place by a boolean.
//!
//! `fit` learns the one-hot vocabulary and checks every ordinal and flag column against its table.
//! A value outside the table (a missing value included) fails with
//! [`ImmoError::UnmappedCategory`] naming the column and the value.

use crate::exceptions::{ImmoError, ImmoResult};
use crate::impl_transformer;
use crate::registry::{EncodingRule, ENCODING_RULES};
use crate::transformers::validate_columns;
use arrow::array::{Array, StringArray};
use arrow::datatypes::DataType;
use datafusion::logical_expr::{Case as DFCase, Expr, Literal};
use datafusion::prelude::*;
use datafusion_expr::{cast, ident, lit};
use std::collections::HashMap;
use tracing::debug;

/// Shown in errors for a missing value in an ordinal or flag column.
const MISSING_VALUE_LABEL: &str = "<missing>";

/// Helper to build a CASE WHEN expression given a mapping from category strings to values.
/// For each pair, the expression generated is:
/// `WHEN <value> = lit(<category>) THEN lit(<encoded_value>)`
/// If provided, `default` is used as the ELSE branch; otherwise unmatched rows become null.
fn build_case_expr<T: Clone + Literal>(
    value: Expr,
    mapping: &[(&str, T)],
    default: Option<Expr>,
) -> Expr {
    let when_then_expr = mapping
        .iter()
        .map(|(cat, encoded)| {
            (
                Box::new(value.clone().eq(lit(*cat))),
                Box::new(lit(encoded.clone())),
            )
        })
        .collect();
    Expr::Case(DFCase {
        expr: None,
        when_then_expr,
        else_expr: default.map(Box::new),
    })
}

/// Column values compared as text, whatever their storage type.
fn text_of(col_name: &str) -> Expr {
    cast(ident(col_name), DataType::Utf8)
}

/// Extract the sorted distinct values of a column as text. A missing value is reported as `None`
/// and sorts first.
async fn extract_distinct_values(
    df: &DataFrame,
    col_name: &str,
) -> ImmoResult<Vec<Option<String>>> {
    let distinct_df = df
        .clone()
        .select(vec![text_of(col_name).alias(col_name)])?
        .distinct()?;
    let batches = distinct_df.collect().await?;
    let mut values = Vec::new();
    for batch in batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                ImmoError::DataFusionError(datafusion::error::DataFusionError::Plan(format!(
                    "Expected Utf8 array for column {}",
                    col_name
                )))
            })?;
        for i in 0..array.len() {
            if array.is_null(i) {
                values.push(None);
            } else {
                values.push(Some(array.value(i).to_string()));
            }
        }
    }
    values.sort();
    values.dedup();
    Ok(values)
}

/// Returns the first value (in sorted order) that `is_known` rejects.
fn first_unmapped(values: &[Option<String>], is_known: impl Fn(&str) -> bool) -> Option<String> {
    values.iter().find_map(|value| match value {
        None => Some(MISSING_VALUE_LABEL.to_string()),
        Some(v) if !is_known(v) => Some(v.clone()),
        Some(_) => None,
    })
}

/// Encodes the registry's categorical columns into integer and boolean columns.
pub struct CategoryEncoder {
    pub rules: Vec<(&'static str, EncodingRule)>,
    /// Mapping from one-hot column name to its sorted distinct values.
    pub categories: HashMap<String, Vec<String>>,
}

impl CategoryEncoder {
    /// Create an encoder for the built-in registry rules.
    pub fn new() -> Self {
        Self::with_rules(ENCODING_RULES.to_vec())
    }

    /// Create an encoder for custom rules.
    pub fn with_rules(rules: Vec<(&'static str, EncodingRule)>) -> Self {
        Self {
            rules,
            categories: HashMap::new(),
        }
    }

    fn columns(&self) -> Vec<&'static str> {
        self.rules.iter().map(|(name, _)| *name).collect()
    }

    fn rule_for(&self, name: &str) -> Option<EncodingRule> {
        self.rules
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, rule)| *rule)
    }

    /// Learn the one-hot vocabulary and validate ordinal and flag columns against their tables.
    pub async fn fit(&mut self, df: &DataFrame) -> ImmoResult<()> {
        validate_columns(df, &self.columns())?;
        self.categories.clear();
        for (col_name, rule) in &self.rules {
            let values = extract_distinct_values(df, col_name).await?;
            let unmapped = match rule {
                EncodingRule::OneHot => {
                    let observed: Vec<String> = values.into_iter().flatten().collect();
                    debug!(column = col_name, categories = observed.len(), "one-hot vocabulary");
                    self.categories.insert(col_name.to_string(), observed);
                    None
                }
                EncodingRule::Ordinal(table) => {
                    first_unmapped(&values, |v| table.code(v).is_some())
                }
                EncodingRule::Flag { truthy, falsy } => {
                    first_unmapped(&values, |v| v == *truthy || v == *falsy)
                }
            };
            if let Some(value) = unmapped {
                return Err(ImmoError::UnmappedCategory {
                    column: col_name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// One indicator expression per learned category of `col_name`.
    fn indicator_exprs(&self, col_name: &str) -> ImmoResult<Vec<Expr>> {
        let categories = self
            .categories
            .get(col_name)
            .ok_or(ImmoError::FitNotCalled)?;
        Ok(categories
            .iter()
            .map(|cat| {
                build_case_expr(text_of(col_name), &[(cat.as_str(), true)], Some(lit(false)))
                    .alias(format!("{}_{}", col_name, cat))
            })
            .collect())
    }

    /// Transform the DataFrame: ordinal and flag columns are replaced in place, one-hot columns are
    /// replaced by indicator columns appended after the remaining columns.
    pub fn transform(&self, df: DataFrame) -> ImmoResult<DataFrame> {
        validate_columns(&df, &self.columns())?;
        let mut exprs = vec![];
        for field in df.schema().fields() {
            let name = field.name();
            match self.rule_for(name) {
                None => exprs.push(ident(name)),
                Some(EncodingRule::OneHot) => {}
                Some(EncodingRule::Ordinal(table)) => {
                    exprs.push(build_case_expr(text_of(name), table.entries, None).alias(name))
                }
                Some(EncodingRule::Flag { truthy, falsy }) => exprs.push(
                    build_case_expr(text_of(name), &[(truthy, true), (falsy, false)], None)
                        .alias(name),
                ),
            }
        }
        for (col_name, rule) in &self.rules {
            if *rule == EncodingRule::OneHot {
                exprs.extend(self.indicator_exprs(col_name)?);
            }
        }
        df.select(exprs).map_err(ImmoError::from)
    }

    pub fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl Default for CategoryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(CategoryEncoder);
