//! Canonical column order for training frames.

use crate::exceptions::{ImmoError, ImmoResult};
use crate::impl_transformer;
use datafusion::prelude::*;
use datafusion_expr::ident;

/// Reorders the columns of a DataFrame alphabetically by name (byte order).
pub struct ColumnSorter;

impl ColumnSorter {
    pub fn new() -> Self {
        Self
    }

    /// This transformer is stateless, so fit does nothing.
    pub async fn fit(&mut self, _df: &DataFrame) -> ImmoResult<()> {
        Ok(())
    }

    pub fn transform(&self, df: DataFrame) -> ImmoResult<DataFrame> {
        let mut names: Vec<String> = df
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        names.sort();
        let exprs: Vec<Expr> = names.iter().map(|name| ident(name)).collect();
        df.select(exprs).map_err(ImmoError::from)
    }

    pub fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl Default for ColumnSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(ColumnSorter);
