//! ## Transformer Pipeline
//!
//! This module provides the core abstractions for chaining the preprocessing stages.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait defines the interface of one stage: an asynchronous `fit` that may
//!   query the data to learn parameters, and a `transform` that rewrites the DataFrame's logical
//!   plan without triggering execution.
//! - The [`Pipeline`] struct chains named transformers. Each step is fitted on the output of the
//!   previous step, so statistics always come from the frame being processed.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] remove the boilerplate of
//!   implementing the trait and boxing the steps.

use crate::exceptions::{ImmoError, ImmoResult};
use async_trait::async_trait;
use datafusion::prelude::*;
use std::time::Instant;
use tracing::{debug, error};

/// Trait for components used in the preprocessing pipeline.
#[async_trait]
pub trait Transformer {
    /// Fit the transformer on a DataFrame.
    ///
    /// # Arguments
    ///
    /// * `df` - The input DataFrame.
    async fn fit(&mut self, df: &DataFrame) -> ImmoResult<()>;

    /// Transform the input DataFrame, returning a new DataFrame with the transformation applied.
    ///
    /// # Arguments
    ///
    /// * `df` - The input DataFrame.
    fn transform(&self, df: DataFrame) -> ImmoResult<DataFrame>;

    /// Returns true if the transformer must be fitted before `transform` can be called.
    fn is_stateful(&self) -> bool;
}

/// Macro to implement the [`Transformer`] trait for a type with matching inherent methods.
///
/// The type must already have inherent methods:
/// - `async fn fit(&mut self, &DataFrame) -> ImmoResult<()>`
/// - `fn transform(&self, DataFrame) -> ImmoResult<DataFrame>`
/// - `fn inherent_is_stateful(&self) -> bool`
///
/// # Example
///
/// ```rust,no_run
/// use immo_pipeline::exceptions::ImmoResult;
/// use datafusion::prelude::DataFrame;
/// use immo_pipeline::impl_transformer;
///
/// pub struct Passthrough;
///
/// impl Passthrough {
///     pub async fn fit(&mut self, _df: &DataFrame) -> ImmoResult<()> {
///         Ok(())
///     }
///
///     pub fn transform(&self, df: DataFrame) -> ImmoResult<DataFrame> {
///         Ok(df)
///     }
///
///     pub fn inherent_is_stateful(&self) -> bool {
///         false
///     }
/// }
///
/// impl_transformer!(Passthrough);
/// ```
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::ImmoResult<()> {
                <$ty>::fit(self, df).await
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::ImmoResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
        }
    };
}

/// A named, boxed pipeline step.
pub type Step = (String, Box<dyn Transformer + Send + Sync>);

/// A pipeline that chains a sequence of transformers.
///
/// Each transformer's output (a new logical plan) is the input of the next one, so the plan is
/// built lazily until a terminal action such as `collect` runs it.
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// Creates a new pipeline from (name, transformer) pairs.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Names of the steps, in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn ensure_not_empty(&self) -> ImmoResult<()> {
        if self.steps.is_empty() {
            return Err(ImmoError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        Ok(())
    }

    /// Fits each transformer on the output of the previous one and returns the final DataFrame.
    pub async fn fit_transform(&mut self, df: &DataFrame) -> ImmoResult<DataFrame> {
        self.ensure_not_empty()?;
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            debug!(step = %name, "fitting step");
            let start = Instant::now();
            step.fit(&current_df).await.inspect_err(|e| {
                error!(step = %name, error = %e, "fitting failed");
            })?;
            current_df = step.transform(current_df).inspect_err(|e| {
                error!(step = %name, error = %e, "transform failed");
            })?;
            debug!(step = %name, elapsed = ?start.elapsed(), "step completed");
        }
        Ok(current_df)
    }

    /// Applies each transformer without fitting. Stateful steps must have been fitted before.
    pub fn transform(&self, df: DataFrame) -> ImmoResult<DataFrame> {
        self.ensure_not_empty()?;
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            debug!(step = %name, "applying transformer");
            current_df = step.transform(current_df).inspect_err(|e| {
                error!(step = %name, error = %e, "transform failed");
            })?;
        }
        Ok(current_df)
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use immo_pipeline::make_pipeline;
/// use immo_pipeline::transformers::column_order::ColumnSorter;
///
/// let pipeline = make_pipeline!(("sort", ColumnSorter::new()));
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<$crate::pipeline::Step> = vec![
                $(
                    (
                        $name.to_string(),
                        Box::new($transformer) as Box<dyn $crate::pipeline::Transformer + Send + Sync>,
                    ),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps)
        }
    };
}
