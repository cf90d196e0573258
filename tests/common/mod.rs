#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::{cast, concat};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::DataFrame;
use immo_pipeline::io::session_context;
use immo_pipeline::registry::{
    encoding_rule_for, governed_columns, imputation_rule_for, EncodingRule, ImputationRule,
};

pub const TARGET: &str = "Verkaufspreis";
pub const LIVING_AREA: &str = "Wohnflaeche";

const ONE_HOT_VALUES: [&str; 3] = ["A", "B", "C"];

fn living_area(i: usize) -> f64 {
    50.0 + 3.0 * i as f64
}

/// Default values of a governed column: categories cycle through their vocabulary, numeric
/// columns get small positive numbers.
fn default_column(name: &str, rows: usize) -> ArrayRef {
    if let Some(rule) = encoding_rule_for(name) {
        let values: Vec<&str> = (0..rows)
            .map(|i| match rule {
                EncodingRule::OneHot => ONE_HOT_VALUES[i % ONE_HOT_VALUES.len()],
                EncodingRule::Ordinal(table) => table.entries[i % table.entries.len()].0,
                EncodingRule::Flag { truthy, falsy } => {
                    if i % 2 == 0 {
                        truthy
                    } else {
                        falsy
                    }
                }
            })
            .collect();
        return Arc::new(StringArray::from(values));
    }
    match (imputation_rule_for(name), name) {
        (Some(ImputationRule::Drop), "Id") => {
            Arc::new(Int64Array::from((1..=rows as i64).collect::<Vec<_>>()))
        }
        (Some(ImputationRule::Drop), _) => Arc::new(Float64Array::from(
            (0..rows).map(|i| 1950.0 + i as f64).collect::<Vec<_>>(),
        )),
        _ => Arc::new(Float64Array::from(
            (0..rows).map(|i| (i % 7) as f64 * 10.0 + 1.0).collect::<Vec<_>>(),
        )),
    }
}

/// Builder for raw listing frames that satisfy the rule tables, with per-column overrides.
#[derive(Clone)]
pub struct RawFrame {
    rows: usize,
    columns: Vec<(String, ArrayRef)>,
}

impl RawFrame {
    /// Every governed column plus the living area and the sale price, which is linear in the
    /// living area.
    pub fn new(rows: usize) -> Self {
        let mut columns: Vec<(String, ArrayRef)> = governed_columns()
            .into_iter()
            .map(|name| (name.to_string(), default_column(name, rows)))
            .collect();
        columns.push((
            LIVING_AREA.to_string(),
            Arc::new(Float64Array::from(
                (0..rows).map(living_area).collect::<Vec<_>>(),
            )),
        ));
        columns.push((
            TARGET.to_string(),
            Arc::new(Float64Array::from(
                (0..rows)
                    .map(|i| 20_000.0 + 1_500.0 * living_area(i))
                    .collect::<Vec<_>>(),
            )),
        ));
        Self { rows, columns }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn set(mut self, name: &str, array: ArrayRef) -> Self {
        assert_eq!(array.len(), self.rows, "override of {} has the wrong length", name);
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = array,
            None => self.columns.push((name.to_string(), array)),
        }
        self
    }

    /// Replaces (or appends) a text column.
    pub fn with_utf8(self, name: &str, values: Vec<Option<&str>>) -> Self {
        self.set(name, Arc::new(StringArray::from(values)))
    }

    /// Replaces (or appends) a Float64 column.
    pub fn with_f64(self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.set(name, Arc::new(Float64Array::from(values)))
    }

    pub fn without(mut self, name: &str) -> Self {
        self.columns.retain(|(n, _)| n != name);
        self
    }

    pub fn batch(&self) -> RecordBatch {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|(name, array)| Field::new(name, array.data_type().clone(), true))
            .collect();
        let arrays = self.columns.iter().map(|(_, array)| array.clone()).collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    pub fn frame(&self) -> DataFrame {
        session_context().read_batch(self.batch()).unwrap()
    }

    /// Writes the frame as CSV with a header; nulls become empty fields.
    pub fn write_csv(&self, path: &Path) {
        let file = File::create(path).unwrap();
        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(file);
        writer.write(&self.batch()).unwrap();
    }
}

/// Executes `df` and returns one column, concatenated across batches.
pub async fn column(df: DataFrame, name: &str) -> ArrayRef {
    let batches = df.collect().await.unwrap();
    let parts: Vec<ArrayRef> = batches
        .iter()
        .map(|b| b.column_by_name(name).unwrap().clone())
        .collect();
    let refs: Vec<&dyn Array> = parts.iter().map(|a| a.as_ref()).collect();
    concat(&refs).unwrap()
}

pub async fn column_strings(df: DataFrame, name: &str) -> Vec<Option<String>> {
    let array = cast(&column(df, name).await, &DataType::Utf8).unwrap();
    let array = array.as_any().downcast_ref::<StringArray>().unwrap();
    (0..array.len())
        .map(|i| (!array.is_null(i)).then(|| array.value(i).to_string()))
        .collect()
}

pub async fn column_f64(df: DataFrame, name: &str) -> Vec<Option<f64>> {
    let array = cast(&column(df, name).await, &DataType::Float64).unwrap();
    let array = array.as_any().downcast_ref::<Float64Array>().unwrap();
    (0..array.len())
        .map(|i| (!array.is_null(i)).then(|| array.value(i)))
        .collect()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}
