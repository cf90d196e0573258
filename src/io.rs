//! ## Data I/O
//!
//! Loading of raw datasets (CSV or Parquet, detected from the file extension), normalisation of
//! missing-value markers, CSV output of preprocessed frames and JSON artifacts.
//!
//! Every file written here goes through a temporary sibling that is renamed into place once the
//! content is complete, so a failed write never leaves a truncated output behind.

use crate::exceptions::{ImmoError, ImmoResult};
use crate::transformers::is_string_type;
use arrow::array::{Array, Int64Array};
use arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::count;
use datafusion::logical_expr::{Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use datafusion_expr::{cast, ident, lit, try_cast};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Literal values read as missing, in addition to empty fields.
pub const MISSING_MARKERS: &[&str] = &["NA", ""];

const SCHEMA_INFER_MAX_RECORDS: usize = 100_000;

/// Creates a single-partition session context.
///
/// One partition keeps the row order of every result identical to the input file order, which the
/// per-row predictions depend on.
pub fn session_context() -> SessionContext {
    let config = SessionConfig::new()
        .with_target_partitions(1)
        .with_repartition_file_scans(false);
    SessionContext::new_with_config(config)
}

/// Returns true if the path has a supported dataset extension.
pub fn is_dataset_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("csv") | Some("parquet")
    )
}

/// Loads a dataset and detects the format (CSV or Parquet) from its extension. Missing-value
/// markers are normalised with [`normalize_missing`].
pub async fn load_dataset(ctx: &SessionContext, path: &Path) -> ImmoResult<DataFrame> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ImmoError::InvalidParameter(format!("Non UTF-8 path: {}", path.display())))?;

    let df = match path.extension().and_then(|ext| ext.to_str()) {
        Some("parquet") => ctx.read_parquet(path_str, ParquetReadOptions::default()).await?,
        Some("csv") => {
            let options =
                CsvReadOptions::new().schema_infer_max_records(SCHEMA_INFER_MAX_RECORDS);
            ctx.read_csv(path_str, options).await?
        }
        _ => {
            return Err(ImmoError::InvalidParameter(format!(
                "Unsupported file format: {}. Please provide a CSV or Parquet file.",
                path.display()
            )))
        }
    };
    info!(path = %path.display(), columns = df.schema().fields().len(), "loaded dataset");
    normalize_missing(df).await
}

/// Turns missing-value markers in text columns into nulls, then reads text columns whose
/// remaining values all parse as numbers as Float64.
pub async fn normalize_missing(df: DataFrame) -> ImmoResult<DataFrame> {
    let text_columns: Vec<String> = df
        .schema()
        .fields()
        .iter()
        .filter(|field| is_string_type(field.data_type()))
        .map(|field| field.name().clone())
        .collect();
    if text_columns.is_empty() {
        return Ok(df);
    }

    let markers: Vec<Expr> = MISSING_MARKERS.iter().map(|m| lit(*m)).collect();
    let exprs: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let name = field.name();
            if text_columns.contains(name) {
                Expr::Case(DFCase {
                    expr: None,
                    when_then_expr: vec![(
                        Box::new(cast(ident(name), DataType::Utf8).in_list(markers.clone(), false)),
                        Box::new(lit(ScalarValue::Utf8(None))),
                    )],
                    else_expr: Some(Box::new(cast(ident(name), DataType::Utf8))),
                })
                .alias(name)
            } else {
                ident(name)
            }
        })
        .collect();
    let df = df.select(exprs)?;

    // Per text column: non-null count and count of values that parse as Float64.
    let counts: Vec<Expr> = text_columns
        .iter()
        .enumerate()
        .flat_map(|(i, name)| {
            [
                count(ident(name)).alias(format!("present_{}", i)),
                count(try_cast(ident(name), DataType::Float64)).alias(format!("numeric_{}", i)),
            ]
        })
        .collect();
    let batches = df.clone().aggregate(vec![], counts)?.collect().await?;
    let batch = match batches.iter().find(|b| b.num_rows() > 0) {
        Some(batch) => batch,
        None => return Ok(df),
    };
    let count_at = |index: usize| -> ImmoResult<i64> {
        let array = batch
            .column(index)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| {
                ImmoError::DataFusionError(datafusion::error::DataFusionError::Plan(
                    "Expected Int64 array".into(),
                ))
            })?;
        Ok(if array.is_null(0) { 0 } else { array.value(0) })
    };
    let mut numeric = Vec::new();
    for (i, name) in text_columns.iter().enumerate() {
        let present = count_at(2 * i)?;
        if present > 0 && present == count_at(2 * i + 1)? {
            numeric.push(name.clone());
        }
    }
    if numeric.is_empty() {
        return Ok(df);
    }
    debug!(columns = ?numeric, "reading numeric text columns as Float64");

    let exprs: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let name = field.name();
            if numeric.contains(name) {
                try_cast(ident(name), DataType::Float64).alias(name)
            } else {
                ident(name)
            }
        })
        .collect();
    df.select(exprs).map_err(ImmoError::from)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> ImmoResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes `path` through a temporary file that is renamed into place after `write` succeeds.
fn write_atomic<F>(path: &Path, write: F) -> ImmoResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> ImmoResult<()>,
{
    ensure_parent(path)?;
    let tmp = temp_path(path);
    let result = File::create(&tmp)
        .map_err(ImmoError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            Ok(())
        })
        .and_then(|_| fs::rename(&tmp, path).map_err(ImmoError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Executes `df` and writes it as CSV with a header row. Returns the number of rows written.
pub async fn write_csv(df: DataFrame, path: &Path) -> ImmoResult<usize> {
    let batches = df.collect().await?;
    let rows = batches.iter().map(|b| b.num_rows()).sum();
    write_atomic(path, |out| {
        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(out);
        for batch in &batches {
            writer.write(batch)?;
        }
        Ok(())
    })?;
    info!(path = %path.display(), rows, "saved csv");
    Ok(rows)
}

/// Serializes `value` as pretty-printed JSON.
pub fn write_json_atomic<T: Serialize + ?Sized>(value: &T, path: &Path) -> ImmoResult<()> {
    write_atomic(path, |out| {
        serde_json::to_writer_pretty(out, value)?;
        Ok(())
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> ImmoResult<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
