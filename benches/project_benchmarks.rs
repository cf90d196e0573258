use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use immo_pipeline::io::session_context;
use immo_pipeline::model::ModelArtifact;
use immo_pipeline::registry::{
    encoding_rule_for, governed_columns, imputation_rule_for, EncodingRule, ImputationRule,
};
use immo_pipeline::workflow::FeaturePipeline;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use tokio::runtime::Runtime;

const ONE_HOT_VALUES: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Random raw listings covering every governed column, with about one missing value in ten for
/// the imputed columns.
fn create_raw_batch(n_rows: usize) -> RecordBatch {
    let mut rng = StdRng::seed_from_u64(7);
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();

    for name in governed_columns() {
        let imputed = matches!(
            imputation_rule_for(name),
            Some(rule) if rule != ImputationRule::Drop
        );
        let array: ArrayRef = match (encoding_rule_for(name), imputation_rule_for(name)) {
            (Some(rule), _) => {
                let values: Vec<Option<&str>> = (0..n_rows)
                    .map(|_| {
                        if imputed && rng.gen_bool(0.1) {
                            return None;
                        }
                        Some(match rule {
                            EncodingRule::OneHot => *ONE_HOT_VALUES.choose(&mut rng).unwrap(),
                            EncodingRule::Ordinal(table) => table.entries.choose(&mut rng).unwrap().0,
                            EncodingRule::Flag { truthy, falsy } => {
                                if rng.gen_bool(0.5) {
                                    truthy
                                } else {
                                    falsy
                                }
                            }
                        })
                    })
                    .collect();
                Arc::new(StringArray::from(values))
            }
            (None, Some(ImputationRule::Drop)) => {
                Arc::new(Int64Array::from((0..n_rows as i64).collect::<Vec<_>>()))
            }
            _ => Arc::new(Float64Array::from(
                (0..n_rows)
                    .map(|_| (!rng.gen_bool(0.1)).then(|| rng.gen_range(0.0..500.0)))
                    .collect::<Vec<_>>(),
            )),
        };
        fields.push(Field::new(name, array.data_type().clone(), true));
        arrays.push(array);
    }

    let prices: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(50_000.0..500_000.0)).collect();
    fields.push(Field::new("Verkaufspreis", arrow::datatypes::DataType::Float64, false));
    arrays.push(Arc::new(Float64Array::from(prices)));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

fn bench_prepare_training(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("prepare_training");
    group.sample_size(10);

    for n_rows in [1_000, 10_000].iter() {
        let batch = create_raw_batch(*n_rows);
        group.bench_with_input(BenchmarkId::new("collect", n_rows), &batch, |b, batch| {
            b.iter(|| {
                rt.block_on(async {
                    let df = session_context().read_batch(batch.clone()).unwrap();
                    let prepared = FeaturePipeline::new()
                        .prepare_training(df, "Verkaufspreis")
                        .await
                        .unwrap();
                    black_box(prepared.frame.collect().await.unwrap())
                })
            })
        });
    }

    group.finish();
}

fn bench_ridge_fit(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let mut group = c.benchmark_group("ridge_fit");

    for n_features in [50, 200].iter() {
        let x = Array2::from_shape_fn((2_000, *n_features), |_| rng.gen_range(-1.0..1.0));
        let y = Array1::from_shape_fn(2_000, |_| rng.gen_range(-1.0..1.0));
        group.bench_with_input(
            BenchmarkId::new("features", n_features),
            &(x, y),
            |b, (x, y)| b.iter(|| ModelArtifact::fit(black_box(x), black_box(y), 1.0).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_prepare_training, bench_ridge_fit);
criterion_main!(benches);
