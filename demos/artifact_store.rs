//! Artifact Store: Versioned Outputs for a Toy ML Pipeline
//!
//! This example walks a taxi-trip pipeline through three stages, each saving
//! its output as a new version and reading the latest output of the stage
//! before it:
//!
//! - clean:  raw trips → `dev/clean/2020_01/{version}.pq`
//! - split:  clean     → `dev/split/{train,test}/{version}.pq`
//! - train:  split     → `dev/training/models/{version}.pkl`
//!
//! Toyota Way: Poka-Yoke (a model cannot be saved without provenance)
//!
//! Run with: `RUST_LOG=debug cargo run --example artifact_store [ROOT_DIR]`

use anyhow::{Context, Result};
use arrow::array::{BooleanArray, Float64Array, Int64Array};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use pipeline_vault::backend::LocalObjectStore;
use pipeline_vault::{
    ComponentStore, ErrorKind, LoadOptions, ModelArtifact, ModelBinary, SaveOptions,
};
use std::sync::Arc;

#[allow(clippy::cast_precision_loss)]
fn raw_trips(rows: i64) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("pickup_hour", DataType::Int64, false),
        Field::new("trip_distance", DataType::Float64, true),
        Field::new("fare", DataType::Float64, false),
    ]);
    let distance: Vec<Option<f64>> = (0..rows)
        .map(|i| if i % 17 == 0 { None } else { Some((i % 30) as f64 * 0.7) })
        .collect();
    let fare: Vec<f64> = (0..rows).map(|i| 2.5 + (i % 30) as f64 * 1.9).collect();

    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from_iter_values((0..rows).map(|i| i % 24))),
            Arc::new(Float64Array::from(distance)),
            Arc::new(Float64Array::from(fare)),
        ],
    )?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    println!("=== Pipeline-Vault Artifact Store Demo ===\n");

    let root = std::env::args()
        .nth(1)
        .map_or_else(|| std::env::temp_dir().join("pipeline-vault-demo"), Into::into);
    let store = ComponentStore::builder(LocalObjectStore::new(&root))
        .unique_versions(4)
        .build()?;
    println!("Storing artifacts under {}\n", root.display());

    // Stage 1: clean (drop rows without a distance)
    println!("=== Stage 1: clean ===");
    let raw = raw_trips(1_000)?;
    let distance = raw
        .column(1)
        .as_any()
        .downcast_ref::<Float64Array>()
        .context("trip_distance is not Float64")?;
    let mask: BooleanArray = distance.iter().map(|v| Some(v.is_some())).collect();
    let clean = filter_record_batch(&raw, &mask)?;
    let clean_key = store.save_table(&clean, "clean/2020_01", &SaveOptions::new())?;
    println!("  {} → {} rows at {clean_key}\n", raw.num_rows(), clean.num_rows());

    // Stage 2: split the latest clean output
    println!("=== Stage 2: split ===");
    let clean = store.load_table("clean/2020_01", &LoadOptions::new())?;
    let cut = clean.num_rows() * 4 / 5;
    let train_key = store.save_table(&clean.slice(0, cut), "split/train", &SaveOptions::new())?;
    let test_key = store.save_table(
        &clean.slice(cut, clean.num_rows() - cut),
        "split/test",
        &SaveOptions::new(),
    )?;
    println!("  train: {train_key}");
    println!("  test:  {test_key}\n");

    // Stage 3: train, recording provenance and metrics
    println!("=== Stage 3: train ===");
    let mut model = ModelArtifact::new("mean_fare_regressor")
        .with_feature_columns(["pickup_hour", "trip_distance"])
        .with_param("fit_intercept", true)
        .with_param("alpha", 0.1)
        .with_model(ModelBinary::new("raw", b"coefficients: [2.5, 2.71]".to_vec()));

    let unsaved = store.save_model(&model, "training/models", &SaveOptions::new());
    if let Err(e) = unsaved {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        println!("  Rejected before any write: {e}");
    }

    model.add_data_path("train_df", train_key);
    model.add_data_path("test_df", test_key);
    model.add_metric("rmse", 3.27);
    let model_key = store.save_model(&model, "training/models", &SaveOptions::new())?;
    println!("  Saved model at {model_key}\n");

    // Consumers always see the latest version
    println!("=== Load latest model ===");
    let latest = store.load_model("training/models", &LoadOptions::new())?;
    println!("  name:     {}", latest.name());
    println!("  features: {:?}", latest.feature_columns());
    println!("  metrics:  {:?}", latest.metrics());
    println!("  inputs:   {:?}", latest.data_paths());
    println!(
        "  versions: {:?}",
        store.list_versions("training/models", None)?
    );

    // Overwrite guard
    println!("\n=== Overwrite guard ===");
    let version = pipeline_vault::resolver::version_of(&model_key).to_string();
    match store.save_model(&model, "training/models", &SaveOptions::new().version(&version)) {
        Err(e) if e.kind() == ErrorKind::Conflict => println!("  {e}"),
        other => anyhow::bail!("expected a conflict, got {other:?}"),
    }

    println!("\n✅ Demo complete");
    Ok(())
}
