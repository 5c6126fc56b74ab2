//! Property-based tests for pipeline-vault
//!
//! - Codec round trips (tabular and object)
//! - Overwrite guard and idempotence over arbitrary payloads
//! - Latest-version resolution against a brute-force reference
//! - Run with ProptestConfig::with_cases(50)

use arrow::array::{Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use pipeline_vault::backend::MemoryObjectStore;
use pipeline_vault::{
    codec, ComponentStore, ErrorKind, LoadOptions, ModelArtifact, ModelBinary, ParamValue,
    Payload, PayloadKind, SaveOptions,
};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate a RecordBatch with nullable floats and arbitrary strings
fn arb_record_batch() -> impl Strategy<Value = RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("value", DataType::Float64, true),
        Field::new("name", DataType::Utf8, false),
    ]));

    (0usize..40).prop_flat_map(move |rows| {
        let schema = Arc::clone(&schema);
        (
            proptest::collection::vec(any::<i64>(), rows),
            proptest::collection::vec(proptest::option::of(-1e9f64..1e9), rows),
            proptest::collection::vec("[a-z0-9 ]{0,12}", rows),
        )
            .prop_map(move |(ids, values, names)| {
                RecordBatch::try_new(
                    Arc::clone(&schema),
                    vec![
                        Arc::new(Int64Array::from(ids)),
                        Arc::new(Float64Array::from(values)),
                        Arc::new(StringArray::from(names)),
                    ],
                )
                .unwrap()
            })
    })
}

fn arb_param() -> impl Strategy<Value = ParamValue> {
    prop_oneof![
        Just(ParamValue::Null),
        any::<bool>().prop_map(ParamValue::Bool),
        any::<i64>().prop_map(ParamValue::Int),
        (-1e6f64..1e6).prop_map(ParamValue::Float),
        "[a-z_]{0,10}".prop_map(ParamValue::Str),
    ]
}

/// Generate a ModelArtifact satisfying the provenance/metric invariant
fn arb_model() -> impl Strategy<Value = ModelArtifact> {
    (
        "[a-z_]{1,16}",
        proptest::collection::vec("[a-z_]{1,10}", 0..6),
        proptest::collection::btree_map("[a-z_]{1,8}", arb_param(), 0..6),
        proptest::collection::btree_map("[a-z_]{1,8}", "[a-z0-9/_.-]{1,30}", 1..4),
        proptest::collection::btree_map("[a-z_]{1,8}", -1e3f64..1e3, 1..4),
        proptest::collection::vec(any::<u8>(), 0..256),
    )
        .prop_map(|(name, features, params, paths, metrics, binary)| {
            let mut model = ModelArtifact::new(name)
                .with_feature_columns(features)
                .with_model_params(params)
                .with_model(ModelBinary::new("raw", binary));
            model.add_data_paths(paths);
            model.add_metrics(metrics);
            model
        })
}

/// Generate a timestamp version `YYYYMMDD-HHMMSS`
fn arb_timestamp_version() -> impl Strategy<Value = String> {
    (2000u32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, mo, d, h, mi, s)| format!("{y:04}{mo:02}{d:02}-{h:02}{mi:02}{s:02}"),
    )
}

fn memory_store() -> ComponentStore<MemoryObjectStore> {
    ComponentStore::builder(MemoryObjectStore::new()).build().unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: tabular round trip is value-exact and keeps column order
    #[test]
    fn prop_table_roundtrip(batch in arb_record_batch()) {
        let bytes = codec::encode(&Payload::Table(batch.clone()), PayloadKind::Tabular).unwrap();
        match codec::decode(&bytes, PayloadKind::Tabular).unwrap() {
            Payload::Table(decoded) => {
                prop_assert_eq!(decoded.num_rows(), batch.num_rows());
                let names: Vec<String> =
                    decoded.schema().fields().iter().map(|f| f.name().clone()).collect();
                prop_assert_eq!(names, vec!["id", "value", "name"]);
                prop_assert_eq!(decoded.columns(), batch.columns());
            }
            Payload::Object(_) => prop_assert!(false, "decoded an object from a table"),
        }
    }

    /// Property: model round trip reconstructs the artifact exactly
    #[test]
    fn prop_model_roundtrip(model in arb_model()) {
        let bytes = codec::encode(&Payload::from(model.clone()), PayloadKind::Object).unwrap();
        let decoded = codec::decode(&bytes, PayloadKind::Object).unwrap();
        prop_assert_eq!(decoded, Payload::from(model));
    }

    /// Property: saving over an existing key without overwrite always conflicts
    #[test]
    fn prop_overwrite_guard(
        first in arb_record_batch(),
        second in arb_model(),
        version in "[a-z0-9]{1,12}",
    ) {
        let store = memory_store();
        let opts = SaveOptions::new().version(version.clone());
        store.save_table(&first, "test", &opts).unwrap();

        let err = store.save_table(&first, "test", &opts).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Conflict);

        // A different kind under the same version is a different key
        store.save_model(&second, "test", &opts).unwrap();
        let err = store.save_model(&second, "test", &opts).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    /// Property: overwrite saves are idempotent on key and bytes
    #[test]
    fn prop_overwrite_idempotent(model in arb_model()) {
        let store = memory_store();
        let opts = SaveOptions::new().version("v").overwrite(true);
        let first = store.save_model(&model, "m", &opts).unwrap();
        let second = store.save_model(&model, "m", &opts).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(store.load_model("m", &LoadOptions::new().version("v")).unwrap(), model);
    }

    /// Property: latest resolution picks the maximum timestamp version
    #[test]
    fn prop_latest_is_max_timestamp(
        versions in proptest::collection::btree_set(arb_timestamp_version(), 1..8),
        junk in proptest::collection::vec("[a-z]{1,8}", 0..4),
    ) {
        let store = memory_store();
        let df = RecordBatch::new_empty(Arc::new(Schema::new(vec![
            Field::new("x", DataType::Int64, false),
        ])));
        for version in versions.iter().chain(junk.iter()) {
            store
                .save_table(&df, "test", &SaveOptions::new().version(version.clone()).overwrite(true))
                .unwrap();
        }

        let expected = versions.iter().max().unwrap();
        let key = store.resolve("test", &LoadOptions::new()).unwrap();
        prop_assert_eq!(key, format!("dev/test/{expected}.pq"));
    }
}
