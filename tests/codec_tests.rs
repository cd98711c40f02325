//! Tuple and indexed-tuple codec behavior across crates.

use std::sync::Arc;

use tuplestream_codec::{
    tags, Error, IndexedTupleCodec, NumericCodec, StructCodec, TupleCodec, TypeCodecRegistry,
};
use tuplestream_core::config::EngineConfig;
use tuplestream_core::schema::{DataType, TypeFamily};
use tuplestream_core::tuple;
use tuplestream_core::types::{ExtValue, IndexTuple, Tuple, Value};

fn point(x: f64, y: Option<f64>) -> Value {
    Value::Ext(ExtValue::new("point", vec![x.into(), y.into()]))
}

fn registry_with_point() -> Arc<TypeCodecRegistry> {
    let mut reg = TypeCodecRegistry::with_builtins();
    let codec = StructCodec::new("point", &[DataType::Float64, DataType::Float64])
        .expect("point codec");
    reg.register(DataType::Ext("point".into()), tags::FIRST_USER, Arc::new(codec))
        .expect("register point");
    reg.into_shared()
}

#[test]
fn test_mixed_tuple_round_trip() {
    let codec = TupleCodec::new(registry_with_point());
    let original = tuple![
        true,
        -7i32,
        1i64 << 40,
        2.5f32,
        -0.125f64,
        "héllo",
        vec![0u8, 255, 3],
        Value::Null,
        point(1.0, None)
    ];
    let bytes = codec.encode_to_vec(&original).expect("encode");
    let decoded = codec.decode_slice(&bytes).expect("decode");
    assert_eq!(decoded, original);
}

#[test]
fn test_nulls_and_empty_tuples() {
    let codec = TupleCodec::new(TypeCodecRegistry::with_builtins().into_shared());
    for original in [Tuple::default(), Tuple::nulls(1), Tuple::nulls(5)] {
        let bytes = codec.encode_to_vec(&original).expect("encode");
        assert_eq!(codec.decode_slice(&bytes).expect("decode"), original);
    }
}

#[test]
fn test_reader_without_registration_fails_on_unknown_tag() {
    let writer = TupleCodec::new(registry_with_point());
    let reader = TupleCodec::new(TypeCodecRegistry::with_builtins().into_shared());

    let bytes = writer
        .encode_to_vec(&tuple!["a", point(0.0, Some(1.0))])
        .expect("encode");
    match reader.decode_slice(&bytes) {
        Err(Error::UnknownTag { tag }) => assert_eq!(tag, tags::FIRST_USER),
        other => panic!("expected unknown tag, got {other:?}"),
    }
}

#[test]
fn test_unregistered_type_fails_on_write() {
    let codec = TupleCodec::new(TypeCodecRegistry::with_builtins().into_shared());
    let err = codec
        .encode_to_vec(&tuple![point(0.0, None)])
        .expect_err("point is not registered");
    assert!(matches!(err, Error::UnregisteredType { type_name } if type_name == "point"));
}

#[test]
fn test_family_codec_round_trips_exact_numeric_types() {
    let mut reg = TypeCodecRegistry::new();
    reg.register(TypeFamily::Numeric, 40, Arc::new(NumericCodec))
        .expect("register numeric family");
    let codec = TupleCodec::new(reg.into_shared());

    let original = tuple![1i32, 2i64, 3.5f32, 4.25f64];
    let bytes = codec.encode_to_vec(&original).expect("encode");
    assert_eq!(codec.decode_slice(&bytes).expect("decode"), original);
}

#[test]
fn test_indexed_codec_reuse_contract() {
    let codec = IndexedTupleCodec::new(TupleCodec::new(registry_with_point()));
    let first = IndexTuple::new(0u32, tuple!["x", 1i32]);
    let second = IndexTuple::new(1u32, tuple!["x", point(2.0, Some(3.0))]);

    let a = codec.encode_to_vec(&first).expect("encode");
    let b = codec.encode_to_vec(&second).expect("encode");

    let fresh = codec.deserialize(&mut a.as_slice(), None).expect("decode");
    assert_eq!(fresh, first);

    let reused = codec
        .deserialize(&mut b.as_slice(), Some(fresh))
        .expect("decode into");
    assert_eq!(reused, second);
}

#[test]
fn test_config_limits_reject_oversized_payloads() {
    let config = EngineConfig {
        max_payload_len: 4,
        ..EngineConfig::default()
    };
    let registry = TypeCodecRegistry::with_builtins().into_shared();
    let strict = TupleCodec::with_limits(registry.clone(), config.codec_limits());
    let loose = TupleCodec::new(registry);

    let bytes = loose.encode_to_vec(&tuple!["far too long"]).expect("encode");
    assert!(matches!(
        strict.decode_slice(&bytes),
        Err(Error::LimitExceeded { .. })
    ));
    let fits = loose.encode_to_vec(&tuple!["ok"]).expect("encode");
    assert_eq!(strict.decode_slice(&fits).expect("decode"), tuple!["ok"]);
}

#[test]
fn test_engine_config_json_round_trip_drives_limits() {
    let config = EngineConfig {
        max_payload_len: 8,
        num_partitions: 4,
        ..EngineConfig::default()
    };
    let json = serde_json::to_string(&config).expect("serialize config");
    let parsed = EngineConfig::from_json_str(&json).expect("parse config");
    assert_eq!(parsed, config);

    // Missing keys fall back to defaults.
    let partial = EngineConfig::from_json_str(r#"{"max_arity": 2}"#).expect("parse partial");
    assert_eq!(partial.max_arity, 2);
    assert_eq!(partial.num_partitions, EngineConfig::default().num_partitions);

    let registry = TypeCodecRegistry::with_builtins().into_shared();
    let strict = TupleCodec::with_limits(registry.clone(), partial.codec_limits());
    let bytes = TupleCodec::new(registry)
        .encode_to_vec(&tuple![1i32, 2i32, 3i32])
        .expect("encode");
    assert!(matches!(
        strict.decode_slice(&bytes),
        Err(Error::LimitExceeded { .. })
    ));
}
