//! Byte-exactness against the reference Avro implementation: for the
//! same schema and value, our serializer must produce exactly the
//! bytes `apache-avro` produces, and deserialize the reference's
//! output. Maps stick to a single entry because the reference encoder
//! iterates a `HashMap` in nondeterministic order.

use std::collections::HashMap;

use apache_avro::{to_avro_datum, types::Value as AvroValue, Schema};
use avroc::{CodecRegistry, Datum};
use serde_json::json;

fn codec_and_reference(identifier: &str, raw: serde_json::Value) -> (avroc::Codec, Schema) {
    let schema = Schema::parse_str(&raw.to_string()).unwrap();
    let mut registry = CodecRegistry::new();
    registry.register(identifier, &raw).unwrap();
    let codec = registry.compile(identifier).unwrap().clone();
    (codec, schema)
}

#[test]
fn test_single_long_field_bytes_match() {
    let (codec, schema) = codec_and_reference("demo.N", json!({
        "type": "record", "name": "N", "namespace": "demo",
        "fields": [{"name": "n", "type": "long"}]
    }));
    let ours = codec
        .serialize(&Datum::record([("n", Datum::Long(5))]))
        .unwrap();
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![("n".into(), AvroValue::Long(5))]),
    )
    .unwrap();
    assert_eq!(ours, reference);
    assert_eq!(ours, vec![0x0a]);
}

#[test]
fn test_union_null_index_matches_reference() {
    let (codec, schema) = codec_and_reference("demo.Holder", json!({
        "type": "record", "name": "Holder", "namespace": "demo",
        "fields": [{"name": "v", "type": ["long", "null", "string"]}]
    }));
    let ours = codec.serialize(&Datum::record([("v", Datum::Null)])).unwrap();
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![(
            "v".into(),
            AvroValue::Union(1, Box::new(AvroValue::Null)),
        )]),
    )
    .unwrap();
    assert_eq!(ours, reference);

    let ours = codec
        .serialize(&Datum::record([("v", Datum::from("x"))]))
        .unwrap();
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![(
            "v".into(),
            AvroValue::Union(2, Box::new(AvroValue::String("x".into()))),
        )]),
    )
    .unwrap();
    assert_eq!(ours, reference);
}

#[test]
fn test_nested_record_bytes_match() {
    let (codec, schema) = codec_and_reference("demo.Outer", json!({
        "type": "record", "name": "Outer", "namespace": "demo",
        "fields": [
            {"name": "label", "type": "string"},
            {"name": "inner", "type": {
                "type": "record", "name": "Inner",
                "fields": [
                    {"name": "flag", "type": "boolean"},
                    {"name": "score", "type": "double"}
                ]
            }}
        ]
    }));
    let ours = codec
        .serialize(&Datum::record([
            ("label", Datum::from("m")),
            (
                "inner",
                Datum::record([
                    ("flag", Datum::Boolean(true)),
                    ("score", Datum::Double(1.5)),
                ]),
            ),
        ]))
        .unwrap();
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![
            ("label".into(), AvroValue::String("m".into())),
            (
                "inner".into(),
                AvroValue::Record(vec![
                    ("flag".into(), AvroValue::Boolean(true)),
                    ("score".into(), AvroValue::Double(1.5)),
                ]),
            ),
        ]),
    )
    .unwrap();
    assert_eq!(ours, reference);
    // And our decoder accepts the reference bytes.
    let decoded = codec.deserialize(&reference).unwrap();
    assert_eq!(
        decoded,
        Datum::record([
            ("label", Datum::from("m")),
            (
                "inner",
                Datum::record([
                    ("flag", Datum::Boolean(true)),
                    ("score", Datum::Double(1.5)),
                ]),
            ),
        ])
    );
}

#[test]
fn test_array_bytes_match() {
    let (codec, schema) = codec_and_reference("demo.Nums", json!({
        "type": "record", "name": "Nums", "namespace": "demo",
        "fields": [{"name": "xs", "type": {"type": "array", "items": "int"}}]
    }));
    let ours = codec
        .serialize(&Datum::record([(
            "xs",
            Datum::Array(vec![Datum::Int(1), Datum::Int(-2), Datum::Int(3)]),
        )]))
        .unwrap();
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![(
            "xs".into(),
            AvroValue::Array(vec![
                AvroValue::Int(1),
                AvroValue::Int(-2),
                AvroValue::Int(3),
            ]),
        )]),
    )
    .unwrap();
    assert_eq!(ours, reference);

    // Empty arrays are the zero terminator alone.
    let ours = codec
        .serialize(&Datum::record([("xs", Datum::Array(vec![]))]))
        .unwrap();
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![("xs".into(), AvroValue::Array(vec![]))]),
    )
    .unwrap();
    assert_eq!(ours, reference);
}

#[test]
fn test_single_entry_map_bytes_match() {
    let (codec, schema) = codec_and_reference("demo.Tags", json!({
        "type": "record", "name": "Tags", "namespace": "demo",
        "fields": [{"name": "tags", "type": {"type": "map", "values": "long"}}]
    }));
    let ours = codec
        .serialize(&Datum::record([(
            "tags",
            Datum::map([("k", Datum::Long(9))]),
        )]))
        .unwrap();
    let mut entries = HashMap::new();
    entries.insert("k".to_string(), AvroValue::Long(9));
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![("tags".into(), AvroValue::Map(entries))]),
    )
    .unwrap();
    assert_eq!(ours, reference);
}

#[test]
fn test_enum_and_fixed_bytes_match() {
    let (codec, schema) = codec_and_reference("demo.S", json!({
        "type": "record", "name": "S", "namespace": "demo",
        "fields": [
            {"name": "state", "type": {"type": "enum", "name": "State", "symbols": ["ON", "OFF"]}},
            {"name": "h", "type": {"type": "fixed", "name": "H4", "size": 4}}
        ]
    }));
    let ours = codec
        .serialize(&Datum::record([
            ("state", Datum::from("OFF")),
            ("h", Datum::Bytes(vec![0xde, 0xad, 0xbe, 0xef])),
        ]))
        .unwrap();
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![
            ("state".into(), AvroValue::Enum(1, "OFF".into())),
            ("h".into(), AvroValue::Fixed(4, vec![0xde, 0xad, 0xbe, 0xef])),
        ]),
    )
    .unwrap();
    assert_eq!(ours, reference);
}

#[test]
fn test_date_logical_bytes_match() {
    let (codec, schema) = codec_and_reference("demo.Day", json!({
        "type": "record", "name": "Day", "namespace": "demo",
        "fields": [{"name": "d", "type": {"type": "int", "logicalType": "date"}}]
    }));
    let ours = codec
        .serialize(&Datum::record([(
            "d",
            Datum::Date(chrono::NaiveDate::from_ymd_opt(2020, 5, 17).unwrap()),
        )]))
        .unwrap();
    // 2020-05-17 is 18399 days after the epoch.
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![("d".into(), AvroValue::Date(18399))]),
    )
    .unwrap();
    assert_eq!(ours, reference);
}

#[test]
fn test_timestamp_millis_bytes_match() {
    let (codec, schema) = codec_and_reference("demo.At", json!({
        "type": "record", "name": "At", "namespace": "demo",
        "fields": [{"name": "t", "type": {"type": "long", "logicalType": "timestamp-millis"}}]
    }));
    let instant = chrono::DateTime::from_timestamp_millis(1_600_000_000_123).unwrap();
    let ours = codec
        .serialize(&Datum::record([("t", Datum::Timestamp(instant))]))
        .unwrap();
    let reference = to_avro_datum(
        &schema,
        AvroValue::Record(vec![(
            "t".into(),
            AvroValue::TimestampMillis(1_600_000_000_123),
        )]),
    )
    .unwrap();
    assert_eq!(ours, reference);
}
