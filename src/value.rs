//! Runtime value model for compiled codecs
//!
//! `Datum` is the in-memory shape a compiled serializer reads from and a
//! compiled deserializer builds up. Records and maps use `BTreeMap` so
//! that serialization order (and therefore the produced bytes) is
//! deterministic. Enum values are carried as their symbol string, fixed
//! values as raw bytes, matching how the generated union type guards
//! dispatch.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use num_bigint::BigInt;
use uuid::Uuid;

/// A dynamically typed value matching some Avro schema shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Record(BTreeMap<String, Datum>),
    Array(Vec<Datum>),
    Map(BTreeMap<String, Datum>),
    /// Unscaled decimal value; the scale lives in the schema.
    Decimal(BigInt),
    Date(NaiveDate),
    /// Time of day; schema decides millisecond or microsecond precision.
    Time(NaiveTime),
    /// Instant; schema decides millisecond or microsecond precision.
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl Datum {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Boolean(_) => "boolean",
            Datum::Int(_) => "int",
            Datum::Long(_) => "long",
            Datum::Float(_) => "float",
            Datum::Double(_) => "double",
            Datum::Bytes(_) => "bytes",
            Datum::String(_) => "string",
            Datum::Record(_) => "record",
            Datum::Array(_) => "array",
            Datum::Map(_) => "map",
            Datum::Decimal(_) => "decimal",
            Datum::Date(_) => "date",
            Datum::Time(_) => "time",
            Datum::Timestamp(_) => "timestamp",
            Datum::Uuid(_) => "uuid",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Build a record datum from `(field, value)` pairs.
    pub fn record<I, K>(fields: I) -> Datum
    where
        I: IntoIterator<Item = (K, Datum)>,
        K: Into<String>,
    {
        Datum::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a map datum from `(key, value)` pairs.
    pub fn map<I, K>(entries: I) -> Datum
    where
        I: IntoIterator<Item = (K, Datum)>,
        K: Into<String>,
    {
        Datum::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Boolean(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Long(v)
    }
}

impl From<f32> for Datum {
    fn from(v: f32) -> Self {
        Datum::Float(v)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Double(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(v)
    }
}

impl From<Vec<Datum>> for Datum {
    fn from(v: Vec<Datum>) -> Self {
        Datum::Array(v)
    }
}
