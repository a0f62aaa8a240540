//! Schema types and JSON parsing
//!
//! Schemas are parsed out of `serde_json::Value` into a closed tagged
//! variant, one variant per Avro shape. The generator matches on this
//! exhaustively instead of probing raw JSON. Named types keep their
//! declared name plus namespace so nested definitions can be promoted
//! into the store and referenced from other schemas.

use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Avro primitive type names, the only type strings that are never
/// treated as references.
pub const BASIC_TYPES: [&str; 8] = [
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

/// An Avro primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl Primitive {
    pub fn parse(name: &str) -> Option<Primitive> {
        match name {
            "null" => Some(Primitive::Null),
            "boolean" => Some(Primitive::Boolean),
            "int" => Some(Primitive::Int),
            "long" => Some(Primitive::Long),
            "float" => Some(Primitive::Float),
            "double" => Some(Primitive::Double),
            "bytes" => Some(Primitive::Bytes),
            "string" => Some(Primitive::String),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bytes => "bytes",
            Primitive::String => "string",
        }
    }
}

/// Logical type annotations with a preparation step in `logical.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKind {
    Decimal,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Uuid,
}

impl LogicalKind {
    pub fn parse(name: &str) -> Option<LogicalKind> {
        match name {
            "decimal" => Some(LogicalKind::Decimal),
            "date" => Some(LogicalKind::Date),
            "time-millis" => Some(LogicalKind::TimeMillis),
            "time-micros" => Some(LogicalKind::TimeMicros),
            "timestamp-millis" => Some(LogicalKind::TimestampMillis),
            "timestamp-micros" => Some(LogicalKind::TimestampMicros),
            "uuid" => Some(LogicalKind::Uuid),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicalKind::Decimal => "decimal",
            LogicalKind::Date => "date",
            LogicalKind::TimeMillis => "time-millis",
            LogicalKind::TimeMicros => "time-micros",
            LogicalKind::TimestampMillis => "timestamp-millis",
            LogicalKind::TimestampMicros => "timestamp-micros",
            LogicalKind::Uuid => "uuid",
        }
    }
}

/// The raw wire type underneath a logical annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalRaw {
    Primitive(Primitive),
    Fixed(usize),
}

/// A primitive or fixed schema decorated with a logical type.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSchema {
    pub kind: LogicalKind,
    pub raw: LogicalRaw,
    /// Decimal scale; zero for everything else.
    pub scale: u32,
    /// Decimal precision, when declared.
    pub precision: Option<u32>,
}

/// One field of a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: SchemaNode,
    /// Raw JSON default, materialized into a `Datum` at generation time.
    pub default: Option<Value>,
}

/// A record schema: an ordered list of named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub fields: Vec<Field>,
}

/// An enum schema: an ordered list of symbol strings.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub symbols: Vec<String>,
}

/// A fixed schema: exactly `size` raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub size: usize,
}

/// A parsed schema shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Primitive(Primitive),
    Record(RecordSchema),
    Array(Box<SchemaNode>),
    Map(Box<SchemaNode>),
    Enum(EnumSchema),
    Fixed(FixedSchema),
    Union(Vec<SchemaNode>),
    /// A bare identifier naming a schema defined elsewhere.
    Reference(String),
    Logical(LogicalSchema),
}

impl SchemaNode {
    /// Parse a schema out of its JSON form.
    pub fn parse(value: &Value) -> Result<SchemaNode> {
        match value {
            Value::String(name) => Ok(match Primitive::parse(name) {
                Some(p) => SchemaNode::Primitive(p),
                None => SchemaNode::Reference(name.clone()),
            }),
            Value::Array(alternatives) => {
                let alts = alternatives
                    .iter()
                    .map(SchemaNode::parse)
                    .collect::<Result<Vec<_>>>()?;
                Ok(SchemaNode::Union(alts))
            }
            Value::Object(obj) => {
                if obj.contains_key("logicalType") {
                    if let Some(logical) = parse_logical(value)? {
                        return Ok(logical);
                    }
                    // Unknown logical annotations fall through to the raw type,
                    // per the Avro specification.
                }
                let type_field = obj
                    .get("type")
                    .ok_or_else(|| SchemaError::Generation(format!("schema object without a type key: {value}")))?;
                match type_field {
                    Value::Object(_) | Value::Array(_) => SchemaNode::parse(type_field),
                    Value::String(type_name) => parse_complex(type_name, value),
                    other => Err(SchemaError::Generation(format!("unusable type key: {other}"))),
                }
            }
            other => Err(SchemaError::Generation(format!("cannot parse schema from {other}"))),
        }
    }

    /// Declared name of this node, if it is a named type.
    pub fn name(&self) -> Option<&str> {
        match self {
            SchemaNode::Record(r) => r.name.as_deref(),
            SchemaNode::Enum(e) => e.name.as_deref(),
            SchemaNode::Fixed(f) => f.name.as_deref(),
            _ => None,
        }
    }

    /// Fully qualified name: the declared name if it is already dotted,
    /// otherwise `namespace.name` when a namespace is present.
    pub fn fullname(&self) -> Option<String> {
        let (name, namespace) = match self {
            SchemaNode::Record(r) => (r.name.as_deref(), r.namespace.as_deref()),
            SchemaNode::Enum(e) => (e.name.as_deref(), e.namespace.as_deref()),
            SchemaNode::Fixed(f) => (f.name.as_deref(), f.namespace.as_deref()),
            _ => (None, None),
        };
        let name = name?;
        if name.contains('.') {
            return Some(name.to_string());
        }
        match namespace {
            Some(ns) => Some(format!("{ns}.{name}")),
            None => Some(name.to_string()),
        }
    }

    /// Walk the schema tree collecting every named subschema, in
    /// definition order. Edges followed: record fields, array items,
    /// map values, union alternatives, logical raw types carry no names.
    pub fn named_nodes(&self) -> Vec<(&SchemaNode, String)> {
        let mut out = Vec::new();
        self.collect_named(&mut out);
        out
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<(&'a SchemaNode, String)>) {
        match self {
            SchemaNode::Record(r) => {
                if let Some(full) = self.fullname() {
                    out.push((self, full));
                }
                for field in &r.fields {
                    field.schema.collect_named(out);
                }
            }
            SchemaNode::Enum(_) | SchemaNode::Fixed(_) => {
                if let Some(full) = self.fullname() {
                    out.push((self, full));
                }
            }
            SchemaNode::Array(items) => items.collect_named(out),
            SchemaNode::Map(values) => values.collect_named(out),
            SchemaNode::Union(alts) => {
                for alt in alts {
                    alt.collect_named(out);
                }
            }
            _ => {}
        }
    }

    /// Find a named subschema of this tree by its bare or fully
    /// qualified name. Used for local-name shadowing during resolution.
    pub fn find_named(&self, identifier: &str) -> Option<&SchemaNode> {
        self.named_nodes().into_iter().find_map(|(node, full)| {
            if full == identifier || node.name() == Some(identifier) {
                Some(node)
            } else {
                None
            }
        })
    }
}

fn name_and_namespace(obj: &serde_json::Map<String, Value>) -> (Option<String>, Option<String>) {
    let name = obj.get("name").and_then(|v| v.as_str()).map(String::from);
    let namespace = obj
        .get("namespace")
        .and_then(|v| v.as_str())
        .map(String::from);
    (name, namespace)
}

fn parse_complex(type_name: &str, value: &Value) -> Result<SchemaNode> {
    let obj = value.as_object().expect("caller checked this is an object");
    match type_name {
        "record" => {
            let (name, namespace) = name_and_namespace(obj);
            let raw_fields = obj
                .get("fields")
                .and_then(|v| v.as_array())
                .ok_or_else(|| SchemaError::Generation(format!("record without fields: {value}")))?;
            let mut fields = Vec::with_capacity(raw_fields.len());
            for raw in raw_fields {
                let field_obj = raw
                    .as_object()
                    .ok_or_else(|| SchemaError::Generation(format!("record field is not an object: {raw}")))?;
                let field_name = field_obj
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| SchemaError::Generation(format!("record field without a name: {raw}")))?;
                let field_type = field_obj
                    .get("type")
                    .ok_or_else(|| SchemaError::Generation(format!("record field without a type: {raw}")))?;
                fields.push(Field {
                    name: field_name.to_string(),
                    schema: SchemaNode::parse(field_type)?,
                    default: field_obj.get("default").cloned(),
                });
            }
            Ok(SchemaNode::Record(RecordSchema {
                name,
                namespace,
                fields,
            }))
        }
        "array" => {
            let items = obj
                .get("items")
                .ok_or_else(|| SchemaError::Generation(format!("array without items: {value}")))?;
            Ok(SchemaNode::Array(Box::new(SchemaNode::parse(items)?)))
        }
        "map" => {
            let values = obj
                .get("values")
                .ok_or_else(|| SchemaError::Generation(format!("map without values: {value}")))?;
            Ok(SchemaNode::Map(Box::new(SchemaNode::parse(values)?)))
        }
        "enum" => {
            let (name, namespace) = name_and_namespace(obj);
            let symbols = obj
                .get("symbols")
                .and_then(|v| v.as_array())
                .ok_or_else(|| SchemaError::Generation(format!("enum without symbols: {value}")))?
                .iter()
                .map(|s| {
                    s.as_str()
                        .map(String::from)
                        .ok_or_else(|| SchemaError::Generation(format!("enum symbol is not a string: {s}")))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(SchemaNode::Enum(EnumSchema {
                name,
                namespace,
                symbols,
            }))
        }
        "fixed" => {
            let (name, namespace) = name_and_namespace(obj);
            let size = obj
                .get("size")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| SchemaError::Generation(format!("fixed without a size: {value}")))?;
            Ok(SchemaNode::Fixed(FixedSchema {
                name,
                namespace,
                size: size as usize,
            }))
        }
        other => match Primitive::parse(other) {
            Some(p) => Ok(SchemaNode::Primitive(p)),
            None => Ok(SchemaNode::Reference(other.to_string())),
        },
    }
}

/// Parse a `logicalType`-annotated schema. Returns `None` when the
/// annotation names a logical type we have no preparation step for.
fn parse_logical(value: &Value) -> Result<Option<SchemaNode>> {
    let obj = value.as_object().expect("caller checked this is an object");
    let logical_name = obj
        .get("logicalType")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SchemaError::Generation(format!("logicalType is not a string: {value}")))?;
    let Some(kind) = LogicalKind::parse(logical_name) else {
        return Ok(None);
    };
    let type_name = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SchemaError::Generation(format!("logical schema without a type key: {value}")))?;
    let raw = if type_name == "fixed" {
        let size = obj
            .get("size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| SchemaError::Generation(format!("fixed logical schema without a size: {value}")))?;
        LogicalRaw::Fixed(size as usize)
    } else {
        match Primitive::parse(type_name) {
            Some(p) => LogicalRaw::Primitive(p),
            None => {
                return Err(SchemaError::Generation(format!(
                    "logical type {logical_name} over non-primitive type {type_name}"
                )))
            }
        }
    };
    let scale = obj.get("scale").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let precision = obj.get("precision").and_then(|v| v.as_u64()).map(|p| p as u32);
    Ok(Some(SchemaNode::Logical(LogicalSchema {
        kind,
        raw,
        scale,
        precision,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_primitive_string() {
        assert_eq!(
            SchemaNode::parse(&json!("long")).unwrap(),
            SchemaNode::Primitive(Primitive::Long)
        );
    }

    #[test]
    fn test_parse_reference_string() {
        assert_eq!(
            SchemaNode::parse(&json!("messaging.Envelope")).unwrap(),
            SchemaNode::Reference("messaging.Envelope".into())
        );
    }

    #[test]
    fn test_parse_record() {
        let schema = SchemaNode::parse(&json!({
            "type": "record",
            "name": "User",
            "namespace": "auth",
            "fields": [
                {"name": "id", "type": "long"},
                {"name": "email", "type": "string", "default": ""}
            ]
        }))
        .unwrap();
        let SchemaNode::Record(record) = &schema else {
            panic!("expected record, got {schema:?}");
        };
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[1].default, Some(json!("")));
        assert_eq!(schema.fullname().as_deref(), Some("auth.User"));
    }

    #[test]
    fn test_parse_union_list() {
        let schema = SchemaNode::parse(&json!(["null", "int"])).unwrap();
        assert_eq!(
            schema,
            SchemaNode::Union(vec![
                SchemaNode::Primitive(Primitive::Null),
                SchemaNode::Primitive(Primitive::Int),
            ])
        );
    }

    #[test]
    fn test_parse_logical_decimal() {
        let schema = SchemaNode::parse(&json!({
            "type": "fixed",
            "name": "money",
            "size": 8,
            "logicalType": "decimal",
            "scale": 2,
            "precision": 18
        }))
        .unwrap();
        let SchemaNode::Logical(logical) = schema else {
            panic!("expected logical schema");
        };
        assert_eq!(logical.kind, LogicalKind::Decimal);
        assert_eq!(logical.raw, LogicalRaw::Fixed(8));
        assert_eq!(logical.scale, 2);
        assert_eq!(logical.precision, Some(18));
    }

    #[test]
    fn test_unknown_logical_falls_back_to_raw() {
        let schema = SchemaNode::parse(&json!({
            "type": "string",
            "logicalType": "some-vendor-extension"
        }))
        .unwrap();
        assert_eq!(schema, SchemaNode::Primitive(Primitive::String));
    }

    #[test]
    fn test_missing_keys_are_generation_errors() {
        let err = SchemaNode::parse(&json!({"type": "record", "name": "X"})).unwrap_err();
        assert!(matches!(err, SchemaError::Generation(_)));
        let err = SchemaNode::parse(&json!({"type": "fixed", "name": "F"})).unwrap_err();
        assert!(matches!(err, SchemaError::Generation(_)));
    }

    #[test]
    fn test_named_nodes_collects_nested_definitions() {
        let schema = SchemaNode::parse(&json!({
            "type": "record",
            "name": "Outer",
            "namespace": "demo",
            "fields": [
                {"name": "state", "type": {"type": "enum", "name": "State", "symbols": ["ON", "OFF"]}},
                {"name": "blobs", "type": {"type": "array", "items": {"type": "fixed", "name": "demo.Blob", "size": 4}}}
            ]
        }))
        .unwrap();
        let names: Vec<String> = schema.named_nodes().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["demo.Outer", "State", "demo.Blob"]);
        assert!(schema.find_named("State").is_some());
        assert!(schema.find_named("demo.Blob").is_some());
        assert!(schema.find_named("Missing").is_none());
    }
}
