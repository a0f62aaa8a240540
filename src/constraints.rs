//! Constraint / type-mapping utilities
//!
//! Pure functions used by the generator to build union-branch dispatch:
//! a table correcting Avro primitive names into runtime value kind
//! names, and the `TypeGuard` predicates a compiled codec evaluates
//! against a `Datum` to pick the matching union alternative.

use crate::error::{Result, SchemaError};
use crate::schema::{LogicalKind, Primitive, SchemaNode};
use crate::store::SchemaStore;
use crate::value::Datum;

/// Map an Avro primitive type name to the runtime value kind it checks
/// against, or `None` for non-primitive names.
pub fn runtime_type_name(avro_type: &str) -> Option<&'static str> {
    match avro_type {
        "null" => Some("null"),
        "boolean" => Some("boolean"),
        "int" => Some("int"),
        "long" => Some("long"),
        "float" => Some("float"),
        "double" => Some("double"),
        "bytes" => Some("bytes"),
        "string" => Some("string"),
        _ => None,
    }
}

/// A runtime predicate over one `Datum`, used for union dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeGuard {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// Fixed values are byte buffers at runtime.
    FixedBytes,
    Array,
    Map,
    /// Records are key/value shapes at runtime.
    RecordShape,
    /// Enum values must be one of the declared symbols.
    EnumSymbol(Vec<String>),
    /// The prepared conversion for this logical type must apply.
    Logical(LogicalKind),
}

impl TypeGuard {
    /// Evaluate the guard. `datum` is `None` when the location is
    /// absent from the value being serialized; only the null guard
    /// accepts that.
    pub fn matches(&self, datum: Option<&Datum>) -> bool {
        let Some(datum) = datum else {
            return matches!(self, TypeGuard::Null);
        };
        match self {
            TypeGuard::Null => datum.is_null(),
            TypeGuard::Boolean => matches!(datum, Datum::Boolean(_)),
            TypeGuard::Int => matches!(datum, Datum::Int(_)),
            TypeGuard::Long => matches!(datum, Datum::Long(_)),
            TypeGuard::Float => matches!(datum, Datum::Float(_)),
            TypeGuard::Double => matches!(datum, Datum::Double(_)),
            TypeGuard::Bytes | TypeGuard::FixedBytes => matches!(datum, Datum::Bytes(_)),
            TypeGuard::String => matches!(datum, Datum::String(_)),
            TypeGuard::Array => matches!(datum, Datum::Array(_)),
            TypeGuard::Map => matches!(datum, Datum::Map(_)),
            TypeGuard::RecordShape => matches!(datum, Datum::Record(_)),
            TypeGuard::EnumSymbol(symbols) => {
                matches!(datum, Datum::String(s) if symbols.iter().any(|sym| sym == s))
            }
            TypeGuard::Logical(kind) => match kind {
                LogicalKind::Decimal => matches!(datum, Datum::Decimal(_)),
                LogicalKind::Date => matches!(datum, Datum::Date(_)),
                LogicalKind::TimeMillis | LogicalKind::TimeMicros => {
                    matches!(datum, Datum::Time(_))
                }
                LogicalKind::TimestampMillis | LogicalKind::TimestampMicros => {
                    matches!(datum, Datum::Timestamp(_))
                }
                LogicalKind::Uuid => matches!(datum, Datum::Uuid(_)),
            },
        }
    }
}

/// Build the dispatch guard for one union alternative. References are
/// resolved through the store (with local shadowing) before deciding;
/// a shape with no workable predicate is `InvalidConstraint`.
pub fn type_guard(
    schema: &SchemaNode,
    store: &SchemaStore,
    context: Option<&str>,
) -> Result<TypeGuard> {
    match schema {
        SchemaNode::Primitive(p) => Ok(match p {
            Primitive::Null => TypeGuard::Null,
            Primitive::Boolean => TypeGuard::Boolean,
            Primitive::Int => TypeGuard::Int,
            Primitive::Long => TypeGuard::Long,
            Primitive::Float => TypeGuard::Float,
            Primitive::Double => TypeGuard::Double,
            Primitive::Bytes => TypeGuard::Bytes,
            Primitive::String => TypeGuard::String,
        }),
        SchemaNode::Fixed(_) => Ok(TypeGuard::FixedBytes),
        SchemaNode::Array(_) => Ok(TypeGuard::Array),
        SchemaNode::Map(_) => Ok(TypeGuard::Map),
        SchemaNode::Record(_) => Ok(TypeGuard::RecordShape),
        SchemaNode::Enum(e) => Ok(TypeGuard::EnumSymbol(e.symbols.clone())),
        SchemaNode::Logical(l) => Ok(TypeGuard::Logical(l.kind)),
        SchemaNode::Reference(name) => {
            let resolved = store.resolve(name, context)?;
            type_guard(resolved, store, context)
        }
        SchemaNode::Union(_) => Err(SchemaError::InvalidConstraint(
            "a union alternative cannot itself be a union".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use serde_json::json;

    #[test]
    fn test_runtime_type_name_table() {
        assert_eq!(runtime_type_name("string"), Some("string"));
        assert_eq!(runtime_type_name("boolean"), Some("boolean"));
        assert_eq!(runtime_type_name("long"), Some("long"));
        assert_eq!(runtime_type_name("double"), Some("double"));
        assert_eq!(runtime_type_name("record"), None);
        assert_eq!(runtime_type_name("my.Schema"), None);
    }

    #[test]
    fn test_primitive_guards_are_exact() {
        assert!(TypeGuard::Long.matches(Some(&Datum::Long(1))));
        assert!(!TypeGuard::Long.matches(Some(&Datum::Int(1))));
        assert!(!TypeGuard::Int.matches(Some(&Datum::Long(1))));
        assert!(TypeGuard::Null.matches(Some(&Datum::Null)));
        // An absent location only satisfies the null guard.
        assert!(TypeGuard::Null.matches(None));
        assert!(!TypeGuard::Long.matches(None));
    }

    #[test]
    fn test_enum_guard_checks_membership() {
        let guard = TypeGuard::EnumSymbol(vec!["ON".into(), "OFF".into()]);
        assert!(guard.matches(Some(&Datum::String("ON".into()))));
        assert!(!guard.matches(Some(&Datum::String("HALF".into()))));
        assert!(!guard.matches(Some(&Datum::Int(0))));
    }

    #[test]
    fn test_logical_guard_matches_prepared_kind() {
        let guard = TypeGuard::Logical(LogicalKind::Decimal);
        assert!(guard.matches(Some(&Datum::Decimal(BigInt::from(5)))));
        assert!(!guard.matches(Some(&Datum::Double(0.05))));
    }

    #[test]
    fn test_reference_guard_resolves_through_store() {
        let mut store = SchemaStore::new();
        store
            .register(
                "demo.State",
                &json!({"type": "enum", "name": "State", "namespace": "demo", "symbols": ["A", "B"]}),
            )
            .unwrap();
        let guard = type_guard(
            &SchemaNode::Reference("demo.State".into()),
            &store,
            None,
        )
        .unwrap();
        assert_eq!(guard, TypeGuard::EnumSymbol(vec!["A".into(), "B".into()]));
    }

    #[test]
    fn test_unresolvable_reference_is_unknown_schema() {
        let store = SchemaStore::new();
        let err = type_guard(&SchemaNode::Reference("demo.Nope".into()), &store, None).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownSchema(_)));
    }
}
