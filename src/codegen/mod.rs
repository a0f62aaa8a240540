//! Schema-to-codec lowering
//!
//! `generate` walks a registered schema and lowers it into the IR in
//! `ir.rs`: one statement list per direction plus auxiliary functions
//! for cycle-starting references. The walk mirrors the schema tree;
//! all schema-shape validation that can fail does so here, so a
//! produced module never fails for schema reasons at runtime.

pub mod ir;
pub mod render;

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::constraints;
pub use crate::constraints::TypeGuard;
use crate::error::{Result, SchemaError};
use crate::logical;
use crate::schema::{Field, Primitive, SchemaNode};
use crate::store::SchemaStore;
use crate::value::Datum;

use ir::{AuxFn, Cond, GeneratedModule, Location, Mode, Stmt};

/// Per-prefix counters for loop variable names, so nested loops over
/// the same shape never collide. Reset with each top-level generation.
#[derive(Default)]
struct NameAllocator {
    counters: HashMap<String, usize>,
}

impl NameAllocator {
    fn next(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}_{counter}");
        *counter += 1;
        name
    }
}

/// Lower the schema registered under `identifier` into a module.
pub fn generate(store: &SchemaStore, identifier: &str) -> Result<GeneratedModule> {
    let schema = store.resolve(identifier, None)?;
    debug!(identifier, "generating codec module");
    let mut generator = CodeGenerator {
        store,
        context: Some(identifier.to_string()),
        names: NameAllocator::default(),
        handled_cycles: HashSet::new(),
        aux: Vec::new(),
    };
    let serialize = generator.serialize_node(schema, &Location::root("data"))?;
    let deserialize = generator.deserialize_node(schema, &Location::root("data"))?;
    Ok(GeneratedModule {
        identifier: identifier.to_string(),
        serialize,
        deserialize,
        aux: generator.aux,
    })
}

struct CodeGenerator<'a> {
    store: &'a SchemaStore,
    /// The top-level schema whose local names currently shadow the
    /// store; swapped while lowering the body of a referenced schema.
    context: Option<String>,
    names: NameAllocator,
    handled_cycles: HashSet<String>,
    aux: Vec<AuxFn>,
}

impl CodeGenerator<'_> {
    // ==== serialize direction ====

    fn serialize_node(&mut self, schema: &SchemaNode, loc: &Location) -> Result<Vec<Stmt>> {
        match schema {
            SchemaNode::Primitive(Primitive::Null) => Ok(vec![Stmt::WriteNull]),
            SchemaNode::Primitive(p) => Ok(vec![Stmt::WritePrimitive {
                primitive: *p,
                value: loc.clone(),
            }]),
            SchemaNode::Fixed(f) => Ok(vec![Stmt::WriteFixed {
                size: f.size,
                value: loc.clone(),
            }]),
            SchemaNode::Enum(e) => Ok(vec![Stmt::WriteEnum {
                symbols: e.symbols.clone(),
                value: loc.clone(),
            }]),
            SchemaNode::Logical(spec) => {
                logical::validate(spec)?;
                Ok(vec![Stmt::WriteLogical {
                    spec: spec.clone(),
                    value: loc.clone(),
                }])
            }
            SchemaNode::Record(record) => {
                let mut stmts = Vec::new();
                for field in &record.fields {
                    let field_loc = loc.field(&field.name);
                    if let Some(stmt) = self.default_injection(field, &field_loc)? {
                        stmts.push(stmt);
                    }
                    stmts.extend(self.serialize_node(&field.schema, &field_loc)?);
                }
                Ok(stmts)
            }
            SchemaNode::Array(items) => {
                let item = self.names.next("val");
                let body = self.serialize_node(items, &Location::root(item.clone()))?;
                Ok(vec![Stmt::SerializeArray {
                    over: loc.clone(),
                    item,
                    body,
                }])
            }
            SchemaNode::Map(values) => {
                let key = self.names.next("key");
                let body = self.serialize_node(values, &loc.keyed(&key))?;
                Ok(vec![Stmt::SerializeMap {
                    over: loc.clone(),
                    key,
                    body,
                }])
            }
            SchemaNode::Union(alternatives) => self.serialize_union(alternatives, loc),
            SchemaNode::Reference(name) => self.serialize_reference(name, loc),
        }
    }

    fn serialize_union(&mut self, alternatives: &[SchemaNode], loc: &Location) -> Result<Vec<Stmt>> {
        self.check_union_shape(alternatives)?;

        let mut arms = Vec::new();
        // The null alternative is dispatched first regardless of its
        // declared position, so absent locations short-circuit. It
        // still writes its declared index.
        if let Some(null_index) = alternatives
            .iter()
            .position(|alt| matches!(alt, SchemaNode::Primitive(Primitive::Null)))
        {
            arms.push((
                Cond {
                    guard: TypeGuard::Null,
                    at: loc.clone(),
                },
                vec![Stmt::WriteLongLit(null_index as i64), Stmt::WriteNull],
            ));
        }
        for (index, alternative) in alternatives.iter().enumerate() {
            if matches!(alternative, SchemaNode::Primitive(Primitive::Null)) {
                continue;
            }
            let guard =
                constraints::type_guard(alternative, self.store, self.context.as_deref())?;
            let mut body = vec![Stmt::WriteLongLit(index as i64)];
            body.extend(self.serialize_node(alternative, loc)?);
            arms.push((
                Cond {
                    guard,
                    at: loc.clone(),
                },
                body,
            ));
        }
        Ok(vec![Stmt::Branch {
            arms,
            otherwise: vec![Stmt::Fail {
                location: loc.render(),
            }],
        }])
    }

    fn serialize_reference(&mut self, name: &str, loc: &Location) -> Result<Vec<Stmt>> {
        if self.store.is_cycle_starting(name) {
            let function = self.handle_cycle(name, Mode::Serialize)?;
            return Ok(vec![
                Stmt::Flush,
                Stmt::CallSerialize {
                    function,
                    arg: loc.clone(),
                },
            ]);
        }
        let resolved = self.store.resolve(name, self.context.as_deref())?.clone();
        self.with_reference_context(name, |generator| generator.serialize_node(&resolved, loc))
    }

    // ==== deserialize direction ====

    fn deserialize_node(&mut self, schema: &SchemaNode, target: &Location) -> Result<Vec<Stmt>> {
        match schema {
            SchemaNode::Primitive(p) => Ok(vec![Stmt::ReadPrimitive {
                primitive: *p,
                target: target.clone(),
            }]),
            SchemaNode::Fixed(f) => Ok(vec![Stmt::ReadFixed {
                size: f.size,
                target: target.clone(),
            }]),
            SchemaNode::Enum(e) => Ok(vec![Stmt::ReadEnum {
                symbols: e.symbols.clone(),
                target: target.clone(),
            }]),
            SchemaNode::Logical(spec) => {
                logical::validate(spec)?;
                Ok(vec![Stmt::ReadLogical {
                    spec: spec.clone(),
                    target: target.clone(),
                }])
            }
            SchemaNode::Record(record) => {
                let mut stmts = vec![Stmt::NewRecord {
                    target: target.clone(),
                }];
                for field in &record.fields {
                    stmts.extend(self.deserialize_node(&field.schema, &target.field(&field.name))?);
                }
                Ok(stmts)
            }
            SchemaNode::Array(items) => {
                let item = self.names.next("val");
                let body = self.deserialize_node(items, &Location::root(item.clone()))?;
                Ok(vec![Stmt::DeserializeArray {
                    target: target.clone(),
                    item,
                    body,
                }])
            }
            SchemaNode::Map(values) => {
                let key = self.names.next("key");
                let body = self.deserialize_node(values, &target.keyed(&key))?;
                Ok(vec![Stmt::DeserializeMap {
                    target: target.clone(),
                    key,
                    body,
                }])
            }
            SchemaNode::Union(alternatives) => {
                self.check_union_shape(alternatives)?;
                let arms = alternatives
                    .iter()
                    .map(|alternative| self.deserialize_node(alternative, target))
                    .collect::<Result<Vec<_>>>()?;
                Ok(vec![Stmt::ReadUnion {
                    arms,
                    location: target.render(),
                }])
            }
            SchemaNode::Reference(name) => self.deserialize_reference(name, target),
        }
    }

    fn deserialize_reference(&mut self, name: &str, target: &Location) -> Result<Vec<Stmt>> {
        if self.store.is_cycle_starting(name) {
            let function = self.handle_cycle(name, Mode::Deserialize)?;
            return Ok(vec![Stmt::CallDeserialize {
                function,
                target: target.clone(),
            }]);
        }
        let resolved = self.store.resolve(name, self.context.as_deref())?.clone();
        self.with_reference_context(name, |generator| {
            generator.deserialize_node(&resolved, target)
        })
    }

    // ==== shared ====

    /// Generate the auxiliary function for a cycle-starting schema,
    /// once per direction, and hand back its name. The name is marked
    /// handled before the body is lowered so the recursive reference
    /// inside the body resolves to a plain call.
    fn handle_cycle(&mut self, identifier: &str, mode: Mode) -> Result<String> {
        let function = aux_fn_name(identifier, mode);
        if !self.handled_cycles.insert(function.clone()) {
            return Ok(function);
        }
        let resolved = self.store.resolve(identifier, self.context.as_deref())?.clone();
        let body = self.with_reference_context(identifier, |generator| match mode {
            Mode::Serialize => generator.serialize_node(&resolved, &Location::root("data")),
            Mode::Deserialize => generator.deserialize_node(&resolved, &Location::root("data")),
        })?;
        debug!(identifier, function, "generated cycle-breaking function");
        self.aux.push(AuxFn {
            name: function.clone(),
            mode,
            body,
        });
        Ok(function)
    }

    /// Run `f` with the resolution context switched to the referenced
    /// schema, so its own local names shadow correctly. References
    /// resolved through local shadowing keep the current context.
    fn with_reference_context<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let switches = self.store.contains(name) && self.context.as_deref() != Some(name);
        let saved = if switches {
            self.context.replace(name.to_string())
        } else {
            None
        };
        let result = f(self);
        if switches {
            self.context = saved;
        }
        result
    }

    /// A union with two or more array alternatives cannot be
    /// dispatched by a type guard; reject it at generation time.
    fn check_union_shape(&self, alternatives: &[SchemaNode]) -> Result<()> {
        let mut array_count = 0;
        for alternative in alternatives {
            let resolved = match alternative {
                SchemaNode::Reference(name) => {
                    self.store.resolve(name, self.context.as_deref())?
                }
                other => other,
            };
            if matches!(resolved, SchemaNode::Array(_)) {
                array_count += 1;
            }
        }
        if array_count >= 2 {
            return Err(SchemaError::UnsupportedSchema(format!(
                "union with {array_count} array alternatives cannot be dispatched"
            )));
        }
        Ok(())
    }

    /// Statement installing the field's declared default when the
    /// field is absent or null in the incoming value.
    fn default_injection(&self, field: &Field, field_loc: &Location) -> Result<Option<Stmt>> {
        let Some(raw) = &field.default else {
            return Ok(None);
        };
        let default = self.default_datum(&field.schema, raw)?;
        Ok(Some(Stmt::DefaultIfMissing {
            target: field_loc.clone(),
            default,
        }))
    }

    /// Materialize a JSON default into the runtime value the encoder
    /// expects. Union defaults are typed by the first alternative.
    fn default_datum(&self, schema: &SchemaNode, raw: &Value) -> Result<Datum> {
        let mismatch = || {
            SchemaError::Generation(format!("default {raw} does not match its declared schema"))
        };
        match schema {
            SchemaNode::Union(alternatives) => {
                let first = alternatives.first().ok_or_else(mismatch)?;
                self.default_datum(first, raw)
            }
            SchemaNode::Primitive(Primitive::Null) => {
                raw.is_null().then_some(Datum::Null).ok_or_else(mismatch)
            }
            SchemaNode::Primitive(Primitive::Boolean) => {
                raw.as_bool().map(Datum::Boolean).ok_or_else(mismatch)
            }
            SchemaNode::Primitive(Primitive::Int) => raw
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Datum::Int)
                .ok_or_else(mismatch),
            SchemaNode::Primitive(Primitive::Long) => {
                raw.as_i64().map(Datum::Long).ok_or_else(mismatch)
            }
            SchemaNode::Primitive(Primitive::Float) => raw
                .as_f64()
                .map(|v| Datum::Float(v as f32))
                .ok_or_else(mismatch),
            SchemaNode::Primitive(Primitive::Double) => {
                raw.as_f64().map(Datum::Double).ok_or_else(mismatch)
            }
            SchemaNode::Primitive(Primitive::String) => raw
                .as_str()
                .map(|s| Datum::String(s.to_string()))
                .ok_or_else(mismatch),
            // JSON defaults encode bytes and fixed as strings of
            // codepoints 0..=255, per the Avro specification.
            SchemaNode::Primitive(Primitive::Bytes) | SchemaNode::Fixed(_) => {
                let text = raw.as_str().ok_or_else(mismatch)?;
                let bytes = text
                    .chars()
                    .map(|c| u8::try_from(u32::from(c)).map_err(|_| mismatch()))
                    .collect::<Result<Vec<u8>>>()?;
                Ok(Datum::Bytes(bytes))
            }
            SchemaNode::Enum(e) => {
                let symbol = raw.as_str().ok_or_else(mismatch)?;
                if !e.symbols.iter().any(|s| s == symbol) {
                    return Err(mismatch());
                }
                Ok(Datum::String(symbol.to_string()))
            }
            SchemaNode::Array(items) => {
                let elements = raw.as_array().ok_or_else(mismatch)?;
                let data = elements
                    .iter()
                    .map(|element| self.default_datum(items, element))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Datum::Array(data))
            }
            SchemaNode::Map(values) => {
                let entries = raw.as_object().ok_or_else(mismatch)?;
                let data = entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.default_datum(values, value)?)))
                    .collect::<Result<_>>()?;
                Ok(Datum::Map(data))
            }
            SchemaNode::Record(record) => {
                let entries = raw.as_object().ok_or_else(mismatch)?;
                let mut data = std::collections::BTreeMap::new();
                for field in &record.fields {
                    let field_raw = entries
                        .get(&field.name)
                        .or(field.default.as_ref())
                        .ok_or_else(mismatch)?;
                    data.insert(
                        field.name.clone(),
                        self.default_datum(&field.schema, field_raw)?,
                    );
                }
                Ok(Datum::Record(data))
            }
            SchemaNode::Reference(name) => {
                let resolved = self.store.resolve(name, self.context.as_deref())?.clone();
                self.default_datum(&resolved, raw)
            }
            SchemaNode::Logical(_) => Err(SchemaError::Generation(format!(
                "defaults on logical types are not supported: {raw}"
            ))),
        }
    }
}

/// Name of the cycle-breaking function for a schema identifier. Dots
/// and colons in identifiers become underscores.
fn aux_fn_name(identifier: &str, mode: Mode) -> String {
    let prefix = match mode {
        Mode::Serialize => "serialize",
        Mode::Deserialize => "deserialize",
    };
    let normalized: String = identifier
        .chars()
        .map(|c| if c == '.' || c == ':' { '_' } else { c })
        .collect();
    format!("{prefix}_{normalized}")
}
