//! Compiler backends
//!
//! `CompilerBackend` is the seam between lowering and execution: it
//! turns a `GeneratedModule` into a ready `Codec`. `IrBackend` is the
//! in-process implementation, walking the statement tree directly. A
//! native backend would render the module to source and dynamically
//! load the compiled artifact behind the same trait.

use std::collections::HashMap;
use std::sync::Arc;

use crate::codegen::ir::{Cond, GeneratedModule, Location, Mode, Seg, Stmt};
use crate::error::{CodecError, Result, SchemaError};
use crate::logical;
use crate::schema::Primitive;
use crate::value::Datum;
use crate::wire::{reader, writer, OutputBuffer};

/// Turns a lowered module into an executable codec.
pub trait CompilerBackend {
    fn compile(&self, module: &GeneratedModule) -> Result<Codec>;
}

/// Backend that interprets the IR without any compilation step.
#[derive(Default)]
pub struct IrBackend;

impl CompilerBackend for IrBackend {
    fn compile(&self, module: &GeneratedModule) -> Result<Codec> {
        validate_module(module)?;
        Ok(Codec {
            module: Arc::new(module.clone()),
        })
    }
}

/// An executable serializer/deserializer pair for one schema.
#[derive(Clone, Debug)]
pub struct Codec {
    module: Arc<GeneratedModule>,
}

impl Codec {
    pub fn identifier(&self) -> &str {
        &self.module.identifier
    }

    /// Encode `datum` to Avro binary. The input is copied once so
    /// default injection can fill absent fields without touching the
    /// caller's value.
    pub fn serialize(&self, datum: &Datum) -> std::result::Result<Vec<u8>, CodecError> {
        let mut interp = Interp::new(&self.module);
        interp.vars.insert("data".to_string(), datum.clone());
        let mut buffer = OutputBuffer::new();
        interp.exec_serialize(&self.module.serialize, &mut buffer)?;
        Ok(buffer.into_bytes())
    }

    /// Decode one value from `bytes`. Trailing bytes are not an error;
    /// the cursor simply stops after the value.
    pub fn deserialize(&self, bytes: &[u8]) -> std::result::Result<Datum, CodecError> {
        let mut interp = Interp::new(&self.module);
        interp.vars.insert("data".to_string(), Datum::Null);
        let mut cursor = bytes;
        interp.exec_deserialize(&self.module.deserialize, &mut cursor)?;
        Ok(interp
            .vars
            .remove("data")
            .expect("bound before execution"))
    }
}

/// Reject modules with dangling auxiliary calls or statements on the
/// wrong side, so the interpreter can rely on both.
fn validate_module(module: &GeneratedModule) -> Result<()> {
    check_stmts(module, &module.serialize, Mode::Serialize)?;
    check_stmts(module, &module.deserialize, Mode::Deserialize)?;
    for aux in &module.aux {
        check_stmts(module, &aux.body, aux.mode)?;
    }
    Ok(())
}

fn check_stmts(module: &GeneratedModule, stmts: &[Stmt], mode: Mode) -> Result<()> {
    for stmt in stmts {
        let direction = match stmt {
            Stmt::WriteNull
            | Stmt::WritePrimitive { .. }
            | Stmt::WriteLongLit(_)
            | Stmt::WriteFixed { .. }
            | Stmt::WriteEnum { .. }
            | Stmt::WriteLogical { .. }
            | Stmt::Flush
            | Stmt::DefaultIfMissing { .. }
            | Stmt::Fail { .. } => Mode::Serialize,
            Stmt::ReadPrimitive { .. }
            | Stmt::ReadFixed { .. }
            | Stmt::ReadEnum { .. }
            | Stmt::ReadLogical { .. }
            | Stmt::NewRecord { .. } => Mode::Deserialize,
            Stmt::SerializeArray { body, .. } | Stmt::SerializeMap { body, .. } => {
                check_stmts(module, body, Mode::Serialize)?;
                Mode::Serialize
            }
            Stmt::DeserializeArray { body, .. } | Stmt::DeserializeMap { body, .. } => {
                check_stmts(module, body, Mode::Deserialize)?;
                Mode::Deserialize
            }
            Stmt::Branch { arms, otherwise } => {
                for (_, body) in arms {
                    check_stmts(module, body, mode)?;
                }
                check_stmts(module, otherwise, mode)?;
                mode
            }
            Stmt::ReadUnion { arms, .. } => {
                for body in arms {
                    check_stmts(module, body, Mode::Deserialize)?;
                }
                Mode::Deserialize
            }
            Stmt::CallSerialize { function, .. } => {
                if module.aux_fn(function, Mode::Serialize).is_none() {
                    return Err(SchemaError::Generation(format!(
                        "call to undefined serialize function {function}"
                    )));
                }
                Mode::Serialize
            }
            Stmt::CallDeserialize { function, .. } => {
                if module.aux_fn(function, Mode::Deserialize).is_none() {
                    return Err(SchemaError::Generation(format!(
                        "call to undefined deserialize function {function}"
                    )));
                }
                Mode::Deserialize
            }
        };
        if direction != mode {
            return Err(SchemaError::Generation(format!(
                "statement on the wrong side of the module: {stmt:?}"
            )));
        }
    }
    Ok(())
}

/// One execution of a codec: the module plus bound variables ("data"
/// for the value, loop and key variables for the current scope).
struct Interp<'m> {
    module: &'m GeneratedModule,
    vars: HashMap<String, Datum>,
}

impl<'m> Interp<'m> {
    fn new(module: &'m GeneratedModule) -> Interp<'m> {
        Interp {
            module,
            vars: HashMap::new(),
        }
    }

    // ==== variable scope ====

    /// Bind `name` to `value`, run `f`, restore the previous binding
    /// and hand back the value the variable held when `f` finished.
    fn scoped(
        &mut self,
        name: &str,
        value: Datum,
        f: impl FnOnce(&mut Self) -> std::result::Result<(), CodecError>,
    ) -> std::result::Result<Datum, CodecError> {
        let saved = self.vars.insert(name.to_string(), value);
        let outcome = f(self);
        let current = match saved {
            Some(previous) => self.vars.insert(name.to_string(), previous),
            None => self.vars.remove(name),
        };
        outcome?;
        current.ok_or_else(|| CodecError::MissingField(name.to_string()))
    }

    /// Path segments with map-key variables resolved to their strings.
    fn resolve_path(&self, loc: &Location) -> std::result::Result<Vec<String>, CodecError> {
        loc.segs
            .iter()
            .map(|seg| match seg {
                Seg::Field(name) => Ok(name.clone()),
                Seg::Key(var) => match self.vars.get(var) {
                    Some(Datum::String(key)) => Ok(key.clone()),
                    _ => Err(CodecError::MissingField(var.clone())),
                },
            })
            .collect()
    }

    /// Value at a location, or `None` when a record along the path
    /// does not carry the field.
    fn lookup(&self, loc: &Location) -> std::result::Result<Option<&Datum>, CodecError> {
        let path = self.resolve_path(loc)?;
        let Some(mut current) = self.vars.get(&loc.base) else {
            return Ok(None);
        };
        for step in &path {
            match current {
                Datum::Record(entries) | Datum::Map(entries) => match entries.get(step) {
                    Some(next) => current = next,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Value at a location, required to be present.
    fn fetch(&self, loc: &Location) -> std::result::Result<&Datum, CodecError> {
        self.lookup(loc)?
            .ok_or_else(|| CodecError::MissingField(loc.render()))
    }

    /// Mutable value at a location; every step must already exist.
    fn fetch_mut(&mut self, loc: &Location) -> std::result::Result<&mut Datum, CodecError> {
        let path = self.resolve_path(loc)?;
        let mut current = self
            .vars
            .get_mut(&loc.base)
            .ok_or_else(|| CodecError::MissingField(loc.base.clone()))?;
        for step in &path {
            match current {
                Datum::Record(entries) | Datum::Map(entries) => {
                    current = entries
                        .get_mut(step)
                        .ok_or_else(|| CodecError::MissingField(loc.render()))?;
                }
                other => {
                    return Err(CodecError::TypeMismatch {
                        expected: "record",
                        found: other.kind(),
                        location: loc.render(),
                    })
                }
            }
        }
        Ok(current)
    }

    /// Store `value` at a location, creating the final record entry
    /// when absent. Intermediate steps must already exist.
    fn store(&mut self, loc: &Location, value: Datum) -> std::result::Result<(), CodecError> {
        let Some((_, parents)) = loc.segs.split_last() else {
            self.vars.insert(loc.base.clone(), value);
            return Ok(());
        };
        let parent = Location {
            base: loc.base.clone(),
            segs: parents.to_vec(),
        };
        let path = self.resolve_path(loc)?;
        let last = path.last().expect("segments are non-empty").clone();
        match self.fetch_mut(&parent)? {
            Datum::Record(entries) | Datum::Map(entries) => {
                entries.insert(last, value);
                Ok(())
            }
            other => Err(CodecError::TypeMismatch {
                expected: "record",
                found: other.kind(),
                location: loc.render(),
            }),
        }
    }

    // ==== serialize direction ====

    fn exec_serialize(
        &mut self,
        stmts: &[Stmt],
        buffer: &mut OutputBuffer,
    ) -> std::result::Result<(), CodecError> {
        for stmt in stmts {
            self.serialize_stmt(stmt, buffer)?;
        }
        Ok(())
    }

    fn serialize_stmt(
        &mut self,
        stmt: &Stmt,
        buffer: &mut OutputBuffer,
    ) -> std::result::Result<(), CodecError> {
        match stmt {
            Stmt::WriteNull => writer::write_null(buffer.buf()),
            Stmt::WriteLongLit(literal) => writer::write_long(buffer.buf(), *literal),
            Stmt::WritePrimitive { primitive, value } => {
                let datum = self.fetch(value)?;
                let mismatch = || CodecError::TypeMismatch {
                    expected: primitive.name(),
                    found: datum.kind(),
                    location: value.render(),
                };
                match (primitive, datum) {
                    (Primitive::Null, _) => {}
                    (Primitive::Boolean, Datum::Boolean(v)) => {
                        writer::write_boolean(buffer.buf(), *v)
                    }
                    (Primitive::Int, Datum::Int(v)) => writer::write_int(buffer.buf(), *v),
                    (Primitive::Long, Datum::Long(v)) => writer::write_long(buffer.buf(), *v),
                    (Primitive::Float, Datum::Float(v)) => writer::write_float(buffer.buf(), *v),
                    (Primitive::Double, Datum::Double(v)) => {
                        writer::write_double(buffer.buf(), *v)
                    }
                    (Primitive::Bytes, Datum::Bytes(v)) => writer::write_bytes(buffer.buf(), v),
                    (Primitive::String, Datum::String(v)) => {
                        writer::write_string(buffer.buf(), v)
                    }
                    _ => return Err(mismatch()),
                }
            }
            Stmt::WriteFixed { size, value } => {
                let datum = self.fetch(value)?;
                let Datum::Bytes(bytes) = datum else {
                    return Err(CodecError::TypeMismatch {
                        expected: "bytes",
                        found: datum.kind(),
                        location: value.render(),
                    });
                };
                writer::write_fixed(buffer.buf(), *size, bytes, &value.render())?;
            }
            Stmt::WriteEnum { symbols, value } => {
                let datum = self.fetch(value)?;
                let Datum::String(symbol) = datum else {
                    return Err(CodecError::TypeMismatch {
                        expected: "string",
                        found: datum.kind(),
                        location: value.render(),
                    });
                };
                let index = symbols
                    .iter()
                    .position(|s| s == symbol)
                    .ok_or_else(|| CodecError::UnknownEnumSymbol {
                        value: symbol.clone(),
                    })?;
                writer::write_long(buffer.buf(), index as i64);
            }
            Stmt::WriteLogical { spec, value } => {
                let datum = self.fetch(value)?.clone();
                logical::encode(buffer.buf(), spec, &datum, &value.render())?;
            }
            Stmt::SerializeArray { over, item, body } => {
                let datum = self.fetch(over)?;
                let Datum::Array(elements) = datum else {
                    return Err(CodecError::TypeMismatch {
                        expected: "array",
                        found: datum.kind(),
                        location: over.render(),
                    });
                };
                let elements = elements.clone();
                if !elements.is_empty() {
                    writer::write_long(buffer.buf(), elements.len() as i64);
                    for element in elements {
                        self.scoped(item, element, |interp| {
                            interp.exec_serialize(body, buffer)
                        })?;
                    }
                }
                writer::write_long(buffer.buf(), 0);
            }
            Stmt::SerializeMap { over, key, body } => {
                let datum = self.fetch(over)?;
                let Datum::Map(entries) = datum else {
                    return Err(CodecError::TypeMismatch {
                        expected: "map",
                        found: datum.kind(),
                        location: over.render(),
                    });
                };
                // The body reaches each entry through `over[key]`, so
                // only the keys need to outlive the borrow.
                let keys: Vec<String> = entries.keys().cloned().collect();
                if !keys.is_empty() {
                    writer::write_long(buffer.buf(), keys.len() as i64);
                    for entry_key in keys {
                        writer::write_string(buffer.buf(), &entry_key);
                        self.scoped(key, Datum::String(entry_key), |interp| {
                            interp.exec_serialize(body, buffer)
                        })?;
                    }
                }
                writer::write_long(buffer.buf(), 0);
            }
            Stmt::Flush => buffer.flush(),
            Stmt::CallSerialize { function, arg } => {
                let datum = self.fetch(arg)?.clone();
                let aux = self
                    .module
                    .aux_fn(function, Mode::Serialize)
                    .expect("calls validated during compilation");
                self.scoped("data", datum, |interp| {
                    interp.exec_serialize(&aux.body, buffer)
                })?;
            }
            Stmt::DefaultIfMissing { target, default } => {
                let missing = match self.lookup(target)? {
                    None => true,
                    Some(datum) => datum.is_null(),
                };
                if missing {
                    self.store(target, default.clone())?;
                }
            }
            Stmt::Branch { arms, otherwise } => {
                for (cond, body) in arms {
                    if self.eval(cond)? {
                        return self.exec_serialize(body, buffer);
                    }
                }
                return self.exec_serialize(otherwise, buffer);
            }
            Stmt::Fail { location } => {
                return Err(CodecError::NoUnionBranch {
                    location: location.clone(),
                })
            }
            other => unreachable!("statement direction checked during compilation: {other:?}"),
        }
        Ok(())
    }

    fn eval(&self, cond: &Cond) -> std::result::Result<bool, CodecError> {
        Ok(cond.guard.matches(self.lookup(&cond.at)?))
    }

    // ==== deserialize direction ====

    fn exec_deserialize(
        &mut self,
        stmts: &[Stmt],
        input: &mut &[u8],
    ) -> std::result::Result<(), CodecError> {
        for stmt in stmts {
            self.deserialize_stmt(stmt, input)?;
        }
        Ok(())
    }

    fn deserialize_stmt(
        &mut self,
        stmt: &Stmt,
        input: &mut &[u8],
    ) -> std::result::Result<(), CodecError> {
        match stmt {
            Stmt::ReadPrimitive { primitive, target } => {
                let datum = match primitive {
                    Primitive::Null => {
                        reader::read_null(input)?;
                        Datum::Null
                    }
                    Primitive::Boolean => Datum::Boolean(reader::read_boolean(input)?),
                    Primitive::Int => Datum::Int(reader::read_int(input)?),
                    Primitive::Long => Datum::Long(reader::read_long(input)?),
                    Primitive::Float => Datum::Float(reader::read_float(input)?),
                    Primitive::Double => Datum::Double(reader::read_double(input)?),
                    Primitive::Bytes => Datum::Bytes(reader::read_bytes(input)?),
                    Primitive::String => Datum::String(reader::read_string(input)?),
                };
                self.store(target, datum)?;
            }
            Stmt::ReadFixed { size, target } => {
                let bytes = reader::read_fixed(input, *size)?;
                self.store(target, Datum::Bytes(bytes))?;
            }
            Stmt::ReadEnum { symbols, target } => {
                let index = reader::read_long(input)?;
                let symbol = usize::try_from(index)
                    .ok()
                    .and_then(|i| symbols.get(i))
                    .ok_or_else(|| CodecError::UnknownEnumSymbol {
                        value: format!("#{index}"),
                    })?;
                self.store(target, Datum::String(symbol.clone()))?;
            }
            Stmt::ReadLogical { spec, target } => {
                let datum = logical::decode(input, spec)?;
                self.store(target, datum)?;
            }
            Stmt::NewRecord { target } => {
                self.store(target, Datum::Record(Default::default()))?;
            }
            Stmt::DeserializeArray { target, item, body } => {
                self.store(target, Datum::Array(Vec::new()))?;
                loop {
                    let mut count = reader::read_long(input)?;
                    if count == 0 {
                        break;
                    }
                    if count < 0 {
                        // Negative counts carry the block's byte
                        // length, which a sequential decoder skips.
                        count = -count;
                        reader::read_long(input)?;
                    }
                    for _ in 0..count {
                        let element = self.scoped(item, Datum::Null, |interp| {
                            interp.exec_deserialize(body, input)
                        })?;
                        match self.fetch_mut(target)? {
                            Datum::Array(elements) => elements.push(element),
                            other => {
                                return Err(CodecError::TypeMismatch {
                                    expected: "array",
                                    found: other.kind(),
                                    location: target.render(),
                                })
                            }
                        }
                    }
                }
            }
            Stmt::DeserializeMap { target, key, body } => {
                self.store(target, Datum::Map(Default::default()))?;
                loop {
                    let mut count = reader::read_long(input)?;
                    if count == 0 {
                        break;
                    }
                    if count < 0 {
                        count = -count;
                        reader::read_long(input)?;
                    }
                    for _ in 0..count {
                        // The body stores straight into `target[key]`.
                        let entry_key = reader::read_string(input)?;
                        self.scoped(key, Datum::String(entry_key), |interp| {
                            interp.exec_deserialize(body, input)
                        })?;
                    }
                }
            }
            Stmt::CallDeserialize { function, target } => {
                let aux = self
                    .module
                    .aux_fn(function, Mode::Deserialize)
                    .expect("calls validated during compilation");
                let result = self.scoped("data", Datum::Null, |interp| {
                    interp.exec_deserialize(&aux.body, input)
                })?;
                self.store(target, result)?;
            }
            Stmt::ReadUnion { arms, location: _ } => {
                let index = reader::read_long(input)?;
                let arm = usize::try_from(index)
                    .ok()
                    .and_then(|i| arms.get(i))
                    .ok_or(CodecError::InvalidUnionIndex {
                        index,
                        arms: arms.len(),
                    })?;
                self.exec_deserialize(arm, input)?;
            }
            other => unreachable!("statement direction checked during compilation: {other:?}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen;
    use crate::store::SchemaStore;
    use serde_json::json;

    fn codec_for(identifier: &str, raw: serde_json::Value) -> Codec {
        let mut store = SchemaStore::new();
        store.register(identifier, &raw).unwrap();
        let module = codegen::generate(&store, identifier).unwrap();
        IrBackend.compile(&module).unwrap()
    }

    #[test]
    fn test_single_long_field_bytes() {
        let codec = codec_for(
            "demo.N",
            json!({
                "type": "record", "name": "N", "namespace": "demo",
                "fields": [{"name": "n", "type": "long"}]
            }),
        );
        let datum = Datum::record([("n", Datum::Long(5))]);
        assert_eq!(codec.serialize(&datum).unwrap(), vec![0x0a]);
        assert_eq!(codec.deserialize(&[0x0a]).unwrap(), datum);
    }

    #[test]
    fn test_nested_record_roundtrip() {
        let codec = codec_for(
            "demo.Outer",
            json!({
                "type": "record", "name": "Outer", "namespace": "demo",
                "fields": [
                    {"name": "label", "type": "string"},
                    {"name": "inner", "type": {
                        "type": "record", "name": "Inner",
                        "fields": [{"name": "flag", "type": "boolean"}]
                    }}
                ]
            }),
        );
        let datum = Datum::record([
            ("label", Datum::from("x")),
            ("inner", Datum::record([("flag", Datum::Boolean(true))])),
        ]);
        let bytes = codec.serialize(&datum).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), datum);
    }

    #[test]
    fn test_union_null_keeps_declared_index() {
        let codec = codec_for(
            "demo.Holder",
            json!({
                "type": "record", "name": "Holder", "namespace": "demo",
                "fields": [{"name": "v", "type": ["long", "null", "string"]}]
            }),
        );
        // Null was declared second, so its index is 1 (zig-zag 0x02).
        let datum = Datum::record([("v", Datum::Null)]);
        assert_eq!(codec.serialize(&datum).unwrap(), vec![0x02]);
        // An absent field takes the null branch too.
        let empty = Datum::record::<[(&str, Datum); 0], &str>([]);
        assert_eq!(codec.serialize(&empty).unwrap(), vec![0x02]);
        // The other alternatives keep their declared order.
        let long = Datum::record([("v", Datum::Long(1))]);
        assert_eq!(codec.serialize(&long).unwrap(), vec![0x00, 0x02]);
        assert_eq!(codec.deserialize(&[0x02]).unwrap(), datum);
    }

    #[test]
    fn test_union_no_branch_matches() {
        let codec = codec_for(
            "demo.Holder",
            json!({
                "type": "record", "name": "Holder", "namespace": "demo",
                "fields": [{"name": "v", "type": ["null", "long"]}]
            }),
        );
        let datum = Datum::record([("v", Datum::Float(1.5))]);
        let err = codec.serialize(&datum).unwrap_err();
        assert!(matches!(err, CodecError::NoUnionBranch { location } if location == "data.v"));
    }

    #[test]
    fn test_union_index_out_of_range() {
        let codec = codec_for(
            "demo.Holder",
            json!({
                "type": "record", "name": "Holder", "namespace": "demo",
                "fields": [{"name": "v", "type": ["null", "long"]}]
            }),
        );
        // Index 7 (zig-zag 0x0e) has no alternative.
        let err = codec.deserialize(&[0x0e]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidUnionIndex { index: 7, arms: 2 }
        ));
    }

    #[test]
    fn test_recursive_tree_roundtrip() {
        let codec = codec_for(
            "demo.TreeNode",
            json!({
                "type": "record", "name": "TreeNode", "namespace": "demo",
                "fields": [
                    {"name": "value", "type": "int"},
                    {"name": "children", "type": {"type": "array", "items": "demo.TreeNode"}}
                ]
            }),
        );
        let leaf = |v: i32| {
            Datum::record([("value", Datum::Int(v)), ("children", Datum::Array(vec![]))])
        };
        let tree = Datum::record([
            ("value", Datum::Int(1)),
            (
                "children",
                Datum::Array(vec![
                    Datum::record([
                        ("value", Datum::Int(2)),
                        ("children", Datum::Array(vec![leaf(4), leaf(5)])),
                    ]),
                    leaf(3),
                ]),
            ),
        ]);
        let bytes = codec.serialize(&tree).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), tree);
    }

    #[test]
    fn test_default_injected_for_absent_field() {
        let codec = codec_for(
            "demo.Settings",
            json!({
                "type": "record", "name": "Settings", "namespace": "demo",
                "fields": [{"name": "retries", "type": "int", "default": 0}]
            }),
        );
        let empty = Datum::record::<[(&str, Datum); 0], &str>([]);
        assert_eq!(codec.serialize(&empty).unwrap(), vec![0x00]);
        // Null triggers the default too.
        let null = Datum::record([("retries", Datum::Null)]);
        assert_eq!(codec.serialize(&null).unwrap(), vec![0x00]);
        // A present value wins over the default.
        let present = Datum::record([("retries", Datum::Int(2))]);
        assert_eq!(codec.serialize(&present).unwrap(), vec![0x04]);
    }

    #[test]
    fn test_map_roundtrip() {
        let codec = codec_for(
            "demo.Tags",
            json!({
                "type": "record", "name": "Tags", "namespace": "demo",
                "fields": [{"name": "tags", "type": {"type": "map", "values": "int"}}]
            }),
        );
        let datum = Datum::record([(
            "tags",
            Datum::map([("a", Datum::Int(1)), ("b", Datum::Int(2))]),
        )]);
        let bytes = codec.serialize(&datum).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), datum);
        // Empty maps are just the zero terminator.
        let empty = Datum::record([("tags", Datum::map::<[(&str, Datum); 0], &str>([]))]);
        assert_eq!(codec.serialize(&empty).unwrap(), vec![0x00]);
    }

    #[test]
    fn test_enum_symbol_checked() {
        let codec = codec_for(
            "demo.S",
            json!({
                "type": "record", "name": "S", "namespace": "demo",
                "fields": [{"name": "state", "type": {
                    "type": "enum", "name": "State", "symbols": ["ON", "OFF"]
                }}]
            }),
        );
        let off = Datum::record([("state", Datum::from("OFF"))]);
        assert_eq!(codec.serialize(&off).unwrap(), vec![0x02]);
        assert_eq!(codec.deserialize(&[0x02]).unwrap(), off);
        let bad = Datum::record([("state", Datum::from("HALF"))]);
        assert!(matches!(
            codec.serialize(&bad).unwrap_err(),
            CodecError::UnknownEnumSymbol { .. }
        ));
    }

    #[test]
    fn test_type_mismatch_reports_path() {
        let codec = codec_for(
            "demo.N",
            json!({
                "type": "record", "name": "N", "namespace": "demo",
                "fields": [{"name": "n", "type": "long"}]
            }),
        );
        let datum = Datum::record([("n", Datum::from("five"))]);
        let err = codec.serialize(&datum).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeMismatch { expected: "long", found: "string", location } if location == "data.n"
        ));
    }

    #[test]
    fn test_deserialize_negative_block_count() {
        let codec = codec_for(
            "demo.Nums",
            json!({
                "type": "record", "name": "Nums", "namespace": "demo",
                "fields": [{"name": "xs", "type": {"type": "array", "items": "long"}}]
            }),
        );
        // One block of two items with a byte-length prefix: count -2
        // (zig-zag 0x03), length 2 (0x04), items 1 and 2, terminator.
        let bytes = [0x03, 0x04, 0x02, 0x04, 0x00];
        let datum = codec.deserialize(&bytes).unwrap();
        assert_eq!(
            datum,
            Datum::record([(
                "xs",
                Datum::Array(vec![Datum::Long(1), Datum::Long(2)])
            )])
        );
    }
}
