//! Intermediate representation for compiled codecs
//!
//! The generator lowers a schema into a tree of `Stmt` values instead
//! of pasting source text together. Backends then either interpret the
//! tree directly or render it to source for an external compiler. The
//! two directions share one statement enum; `Mode` records which
//! direction an auxiliary function body was generated for.

use crate::schema::{LogicalSchema, Primitive};
use crate::value::Datum;

use super::TypeGuard;

/// A structured path into the value being serialized or deserialized.
///
/// `base` names a bound variable ("data" for the top-level value, or a
/// loop variable); `segs` walk record fields and keyed map entries from
/// there. Rendered only for error messages and source output, never
/// re-parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub base: String,
    pub segs: Vec<Seg>,
}

/// One step of a `Location` path.
#[derive(Debug, Clone, PartialEq)]
pub enum Seg {
    /// A record field, by name.
    Field(String),
    /// A map entry whose key is held in the named variable.
    Key(String),
}

impl Location {
    /// The path consisting of just a bound variable.
    pub fn root(base: impl Into<String>) -> Location {
        Location {
            base: base.into(),
            segs: Vec::new(),
        }
    }

    /// Extend the path by a record field.
    pub fn field(&self, name: &str) -> Location {
        let mut segs = self.segs.clone();
        segs.push(Seg::Field(name.to_string()));
        Location {
            base: self.base.clone(),
            segs,
        }
    }

    /// Extend the path by a map entry keyed by the named variable.
    pub fn keyed(&self, key_var: &str) -> Location {
        let mut segs = self.segs.clone();
        segs.push(Seg::Key(key_var.to_string()));
        Location {
            base: self.base.clone(),
            segs,
        }
    }

    /// Human-readable path, e.g. `data.header.id` or `data.tags[k_0]`.
    pub fn render(&self) -> String {
        let mut out = self.base.clone();
        for seg in &self.segs {
            match seg {
                Seg::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                Seg::Key(var) => {
                    out.push('[');
                    out.push_str(var);
                    out.push(']');
                }
            }
        }
        out
    }
}

/// A serialize-time branch condition: the value at `at` satisfies the
/// type guard. An absent location satisfies only the null guard.
#[derive(Debug, Clone, PartialEq)]
pub struct Cond {
    pub guard: TypeGuard,
    pub at: Location,
}

/// One lowered statement. Serialize-direction statements write into the
/// output buffer; deserialize-direction statements consume the input
/// cursor and build up the target value.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    // ==== serialize direction ====
    /// Null writes no bytes; the statement exists so every union arm
    /// and field has an explicit encoder.
    WriteNull,
    /// Encode the primitive value at `value`.
    WritePrimitive { primitive: Primitive, value: Location },
    /// Write a long literal, used for union indexes and block counts.
    WriteLongLit(i64),
    /// Write exactly `size` raw bytes from the buffer at `value`.
    WriteFixed { size: usize, value: Location },
    /// Write the zig-zag index of the symbol at `value`.
    WriteEnum {
        symbols: Vec<String>,
        value: Location,
    },
    /// Run the logical preparation step, then encode the raw type.
    WriteLogical {
        spec: LogicalSchema,
        value: Location,
    },
    /// Encode every element of the array at `over` as one block,
    /// followed by the zero terminator. `item` is bound per element
    /// for the body.
    SerializeArray {
        over: Location,
        item: String,
        body: Vec<Stmt>,
    },
    /// Encode every entry of the map at `over` as one block. Each key
    /// string is written, then the body runs with `key` bound; the
    /// entry value is addressed as `over[key]`.
    SerializeMap {
        over: Location,
        key: String,
        body: Vec<Stmt>,
    },
    /// Move buffered bytes onto the output stream. Emitted before a
    /// cycle-breaking call so the callee's bytes land in order.
    Flush,
    /// Invoke a serialize auxiliary function on the value at `arg`.
    CallSerialize { function: String, arg: Location },
    /// Install `default` at `target` when the location is absent or
    /// null, before its encoder runs.
    DefaultIfMissing { target: Location, default: Datum },
    /// First arm whose condition holds runs; with no match,
    /// `otherwise` runs.
    Branch {
        arms: Vec<(Cond, Vec<Stmt>)>,
        otherwise: Vec<Stmt>,
    },
    /// Serialization reached a value no union alternative accepts.
    Fail { location: String },

    // ==== deserialize direction ====
    /// Decode a primitive into `target`.
    ReadPrimitive {
        primitive: Primitive,
        target: Location,
    },
    /// Read exactly `size` raw bytes into `target`.
    ReadFixed { size: usize, target: Location },
    /// Read a zig-zag index and store the named symbol at `target`.
    ReadEnum {
        symbols: Vec<String>,
        target: Location,
    },
    /// Decode the raw type, then run the logical conversion.
    ReadLogical {
        spec: LogicalSchema,
        target: Location,
    },
    /// Bind an empty record at `target` before its fields decode.
    NewRecord { target: Location },
    /// Decode block-encoded array items into `target`; the body fills
    /// the variable named `item` once per element.
    DeserializeArray {
        target: Location,
        item: String,
        body: Vec<Stmt>,
    },
    /// Decode block-encoded map entries into `target`; each entry's
    /// key lands in the variable named `key`, the body fills
    /// `target[key]`.
    DeserializeMap {
        target: Location,
        key: String,
        body: Vec<Stmt>,
    },
    /// Invoke a deserialize auxiliary function, storing its result at
    /// `target`.
    CallDeserialize { function: String, target: Location },
    /// Read a union index and run the matching arm's statements.
    ReadUnion {
        arms: Vec<Vec<Stmt>>,
        location: String,
    },
}

/// Which direction an auxiliary function body runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serialize,
    Deserialize,
}

/// A standalone function generated to break a reference cycle. The
/// body serializes or deserializes one named schema; call sites reach
/// it by name, which bounds recursion by the depth of the value rather
/// than the (infinite) depth of the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxFn {
    pub name: String,
    pub mode: Mode,
    pub body: Vec<Stmt>,
}

/// Everything generated for one top-level schema: the two entry bodies
/// plus any auxiliary functions cycles forced out.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedModule {
    pub identifier: String,
    pub serialize: Vec<Stmt>,
    pub deserialize: Vec<Stmt>,
    pub aux: Vec<AuxFn>,
}

impl GeneratedModule {
    /// Look up an auxiliary function by name and direction.
    pub fn aux_fn(&self, name: &str, mode: Mode) -> Option<&AuxFn> {
        self.aux
            .iter()
            .find(|f| f.name == name && f.mode == mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_render_fields() {
        let loc = Location::root("data").field("header").field("id");
        assert_eq!(loc.render(), "data.header.id");
    }

    #[test]
    fn test_location_render_keyed() {
        let loc = Location::root("data").field("tags").keyed("k_0");
        assert_eq!(loc.render(), "data.tags[k_0]");
    }

    #[test]
    fn test_location_extension_leaves_parent_untouched() {
        let parent = Location::root("data").field("a");
        let child = parent.field("b");
        assert_eq!(parent.render(), "data.a");
        assert_eq!(child.render(), "data.a.b");
    }

    #[test]
    fn test_aux_lookup_respects_mode() {
        let module = GeneratedModule {
            identifier: "demo.Node".into(),
            serialize: Vec::new(),
            deserialize: Vec::new(),
            aux: vec![
                AuxFn {
                    name: "serialize_demo_node".into(),
                    mode: Mode::Serialize,
                    body: Vec::new(),
                },
                AuxFn {
                    name: "deserialize_demo_node".into(),
                    mode: Mode::Deserialize,
                    body: Vec::new(),
                },
            ],
        };
        assert!(module.aux_fn("serialize_demo_node", Mode::Serialize).is_some());
        assert!(module.aux_fn("serialize_demo_node", Mode::Deserialize).is_none());
    }
}
