//! Avroc: Avro schema-to-codec compiler
//!
//! Compiles Avro JSON schemas into specialized serializers and
//! deserializers for the Avro binary encoding, substantially faster
//! than walking the schema per value.
//!
//! ## Features
//!
//! - **Schema Store**: registered schemas with nested-name promotion,
//!   local-name shadowing and forward references
//! - **Cycle Detection**: recursive and mutually recursive schemas are
//!   compiled into terminating codecs
//! - **Structured Lowering**: schemas lower to an IR that backends
//!   interpret in-process or render to source
//! - **Logical Types**: decimal, date, time, timestamp and uuid with
//!   their wire conversions
//! - **Defaults**: field defaults are injected for absent values at
//!   serialization time
//!
//! ## Usage
//!
//! ```no_run
//! use avroc::{CodecRegistry, Datum};
//! use serde_json::json;
//!
//! let mut registry = CodecRegistry::new();
//! registry.register("demo.User", &json!({
//!     "type": "record", "name": "User", "namespace": "demo",
//!     "fields": [{"name": "id", "type": "long"}]
//! })).unwrap();
//! let codec = registry.compile("demo.User").unwrap();
//! let bytes = codec.serialize(&Datum::record([("id", Datum::Long(7))])).unwrap();
//! assert_eq!(codec.deserialize(&bytes).unwrap().kind(), "record");
//! ```

pub mod backend;
pub mod codegen;
pub mod constraints;
pub mod error;
pub mod graph;
pub mod logical;
pub mod registry;
pub mod schema;
pub mod store;
pub mod value;
pub mod wire;

pub use backend::{Codec, CompilerBackend, IrBackend};
pub use error::{CodecError, Result, SchemaError};
pub use registry::CodecRegistry;
pub use schema::SchemaNode;
pub use store::SchemaStore;
pub use value::Datum;
