//! Avro binary wire primitives
//!
//! The write side accumulates into an in-memory buffer that is flushed
//! to the output in one go; cycle-breaker call sites flush early so
//! auxiliary functions append in stream order. The read side consumes a
//! `&mut &[u8]` cursor that advances past each decoded value.

pub mod reader;
pub mod writer;

pub use reader::{
    read_boolean, read_bytes, read_double, read_fixed, read_float, read_int, read_long, read_null,
    read_string,
};
pub use writer::{
    write_boolean, write_bytes, write_double, write_fixed, write_float, write_int, write_long,
    write_null, write_string, OutputBuffer,
};
