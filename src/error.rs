//! Error types for schema compilation and compiled codecs

use thiserror::Error;

/// Result type for schema registration and code generation
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Generation-time errors. All of these are fatal for the enclosing
/// top-level schema: there is no partial or best-effort compilation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown schema: {0} is not registered and not defined locally")]
    UnknownSchema(String),

    #[error("unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("invalid constraint: cannot build a type guard for {0}")]
    InvalidConstraint(String),

    #[error("malformed schema: {0}")]
    Generation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime errors raised by a compiled codec while encoding or
/// decoding a payload. Generation-layer errors can never surface
/// here: a codec only exists once its schema compiled fully.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("varint exceeds 10 bytes")]
    InvalidVarint,

    #[error("invalid boolean byte: {0:#04x}")]
    InvalidBoolean(u8),

    #[error("negative length prefix: {0}")]
    NegativeLength(i64),

    #[error("integer {0} does not fit in an Avro int")]
    IntOverflow(i64),

    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    #[error("enum value {value:?} is not one of the declared symbols")]
    UnknownEnumSymbol { value: String },

    #[error("union index {index} out of range for {arms} alternatives")]
    InvalidUnionIndex { index: i64, arms: usize },

    #[error("value at {location} matches no union alternative")]
    NoUnionBranch { location: String },

    #[error("expected {expected} at {location}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        location: String,
    },

    #[error("fixed value at {location} is {found} bytes, schema requires {size}")]
    FixedSizeMismatch {
        size: usize,
        found: usize,
        location: String,
    },

    #[error("missing field at {0}")]
    MissingField(String),

    #[error("logical value out of range: {0}")]
    LogicalOutOfRange(String),

    #[error("invalid uuid string: {0}")]
    InvalidUuid(String),
}
