//! Primary error type used by the library.
//!
//! Every fallible operation in `compactdoc` returns one of the flat,
//! stable kinds below rather than a free-form message. Callers that need
//! to recover structured data out of a failure (the offending path, the
//! unresolved schema URI, ...) can match on the variant instead of
//! parsing a string.

use std::string::FromUtf8Error;

/// Stable error kinds returned by `compactdoc` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Allocation failed (growing a [`crate::writer::Writer`] past its cap).
    #[error("out of memory")]
    Memory,

    /// An iterator ran past its end, a pointer exceeded 31 bits, or a
    /// slot index was out of bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Bytes failed validation: bad alignment, a forward pointer, NaN,
    /// a malformed varint, or invalid UTF-8 where length matters.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Encoder events were issued out of order, a collection was left
    /// unclosed at `finish`, or a dict key was neither a string nor an
    /// integer.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Malformed JSON source; `position` is the byte offset if known.
    #[error("json error at {position}: {message}")]
    JsonError { message: String, position: usize },

    /// A tag/byte pattern this version of the format doesn't assign.
    #[error("unknown value tag: {0:#x}")]
    UnknownValue(u8),

    /// A key-path expression (`src/path.rs`) failed to parse.
    #[error("bad path syntax: {0}")]
    PathSyntax(String),

    /// A schema document violates JSON Schema's own rules.
    #[error("invalid schema: {0}")]
    SchemaInvalid(String),

    /// A schema uses a keyword this implementation does not support.
    #[error("unsupported schema keyword: {0}")]
    SchemaUnsupported(String),

    /// A `$ref` target has not been registered. The caller may register
    /// the target under this URI and retry.
    #[error("unknown schema ref: {uri}")]
    UnknownSchemaRef { uri: String },
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error::InvalidData(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Error {
        Error::InvalidData(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
