#![warn(missing_docs)]

//! `compactdoc`: a self-describing, random-access binary document
//! format — tagged values, variable-width backward pointers, shared-key
//! dict compression, and a copy-on-write mutable overlay — plus the two
//! subsystems built on top of it: a JSON interchange layer and a JSON
//! Schema validator.
//!
//! ## Layout
//!
//! - [`byteio`] — endian-safe scalar reads and a sequential byte cursor,
//!   the lowest layer every other module goes through.
//! - [`value`] — the decoder: interpret a byte at a known address as a
//!   tagged value, dereference pointers, iterate arrays/dicts.
//! - [`validator`] — walk an untrusted buffer once, bounds- and
//!   UTF-8-checking every reachable address, before any [`value::Value`]
//!   is handed to a caller.
//! - [`writer`] / [`encoder`] — the single-writer encoder: a fixed-depth
//!   stack of open collections that emits narrow or wide slots once each
//!   collection's width is known.
//! - [`sharedkeys`] — the shared-key table dict keys are compressed
//!   against.
//! - [`mutable`] — a copy-on-write overlay that lets an application edit
//!   a loaded document and emit a delta referring back to the original
//!   bytes.
//! - [`path`] — key-path expressions (`foo.bar[2]`) used to report
//!   where a JSON Schema check failed.
//! - [`json`] — JSON interchange: parse JSON text into an encoded
//!   document (dumping back to JSON lives on [`value::Value`] directly).
//! - [`jsonschema`] — a JSON Schema 2020-12 validator over decoded
//!   documents.
//!
//! See `DESIGN.md` in the repository root for how each module is
//! grounded and why its dependencies were chosen.

pub mod byteio;
pub mod encoder;
pub mod error;
pub mod format;
pub mod json;
pub mod jsonschema;
pub mod mutable;
pub mod path;
pub mod sharedkeys;
pub mod validator;
pub mod value;
pub mod writer;

/// Common imports for working with `compactdoc` documents.
pub mod prelude {
    pub use crate::encoder::{Encoder, EncoderOptions};
    pub use crate::error::{Error, Result};
    pub use crate::jsonschema::{ErrorKind, JsonSchema, Validation, ValidationFailure};
    pub use crate::path::Path;
    pub use crate::validator::{from_trusted_data, validate};
    pub use crate::value::{Kind, NumberKind, Value};
}
