//! JSON Schema validator (spec §4.8, §6.4), grounded in
//! `examples/original_source/API/fleece/JSONSchema.hh`/
//! `examples/original_source/Fleece/API_Impl/JSONSchema.cc`.
//!
//! `JsonSchema` owns its root schema document re-encoded under the
//! singleton shared-key table plus a registry of other schemas
//! registered by URI, guarded by a single `parking_lot::RwLock` exactly
//! the way the original guards `_knownSchemas`/`_regexes` with one
//! mutex: `validate` takes the read side, `add_schema`/`remove_schema`
//! take the write side.
//!
//! Rather than storing a `Value<'a>` field directly (which would make
//! `JsonSchema` self-referential), the root and every registered
//! document are kept as owned bytes and a `Value` is re-derived on
//! demand via [`crate::validator::from_trusted_data`] — an `O(1)` walk
//! since this crate's own encoder produced the bytes.

mod keywords;
mod refs;

use crate::encoder::EncoderOptions;
use crate::error::{Error, Result};
use crate::path::Component;
use crate::validator::from_trusted_data;
use crate::value::{dict::DictKey, Kind, Value};
use keywords::{check, CheckContext};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;

/// Mirrors the original's 17-variant `Error` enum (minus `ok`, which
/// this crate expresses as `Validation::is_ok()` instead of a variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Invalid,
    TypeMismatch,
    OutOfRange,
    NotMultiple,
    TooShort,
    TooLong,
    PatternMismatch,
    MissingProperty,
    UnknownProperty,
    NotEnum,
    TooFew,
    TooMany,
    NotNot,
    NotUnique,
    InvalidUtf8,
}

/// A validation failure, with all schema-derived diagnostic data
/// rendered to owned strings at the point the schema's read lock is
/// released — only `failing_value` keeps a borrow, into the document
/// the caller passed to [`JsonSchema::validate`].
#[derive(Debug)]
pub struct ValidationFailure<'d> {
    pub kind: ErrorKind,
    pub failing_value: Value<'d>,
    pub failing_path: String,
    pub schema_fragment: String,
    pub schema_uri: String,
}

/// The result of one [`JsonSchema::validate`] call, named to mirror the
/// original's `JSONSchema::Validation`.
pub struct Validation<'d> {
    failure: Option<ValidationFailure<'d>>,
}

impl<'d> Validation<'d> {
    pub fn ok(&self) -> bool {
        self.failure.is_none()
    }

    pub fn error(&self) -> Option<&ValidationFailure<'d>> {
        self.failure.as_ref()
    }

    pub fn into_error(self) -> Option<ValidationFailure<'d>> {
        self.failure
    }
}

struct Inner {
    known: HashMap<String, Vec<u8>>,
    patterns: HashMap<String, Regex>,
}

/// An owning root schema plus a registry of other schemas it may
/// `$ref` (spec §4.8).
pub struct JsonSchema {
    bytes: Vec<u8>,
    uri: String,
    inner: RwLock<Inner>,
}

impl JsonSchema {
    /// Parses `json` as the root schema, optionally under `id_uri` (an
    /// empty string means the root has no URI of its own — `$ref`s
    /// into it must use JSON-Pointer fragments only).
    pub fn from_json(json: &str, id_uri: &str) -> Result<Self> {
        let bytes = crate::json::encode_json(json, EncoderOptions::default())?;
        Self::from_bytes(bytes, id_uri)
    }

    fn from_bytes(bytes: Vec<u8>, id_uri: &str) -> Result<Self> {
        let root = from_trusted_data(&bytes)?;
        keywords::scan_schema(root)?;
        let uri = root
            .as_dict()
            .and_then(|d| d.get("$id"))
            .and_then(|v| v.as_string())
            .map(String::from)
            .unwrap_or_else(|| id_uri.to_string());
        let patterns = collect_patterns(root)?;
        Ok(JsonSchema {
            bytes,
            uri,
            inner: RwLock::new(Inner {
                known: HashMap::new(),
                patterns,
            }),
        })
    }

    pub fn root_uri(&self) -> &str {
        &self.uri
    }

    /// Registers `json` as a subschema reachable by `$ref` under
    /// `id_uri` (or its own `$id`, if it declares one and `id_uri` is
    /// empty). Takes the exclusive side of the lock.
    pub fn add_schema(&self, json: &str, id_uri: &str) -> Result<()> {
        let bytes = crate::json::encode_json(json, EncoderOptions::default())?;
        let root = from_trusted_data(&bytes)?;
        keywords::scan_schema(root)?;
        let uri = root
            .as_dict()
            .and_then(|d| d.get("$id"))
            .and_then(|v| v.as_string())
            .map(String::from)
            .unwrap_or_else(|| id_uri.to_string());
        if uri.is_empty() {
            return Err(Error::SchemaInvalid(
                "add_schema requires an id_uri or a schema-declared $id".into(),
            ));
        }
        let new_patterns = collect_patterns(root)?;
        let mut inner = self.inner.write();
        inner.patterns.extend(new_patterns);
        inner.known.insert(uri, bytes);
        Ok(())
    }

    /// Un-registers a previously-added schema. Returns `true` if it was
    /// present (spec scenario 6's "un-register, retry" step).
    pub fn remove_schema(&self, uri: &str) -> bool {
        self.inner.write().known.remove(uri).is_some()
    }

    /// Validates `document` against this schema, reporting the first
    /// failing value only (spec §4.8). Takes the shared side of the
    /// lock for the whole call, matching the original's
    /// `shared_lock lock(_impl->_mutex)` scope.
    pub fn validate<'d>(&self, document: Value<'d>) -> Result<Validation<'d>> {
        let guard = self.inner.read();
        let known: HashMap<String, &[u8]> = guard
            .known
            .iter()
            .map(|(k, v)| (k.clone(), v.as_slice()))
            .collect();
        let lookup = SchemaLookup {
            root_bytes: &self.bytes,
            root_uri: self.uri.clone(),
            known,
            patterns: guard.patterns.clone(),
        };
        let root_schema = from_trusted_data(&self.bytes)?;
        let mut ctx = CheckContext {
            lookup: &lookup,
            path: Vec::new(),
            base_uri: self.uri.clone(),
        };
        match check(&mut ctx, root_schema, document)? {
            Ok(()) => Ok(Validation { failure: None }),
            Err(f) => Ok(Validation {
                failure: Some(ValidationFailure {
                    kind: f.kind,
                    failing_value: f.failing_value,
                    failing_path: render_path(&f.path),
                    schema_fragment: f.schema_fragment.to_json().unwrap_or_default(),
                    schema_uri: f.schema_uri,
                }),
            }),
        }
    }
}

fn render_path(components: &[Component]) -> String {
    let mut out = String::from("$");
    for c in components {
        match c {
            Component::Key(k) => {
                out.push('.');
                out.push_str(k);
            }
            Component::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// A per-`validate()`-call view joining the root document, registered
/// subschemas, and the precompiled regex cache into one place
/// `keywords::check` can query without caring which came from where.
pub(crate) struct SchemaLookup<'a> {
    root_bytes: &'a [u8],
    root_uri: String,
    known: HashMap<String, &'a [u8]>,
    patterns: HashMap<String, Regex>,
}

impl<'a> SchemaLookup<'a> {
    /// Builds a lookup with no registered subschemas, used directly by
    /// `keywords`'s own unit tests.
    #[cfg(test)]
    pub(crate) fn new(root_bytes: &'a [u8]) -> Self {
        let root = from_trusted_data(root_bytes).expect("test schema bytes must be valid");
        let root_uri = root
            .as_dict()
            .and_then(|d| d.get("$id"))
            .and_then(|v| v.as_string())
            .unwrap_or("")
            .to_string();
        let patterns = collect_patterns(root).expect("test schema patterns must compile");
        SchemaLookup {
            root_bytes,
            root_uri,
            known: HashMap::new(),
            patterns,
        }
    }

    pub(crate) fn document(&self, uri: &str) -> Option<Value<'a>> {
        if uri.is_empty() || uri == self.root_uri {
            return from_trusted_data(self.root_bytes).ok();
        }
        self.known
            .get(uri)
            .and_then(|bytes| from_trusted_data(bytes).ok())
    }

    pub(crate) fn known_uris(&self) -> Vec<String> {
        let mut out = vec![self.root_uri.clone()];
        out.extend(self.known.keys().cloned());
        out
    }

    pub(crate) fn regex_for(&self, pattern: &str) -> Result<&Regex> {
        self.patterns
            .get(pattern)
            .ok_or_else(|| Error::SchemaInvalid(format!("pattern not precompiled: {}", pattern)))
    }
}

/// Walks `schema` collecting every `pattern`/`patternProperties` regex
/// so they can be compiled once at load time (spec §4.8's "compiled
/// regex cache... populated at schema-load time, read-only
/// thereafter").
fn collect_patterns(schema: Value) -> Result<HashMap<String, Regex>> {
    let mut out = HashMap::new();
    collect_patterns_into(schema, &mut out)?;
    Ok(out)
}

fn collect_patterns_into(schema: Value, out: &mut HashMap<String, Regex>) -> Result<()> {
    if schema.kind() != Kind::Dict {
        return Ok(());
    }
    let dict = schema.as_dict().unwrap();
    if let Some(pat) = dict.get("pattern").and_then(|v| v.as_string()) {
        compile_pattern(pat, out)?;
    }
    if let Some(pp) = dict.get("patternProperties").and_then(|v| v.as_dict()) {
        for (key, sub) in pp.iter() {
            if let DictKey::Str(pat) = key {
                compile_pattern(pat, out)?;
            }
            collect_patterns_into(sub, out)?;
        }
    }
    for key in [
        "not",
        "if",
        "then",
        "else",
        "items",
        "contains",
        "propertyNames",
        "additionalProperties",
    ] {
        if let Some(sub) = dict.get(key) {
            if sub.kind() == Kind::Dict {
                collect_patterns_into(sub, out)?;
            }
        }
    }
    for key in ["allOf", "anyOf", "oneOf", "prefixItems"] {
        if let Some(arr) = dict.get(key).and_then(|v| v.as_array()) {
            for item in arr.iter() {
                collect_patterns_into(item, out)?;
            }
        }
    }
    for key in ["properties", "$defs", "definitions"] {
        if let Some(sub) = dict.get(key).and_then(|v| v.as_dict()) {
            for (_, v) in sub.iter() {
                collect_patterns_into(v, out)?;
            }
        }
    }
    Ok(())
}

fn compile_pattern(pattern: &str, out: &mut HashMap<String, Regex>) -> Result<()> {
    if out.contains_key(pattern) {
        return Ok(());
    }
    let re = Regex::new(pattern)
        .map_err(|e| Error::SchemaInvalid(format!("bad regex '{}': {}", pattern, e)))?;
    out.insert(pattern.to_string(), re);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_nested_object_scenario() {
        let schema = JsonSchema::from_json(
            r#"{"type":"object","properties":{"str":{"type":"string"},"arr":{"items":{"enum":[1,2]}}}}"#,
            "",
        )
        .unwrap();
        let ok_bytes = crate::json::encode_json(r#"{"str":"hi","arr":[1,2]}"#, EncoderOptions::default()).unwrap();
        let ok_root = from_trusted_data(&ok_bytes).unwrap();
        assert!(schema.validate(ok_root).unwrap().ok());

        let bad_bytes =
            crate::json::encode_json(r#"{"str":"hi","arr":[1,2,3.5]}"#, EncoderOptions::default()).unwrap();
        let bad_root = from_trusted_data(&bad_bytes).unwrap();
        let result = schema.validate(bad_root).unwrap();
        assert!(!result.ok());
        let err = result.error().unwrap();
        assert_eq!(err.kind, ErrorKind::NotEnum);
        assert_eq!(err.failing_path, "$.arr[2]");
    }

    #[test]
    fn ref_resolution_and_unregister_scenario() {
        let schema = JsonSchema::from_json(r#"{"$ref":"http://x/y"}"#, "").unwrap();
        schema
            .add_schema(r#"{"$id":"http://x/y","type":"integer"}"#, "http://x/y")
            .unwrap();

        let bytes = crate::json::encode_json(r#""hi""#, EncoderOptions::default()).unwrap();
        let root = from_trusted_data(&bytes).unwrap();
        let result = schema.validate(root).unwrap();
        assert!(!result.ok());
        assert_eq!(result.error().unwrap().kind, ErrorKind::TypeMismatch);

        assert!(schema.remove_schema("http://x/y"));
        let err = schema.validate(root).unwrap_err();
        assert!(matches!(err, Error::UnknownSchemaRef { uri } if uri == "http://x/y"));
    }

    #[test]
    fn unsupported_keyword_rejected_at_load() {
        let err = JsonSchema::from_json(r#"{"format":"email"}"#, "").unwrap_err();
        assert!(matches!(err, Error::SchemaUnsupported(_)));
    }
}
