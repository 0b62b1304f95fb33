//! URI utilities and `$ref` resolution (spec §4.8, §6.4), grounded in
//! `examples/original_source/Fleece/API_Impl/JSONSchema.cc`'s
//! `isAbsoluteURI`/`rootOfAbsoluteURI`/`concatURIs`/`isJSONPointerURI`/
//! `unescapeURI`/`resolveSchemaRef`.

use crate::error::{Error, Result};
use crate::value::Value;

/// True if `uri` has a `scheme:` prefix (`scheme` is letters/digits/`+-.`
/// and doesn't start with a digit), per `isAbsoluteURI`.
pub fn is_absolute_uri(uri: &str) -> bool {
    let bytes = uri.as_bytes();
    let colon = match uri.find(':') {
        Some(i) if i > 0 => i,
        _ => return false,
    };
    if bytes[0].is_ascii_digit() {
        return false;
    }
    bytes[..colon]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
}

/// The scheme+authority+path part of an absolute URI, without a
/// trailing `#fragment`, per `rootOfAbsoluteURI`.
pub fn root_of_absolute_uri(uri: &str) -> &str {
    match uri.find('#') {
        Some(i) => &uri[..i],
        None => uri,
    }
}

/// Resolves `relative` against `base`. An absolute `relative` is
/// returned unchanged; a fragment-only `relative` (starting with `#`)
/// is appended to `base`'s root; otherwise `relative` replaces
/// `base`'s last path segment, per `concatURIs`.
pub fn concat_uris(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    if is_absolute_uri(relative) {
        return relative.to_string();
    }
    if let Some(rest) = relative.strip_prefix('#') {
        return format!("{}#{}", root_of_absolute_uri(base), rest);
    }
    let root = root_of_absolute_uri(base);
    match root.rfind('/') {
        Some(i) => format!("{}/{}", &root[..i], relative),
        None => relative.to_string(),
    }
}

/// True if `uri`'s fragment (the part after `#`) is a JSON-Pointer,
/// i.e. empty or starting with `/`, per `isJSONPointerURI`.
pub fn is_json_pointer_uri(uri: &str) -> bool {
    match uri.find('#') {
        Some(i) => {
            let frag = &uri[i + 1..];
            frag.is_empty() || frag.starts_with('/')
        }
        None => false,
    }
}

/// Percent-decodes a URI fragment, per `unescapeURI`.
pub fn unescape_uri(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Evaluates a JSON-Pointer (RFC 6901) against `root`. Internal only:
/// the spec scopes a standalone public pointer evaluator out, but
/// `$ref` resolution needs one to walk a schema document down to a
/// `#/…` fragment.
pub(crate) fn eval_json_pointer<'a>(pointer: &str, root: Value<'a>) -> Option<Value<'a>> {
    let pointer = pointer.strip_prefix('/').unwrap_or(pointer);
    let mut current = root;
    if pointer.is_empty() {
        return Some(current);
    }
    for raw_token in pointer.split('/') {
        let token = raw_token.replace("~1", "/").replace("~0", "~");
        if let Some(dict) = current.as_dict() {
            current = dict.get(&token)?;
        } else if let Some(arr) = current.as_array() {
            let index: usize = token.parse().ok()?;
            current = arr.get(index)?;
        } else {
            return None;
        }
    }
    Some(current)
}

/// The outcome of resolving a `$ref` target: either a subschema found
/// within bytes the caller already owns (root document or a
/// previously-registered one, identified by URI) plus the JSON-Pointer
/// fragment still to walk, or a URI this schema doesn't know about.
pub enum RefTarget {
    /// Resolved to a known document, identified by its registration
    /// URI (empty string for the root schema), plus the pointer
    /// fragment (without leading `#`) to evaluate within it.
    Known { doc_uri: String, fragment: String },
    Unknown { uri: String },
}

/// Resolves `ref_uri` (as it literally appears in a schema's `$ref`)
/// against `base_uri` (the nearest enclosing `$id`), consulting
/// `known_uris` (every URI `add_schema` has registered, including the
/// root schema's own `$id` if any). Mirrors `resolveSchemaRef`'s
/// three-tier search: exact match, longest known-prefix match, then
/// plain JSON-Pointer against the root.
pub fn resolve_schema_ref(
    ref_uri: &str,
    base_uri: &str,
    known_uris: &[String],
) -> Result<RefTarget> {
    let absolute = if is_absolute_uri(ref_uri) {
        ref_uri.to_string()
    } else if !base_uri.is_empty() {
        concat_uris(base_uri, ref_uri)
    } else if ref_uri.starts_with('#') {
        ref_uri.to_string()
    } else {
        return Err(Error::SchemaInvalid(format!(
            "relative $ref '{}' with no enclosing $id",
            ref_uri
        )));
    };

    let root = root_of_absolute_uri(&absolute);
    let fragment = match absolute.find('#') {
        Some(i) => unescape_uri(&absolute[i + 1..]),
        None => String::new(),
    };

    if root.is_empty() || known_uris.iter().any(|u| u == root) {
        return Ok(RefTarget::Known {
            doc_uri: root.to_string(),
            fragment,
        });
    }

    // Prefix match: the longest known URI that `root` extends.
    let mut best: Option<&str> = None;
    for known in known_uris {
        if !known.is_empty() && root.starts_with(known.as_str()) {
            if best.map(|b| known.len() > b.len()).unwrap_or(true) {
                best = Some(known.as_str());
            }
        }
    }
    if let Some(known) = best {
        return Ok(RefTarget::Known {
            doc_uri: known.to_string(),
            fragment,
        });
    }

    Ok(RefTarget::Unknown {
        uri: root.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, EncoderOptions};
    use crate::validator::validate;

    #[test]
    fn recognizes_absolute_uris() {
        assert!(is_absolute_uri("http://x/y"));
        assert!(is_absolute_uri("urn:uuid:abc"));
        assert!(!is_absolute_uri("#/defs/foo"));
        assert!(!is_absolute_uri("relative/path"));
    }

    #[test]
    fn concat_replaces_last_segment() {
        assert_eq!(concat_uris("http://x/y/z", "w"), "http://x/y/w");
        assert_eq!(concat_uris("http://x/y", "#/defs/foo"), "http://x/y#/defs/foo");
        assert_eq!(concat_uris("http://x/y", "http://other"), "http://other");
    }

    #[test]
    fn pointer_uri_detection() {
        assert!(is_json_pointer_uri("http://x/y#/defs/foo"));
        assert!(is_json_pointer_uri("http://x/y#"));
        assert!(!is_json_pointer_uri("http://x/y#fragment-name"));
        assert!(!is_json_pointer_uri("http://x/y"));
    }

    #[test]
    fn eval_pointer_walks_nested_structure() {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.begin_dict(None).unwrap();
        enc.write_key_str("defs").unwrap();
        enc.begin_dict(None).unwrap();
        enc.write_key_str("foo").unwrap();
        enc.write_int(42).unwrap();
        enc.end_dict().unwrap();
        enc.end_dict().unwrap();
        let bytes = enc.finish().unwrap();
        let root = validate(&bytes).unwrap();
        let found = eval_json_pointer("/defs/foo", root).unwrap();
        assert_eq!(found.as_int(), 42);
    }

    #[test]
    fn resolve_exact_match() {
        let known = vec!["http://x/y".to_string()];
        let target = resolve_schema_ref("http://x/y", "", &known).unwrap();
        match target {
            RefTarget::Known { doc_uri, fragment } => {
                assert_eq!(doc_uri, "http://x/y");
                assert_eq!(fragment, "");
            }
            _ => panic!("expected known"),
        }
    }

    #[test]
    fn resolve_unknown_ref() {
        let known: Vec<String> = vec![];
        let target = resolve_schema_ref("http://x/y", "", &known).unwrap();
        match target {
            RefTarget::Unknown { uri } => assert_eq!(uri, "http://x/y"),
            _ => panic!("expected unknown"),
        }
    }
}
