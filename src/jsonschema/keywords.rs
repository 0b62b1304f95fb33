//! Schema scanning and the recursive check algorithm (spec §4.8),
//! grounded in `examples/original_source/Fleece/API_Impl/JSONSchema.cc`'s
//! `scanSchema`/`check`/`checkValue`/`checkNumber`/`checkString`/
//! `checkArray`/`checkDict`/`isType`.

use super::refs::{resolve_schema_ref, RefTarget};
use super::{ErrorKind, SchemaLookup};
use crate::error::{Error, Result};
use crate::path::Component;
use crate::value::{values_equal, DictView, Kind, Value};
use regex::Regex;
use std::collections::HashSet;

/// Keywords this implementation recognizes but deliberately refuses to
/// evaluate (spec §4.8: "explicitly unsupported keywords cause a
/// `schema-unsupported` error at load time").
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "$dynamicRef",
    "$dynamicAnchor",
    "$vocabulary",
    "format",
    "contentEncoding",
    "contentMediaType",
    "dependencies",
    "dependentRequired",
    "dependentSchemas",
    "unevaluatedItems",
    "unevaluatedProperties",
];

/// Keywords this implementation evaluates, either directly or as
/// bookkeeping (`$id`/`$anchor`/`$defs`/`title`/`description`/… are not
/// evaluated but are harmless and so simply ignored rather than
/// rejected — unlike the original, which fails closed on any key it
/// doesn't recognize. See DESIGN.md for this divergence.
const EVALUATED_KEYWORDS: &[&str] = &[
    "type",
    "const",
    "enum",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
    "$ref",
    "$defs",
    "definitions",
    "$id",
    "$anchor",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "items",
    "prefixItems",
    "minItems",
    "maxItems",
    "contains",
    "minContains",
    "maxContains",
    "uniqueItems",
    "properties",
    "patternProperties",
    "additionalProperties",
    "propertyNames",
    "minProperties",
    "maxProperties",
    "required",
    "title",
    "description",
    "default",
    "examples",
    "$comment",
];

/// Walks `schema` recursively, failing at load time if any key names an
/// explicitly-unsupported keyword and `schema`'s own shape is
/// malformed (e.g. `properties` not a dict). Registers every `$id` it
/// finds isn't this crate's job here — `mod.rs` handles registration —
/// this pass only validates shape.
pub(crate) fn scan_schema(schema: Value) -> Result<()> {
    match schema.kind() {
        Kind::Boolean => return Ok(()), // `true`/`false` schemas, always valid shape
        Kind::Dict => {}
        _ => {
            return Err(Error::SchemaInvalid(
                "schema must be an object or a boolean".into(),
            ))
        }
    }
    let dict = schema.as_dict().unwrap();
    for (key, value) in dict.iter() {
        let key = match key {
            crate::value::dict::DictKey::Str(s) => s,
            crate::value::dict::DictKey::Int(_) => {
                return Err(Error::SchemaInvalid("schema keys must be strings".into()))
            }
        };
        if UNSUPPORTED_KEYWORDS.contains(&key) {
            return Err(Error::SchemaUnsupported(key.to_string()));
        }
        scan_subschemas(key, value)?;
    }
    Ok(())
}

fn scan_subschemas(key: &str, value: Value) -> Result<()> {
    match key {
        "allOf" | "anyOf" | "oneOf" | "prefixItems" => {
            let arr = value
                .as_array()
                .ok_or_else(|| Error::SchemaInvalid(format!("'{}' must be an array", key)))?;
            for item in arr.iter() {
                scan_schema(item)?;
            }
        }
        "not" | "if" | "then" | "else" | "items" | "contains" | "propertyNames" | "additionalProperties" => {
            scan_schema(value)?;
        }
        "properties" | "patternProperties" | "$defs" | "definitions" => {
            let dict = value
                .as_dict()
                .ok_or_else(|| Error::SchemaInvalid(format!("'{}' must be an object", key)))?;
            for (_, v) in dict.iter() {
                scan_schema(v)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Everything a `check_*` call needs: the schema lookup (root bytes +
/// known refs + regex cache), the path accumulated so far, and the
/// nearest enclosing `$id` (for resolving relative `$ref`s). Threading
/// these two explicitly in place of the original's post-hoc
/// `recoverPath`/`schemaValueURI` deep-searches is a deliberate
/// simplification (see DESIGN.md).
pub(crate) struct CheckContext<'l, 'c> {
    pub lookup: &'l SchemaLookup<'c>,
    pub path: Vec<Component>,
    pub base_uri: String,
}

/// A failing check: the schema fragment and path are rendered lazily
/// by the caller, since a `Value` borrowed from the lookup's owned
/// bytes is cheaper to carry around than a pre-rendered string.
/// `failing_value` is the actual sub-value that tripped the check (spec
/// §4.8's `(error-kind, failing-value, failing-path, …)` result), not
/// just the top-level document.
pub(crate) struct CheckFailure<'s, 'v> {
    pub kind: ErrorKind,
    pub path: Vec<Component>,
    pub schema_fragment: Value<'s>,
    pub schema_uri: String,
    pub failing_value: Value<'v>,
}

type CheckResult<'s, 'v> = std::result::Result<(), CheckFailure<'s, 'v>>;

pub(crate) fn check<'l, 'c, 'v>(
    ctx: &mut CheckContext<'l, 'c>,
    schema: Value<'c>,
    value: Value<'v>,
) -> Result<CheckResult<'c, 'v>> {
    if let Kind::Boolean = schema.kind() {
        if schema.as_bool() {
            return Ok(Ok(()));
        }
        return Ok(Err(fail(ctx, ErrorKind::Invalid, schema, value)));
    }
    let sdict = schema
        .as_dict()
        .ok_or_else(|| Error::SchemaInvalid("schema must be an object or boolean".into()))?;

    if let Some(id) = sdict.get("$id").and_then(|v| v.as_string()) {
        ctx.base_uri = id.to_string();
    }

    if let Some(r) = sdict.get("$ref").and_then(|v| v.as_string()) {
        return check_ref(ctx, r, value);
    }
    if let Some(t) = sdict.get("type") {
        if let Err(f) = check_type(ctx, t, schema, value) {
            return Ok(Err(f));
        }
    }
    if let Some(c) = sdict.get("const") {
        if !values_equal(value, c) {
            return Ok(Err(fail(ctx, ErrorKind::Invalid, schema, value)));
        }
    }
    if let Some(e) = sdict.get("enum") {
        let arr = e
            .as_array()
            .ok_or_else(|| Error::SchemaInvalid("'enum' must be an array".into()))?;
        if !arr.iter().any(|candidate| values_equal(candidate, value)) {
            return Ok(Err(fail(ctx, ErrorKind::NotEnum, e, value)));
        }
    }
    if let Some(all_of) = sdict.get("allOf") {
        for sub in all_of.as_array().into_iter().flat_map(|a| a.iter()) {
            if let Err(f) = check(ctx, sub, value)? {
                return Ok(Err(f));
            }
        }
    }
    if let Some(any_of) = sdict.get("anyOf") {
        let subs: Vec<_> = any_of.as_array().into_iter().flat_map(|a| a.iter()).collect();
        let mut last_failure = None;
        let mut matched = false;
        for sub in subs {
            match check(ctx, sub, value)? {
                Ok(()) => {
                    matched = true;
                    break;
                }
                Err(f) => last_failure = Some(f),
            }
        }
        if !matched {
            return Ok(Err(
                last_failure.unwrap_or_else(|| fail(ctx, ErrorKind::Invalid, schema, value)),
            ));
        }
    }
    if let Some(one_of) = sdict.get("oneOf") {
        let subs: Vec<_> = one_of.as_array().into_iter().flat_map(|a| a.iter()).collect();
        let mut matches = 0usize;
        for sub in subs {
            if check(ctx, sub, value)?.is_ok() {
                matches += 1;
            }
        }
        if matches != 1 {
            return Ok(Err(fail(ctx, ErrorKind::Invalid, schema, value)));
        }
    }
    if let Some(not_schema) = sdict.get("not") {
        if check(ctx, not_schema, value)?.is_ok() {
            return Ok(Err(fail(ctx, ErrorKind::NotNot, not_schema, value)));
        }
    }
    if let Some(if_schema) = sdict.get("if") {
        let condition_ok = check(ctx, if_schema, value)?.is_ok();
        let branch = if condition_ok {
            sdict.get("then")
        } else {
            sdict.get("else")
        };
        if let Some(branch) = branch {
            if let Err(f) = check(ctx, branch, value)? {
                return Ok(Err(f));
            }
        }
    }

    check_by_kind(ctx, schema, sdict, value)
}

fn check_ref<'l, 'c, 'v>(
    ctx: &mut CheckContext<'l, 'c>,
    r: &str,
    value: Value<'v>,
) -> Result<CheckResult<'c, 'v>> {
    let target = resolve_schema_ref(r, &ctx.base_uri, ctx.lookup.known_uris())?;
    let (doc_uri, fragment) = match target {
        RefTarget::Unknown { uri } => return Err(Error::UnknownSchemaRef { uri }),
        RefTarget::Known { doc_uri, fragment } => (doc_uri, fragment),
    };
    let doc_root = ctx
        .lookup
        .document(&doc_uri)
        .ok_or_else(|| Error::UnknownSchemaRef { uri: doc_uri.clone() })?;
    let target_schema = if fragment.is_empty() {
        doc_root
    } else {
        super::refs::eval_json_pointer(&fragment, doc_root)
            .ok_or_else(|| Error::SchemaInvalid(format!("bad $ref fragment '{}'", fragment)))?
    };
    let saved_uri = ctx.base_uri.clone();
    if !doc_uri.is_empty() {
        ctx.base_uri = doc_uri;
    }
    let result = check(ctx, target_schema, value)?;
    ctx.base_uri = saved_uri;
    Ok(result.map_err(|mut f| {
        if f.schema_uri.is_empty() {
            f.schema_uri = ctx.base_uri.clone();
        }
        f
    }))
}

fn fail<'l, 'c, 'v>(
    ctx: &CheckContext<'l, 'c>,
    kind: ErrorKind,
    schema_fragment: Value<'c>,
    failing_value: Value<'v>,
) -> CheckFailure<'c, 'v> {
    CheckFailure {
        kind,
        path: ctx.path.clone(),
        schema_fragment,
        schema_uri: ctx.base_uri.clone(),
        failing_value,
    }
}

/// `type` accepts either a single string or an array of strings; a
/// value matches if it matches any listed type (`isType`).
fn check_type<'l, 'c, 'v>(
    ctx: &CheckContext<'l, 'c>,
    type_decl: Value<'c>,
    schema: Value<'c>,
    value: Value<'v>,
) -> std::result::Result<(), CheckFailure<'c, 'v>> {
    let matches = if let Some(name) = type_decl.as_string() {
        is_type(name, value)
    } else if let Some(arr) = type_decl.as_array() {
        arr.iter().any(|t| t.as_string().map(|n| is_type(n, value)).unwrap_or(false))
    } else {
        false
    };
    if matches {
        Ok(())
    } else {
        Err(fail(ctx, ErrorKind::TypeMismatch, schema, value))
    }
}

/// Whether `value`'s kind matches the JSON Schema type name `name`.
/// `integer` additionally requires a numeric value with no fractional
/// part (ported from `isIntegral`, including its documented quirk:
/// a `Number` value is integral if its double form has no fraction,
/// regardless of whether it was *encoded* as an int or a float).
fn is_type(name: &str, value: Value) -> bool {
    match name {
        "null" => value.kind() == Kind::Null,
        "boolean" => value.kind() == Kind::Boolean,
        "object" => value.kind() == Kind::Dict,
        "array" => value.kind() == Kind::Array,
        "string" => value.kind() == Kind::String,
        "number" => value.kind() == Kind::Number,
        "integer" => {
            value.kind() == Kind::Number && {
                let d = value.as_double();
                d.is_finite() && d.floor() == d
            }
        }
        _ => false,
    }
}

fn check_by_kind<'l, 'c, 'v>(
    ctx: &mut CheckContext<'l, 'c>,
    schema: Value<'c>,
    sdict: DictView<'c>,
    value: Value<'v>,
) -> Result<CheckResult<'c, 'v>> {
    match value.kind() {
        Kind::Number => Ok(check_number(ctx, schema, sdict, value)),
        Kind::String => Ok(check_string(ctx, schema, sdict, value)),
        Kind::Array => check_array(ctx, schema, sdict, value),
        Kind::Dict => check_dict(ctx, schema, sdict, value),
        _ => Ok(Ok(())),
    }
}

fn check_number<'c, 'v>(
    ctx: &CheckContext<'_, 'c>,
    schema: Value<'c>,
    sdict: DictView<'c>,
    value: Value<'v>,
) -> std::result::Result<(), CheckFailure<'c, 'v>> {
    let d = value.as_double();
    if let Some(min) = sdict.get("minimum") {
        if d < min.as_double() {
            return Err(fail(ctx, ErrorKind::OutOfRange, min, value));
        }
    }
    if let Some(max) = sdict.get("maximum") {
        if d > max.as_double() {
            return Err(fail(ctx, ErrorKind::OutOfRange, max, value));
        }
    }
    if let Some(min) = sdict.get("exclusiveMinimum") {
        if d <= min.as_double() {
            return Err(fail(ctx, ErrorKind::OutOfRange, min, value));
        }
    }
    if let Some(max) = sdict.get("exclusiveMaximum") {
        if d >= max.as_double() {
            return Err(fail(ctx, ErrorKind::OutOfRange, max, value));
        }
    }
    if let Some(m) = sdict.get("multipleOf") {
        let step = m.as_double();
        if step != 0.0 {
            let quotient = d / step;
            if !quotient.is_finite() || quotient.floor() != quotient {
                return Err(fail(ctx, ErrorKind::NotMultiple, m, value));
            }
        }
    }
    let _ = schema;
    Ok(())
}

fn check_string<'c, 'v>(
    ctx: &CheckContext<'_, 'c>,
    schema: Value<'c>,
    sdict: DictView<'c>,
    value: Value<'v>,
) -> std::result::Result<(), CheckFailure<'c, 'v>> {
    let s = value.as_string().unwrap_or("");
    let char_len = s.chars().count();
    if let Some(min) = sdict.get("minLength") {
        if (char_len as i64) < min.as_int() {
            return Err(fail(ctx, ErrorKind::TooShort, min, value));
        }
    }
    if let Some(max) = sdict.get("maxLength") {
        if (char_len as i64) > max.as_int() {
            return Err(fail(ctx, ErrorKind::TooLong, max, value));
        }
    }
    if let Some(pattern) = sdict.get("pattern") {
        let pat = pattern.as_string().unwrap_or("");
        match ctx.lookup.regex_for(pat) {
            Ok(re) => {
                if !re.is_match(s) {
                    return Err(fail(ctx, ErrorKind::PatternMismatch, pattern, value));
                }
            }
            Err(_) => return Err(fail(ctx, ErrorKind::Invalid, pattern, value)),
        }
    }
    let _ = schema;
    Ok(())
}

fn check_array<'l, 'c, 'v>(
    ctx: &mut CheckContext<'l, 'c>,
    schema: Value<'c>,
    sdict: DictView<'c>,
    value: Value<'v>,
) -> Result<CheckResult<'c, 'v>> {
    let arr = value.as_array().unwrap();
    let count = arr.count();

    if let Some(min) = sdict.get("minItems") {
        if (count as i64) < min.as_int() {
            return Ok(Err(fail(ctx, ErrorKind::TooFew, min, value)));
        }
    }
    if let Some(max) = sdict.get("maxItems") {
        if (count as i64) > max.as_int() {
            return Ok(Err(fail(ctx, ErrorKind::TooMany, max, value)));
        }
    }
    if sdict.get("uniqueItems").map(|v| v.as_bool()).unwrap_or(false) {
        let items: Vec<_> = arr.iter().collect();
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                if values_equal(items[i], items[j]) {
                    return Ok(Err(fail(ctx, ErrorKind::NotUnique, schema, value)));
                }
            }
        }
    }

    let prefix_items = sdict.get("prefixItems").and_then(|v| v.as_array());
    let prefix_len = prefix_items.map(|p| p.count()).unwrap_or(0);

    for (i, item) in arr.iter().enumerate() {
        ctx.path.push(Component::Index(i as i32));
        let result = if i < prefix_len {
            let sub = prefix_items.unwrap().get(i).unwrap();
            check(ctx, sub, item)?
        } else if let Some(items_schema) = sdict.get("items") {
            check(ctx, items_schema, item)?
        } else {
            Ok(())
        };
        ctx.path.pop();
        if let Err(f) = result {
            return Ok(Err(f));
        }
    }

    if let Some(contains_schema) = sdict.get("contains") {
        let min_contains = sdict.get("minContains").map(|v| v.as_int()).unwrap_or(1);
        let max_contains = sdict.get("maxContains").map(|v| v.as_int());
        let mut matches = 0i64;
        for (i, item) in arr.iter().enumerate() {
            ctx.path.push(Component::Index(i as i32));
            let ok = check(ctx, contains_schema, item)?.is_ok();
            ctx.path.pop();
            if ok {
                matches += 1;
                if let Some(max) = max_contains {
                    if matches > max {
                        return Ok(Err(fail(ctx, ErrorKind::TooMany, contains_schema, value)));
                    }
                }
            }
        }
        if matches < min_contains {
            return Ok(Err(fail(ctx, ErrorKind::TooFew, contains_schema, value)));
        }
    }

    Ok(Ok(()))
}

fn check_dict<'l, 'c, 'v>(
    ctx: &mut CheckContext<'l, 'c>,
    schema: Value<'c>,
    sdict: DictView<'c>,
    value: Value<'v>,
) -> Result<CheckResult<'c, 'v>> {
    let vdict = value.as_dict().unwrap();

    if let Some(min) = sdict.get("minProperties") {
        if (vdict.count() as i64) < min.as_int() {
            return Ok(Err(fail(ctx, ErrorKind::TooFew, min, value)));
        }
    }
    if let Some(max) = sdict.get("maxProperties") {
        if (vdict.count() as i64) > max.as_int() {
            return Ok(Err(fail(ctx, ErrorKind::TooMany, max, value)));
        }
    }
    if let Some(required) = sdict.get("required").and_then(|v| v.as_array()) {
        for req in required.iter() {
            let name = req.as_string().unwrap_or("");
            if vdict.get(name).is_none() {
                return Ok(Err(fail(ctx, ErrorKind::MissingProperty, req, value)));
            }
        }
    }
    if let Some(prop_names_schema) = sdict.get("propertyNames") {
        for (key, _) in vdict.iter() {
            if let crate::value::dict::DictKey::Str(name) = key {
                let name_value = encode_scalar_string(name);
                let name_root = crate::validator::from_trusted_data(&name_value)?;
                if let Err(f) = check(ctx, prop_names_schema, name_root)? {
                    return Ok(Err(f));
                }
            }
        }
    }

    let properties = sdict.get("properties").and_then(|v| v.as_dict());
    let pattern_properties = sdict.get("patternProperties").and_then(|v| v.as_dict());
    let additional = sdict.get("additionalProperties");
    let mut unmatched: HashSet<String> = HashSet::new();

    for (key, item) in vdict.iter() {
        let name = match key {
            crate::value::dict::DictKey::Str(s) => s,
            crate::value::dict::DictKey::Int(_) => continue,
        };
        let mut matched_any = false;
        if let Some(props) = properties {
            if let Some(sub) = props.get(name) {
                matched_any = true;
                ctx.path.push(Component::Key(name.to_string()));
                let result = check(ctx, sub, item)?;
                ctx.path.pop();
                if let Err(f) = result {
                    return Ok(Err(f));
                }
            }
        }
        if let Some(pat_props) = pattern_properties {
            for (pkey, psub) in pat_props.iter() {
                if let crate::value::dict::DictKey::Str(pat) = pkey {
                    if let Ok(re) = ctx.lookup.regex_for(pat) {
                        if re.is_match(name) {
                            matched_any = true;
                            ctx.path.push(Component::Key(name.to_string()));
                            let result = check(ctx, psub, item)?;
                            ctx.path.pop();
                            if let Err(f) = result {
                                return Ok(Err(f));
                            }
                        }
                    }
                }
            }
        }
        if !matched_any {
            unmatched.insert(name.to_string());
        }
    }

    if let Some(additional) = additional {
        if additional.kind() == Kind::Boolean {
            if !additional.as_bool() && !unmatched.is_empty() {
                let mut sorted: Vec<_> = unmatched.into_iter().collect();
                sorted.sort();
                let name = sorted.into_iter().next().unwrap();
                let item = vdict.get(&name).unwrap();
                ctx.path.push(Component::Key(name));
                let f = fail(ctx, ErrorKind::UnknownProperty, additional, item);
                ctx.path.pop();
                return Ok(Err(f));
            }
        } else {
            let mut sorted: Vec<_> = unmatched.into_iter().collect();
            sorted.sort();
            for name in sorted {
                let item = vdict.get(&name).unwrap();
                ctx.path.push(Component::Key(name));
                let result = check(ctx, additional, item)?;
                ctx.path.pop();
                if let Err(f) = result {
                    return Ok(Err(f));
                }
            }
        }
    }

    let _ = schema;
    Ok(Ok(()))
}

/// Encodes a bare string as a standalone one-value document, used to
/// validate dict key names against `propertyNames` (which expects a
/// JSON Schema value, not a raw `&str`).
fn encode_scalar_string(s: &str) -> Vec<u8> {
    use crate::encoder::{Encoder, EncoderOptions};
    let mut enc = Encoder::new(EncoderOptions::default());
    enc.write_string(s).unwrap();
    enc.finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderOptions;
    use crate::validator::validate;

    fn encode(json: &str) -> Vec<u8> {
        crate::json::encode_json(json, EncoderOptions::default()).unwrap()
    }

    #[test]
    fn type_mismatch_is_detected() {
        let schema_bytes = encode(r#"{"type":"integer"}"#);
        let schema_root = validate(&schema_bytes).unwrap();
        let lookup = SchemaLookup::new(&schema_bytes);
        let value_bytes = encode(r#""hi""#);
        let value_root = validate(&value_bytes).unwrap();
        let mut ctx = CheckContext {
            lookup: &lookup,
            path: Vec::new(),
            base_uri: String::new(),
        };
        let result = check(&mut ctx, schema_root, value_root).unwrap();
        assert!(matches!(result, Err(f) if matches!(f.kind, ErrorKind::TypeMismatch)));
    }

    #[test]
    fn enum_violation_reports_failing_path() {
        let schema_bytes = encode(
            r#"{"type":"object","properties":{"str":{"type":"string"},"arr":{"items":{"enum":[1,2]}}}}"#,
        );
        let schema_root = validate(&schema_bytes).unwrap();
        let lookup = SchemaLookup::new(&schema_bytes);
        let value_bytes = encode(r#"{"str":"hi","arr":[1,2,3.5]}"#);
        let value_root = validate(&value_bytes).unwrap();
        let mut ctx = CheckContext {
            lookup: &lookup,
            path: Vec::new(),
            base_uri: String::new(),
        };
        let result = check(&mut ctx, schema_root, value_root).unwrap();
        match result {
            Err(f) => {
                assert!(matches!(f.kind, ErrorKind::NotEnum));
                let path = crate::path::Path::parse("arr[2]").unwrap();
                assert_eq!(f.path, path.components().to_vec());
            }
            Ok(()) => panic!("expected failure"),
        }
    }

    #[test]
    fn valid_document_passes() {
        let schema_bytes = encode(
            r#"{"type":"object","properties":{"str":{"type":"string"},"arr":{"items":{"enum":[1,2]}}}}"#,
        );
        let schema_root = validate(&schema_bytes).unwrap();
        let lookup = SchemaLookup::new(&schema_bytes);
        let value_bytes = encode(r#"{"str":"hi","arr":[1,2]}"#);
        let value_root = validate(&value_bytes).unwrap();
        let mut ctx = CheckContext {
            lookup: &lookup,
            path: Vec::new(),
            base_uri: String::new(),
        };
        assert!(check(&mut ctx, schema_root, value_root).unwrap().is_ok());
    }

    #[test]
    fn unsupported_keyword_is_rejected_at_scan_time() {
        let schema_bytes = encode(r#"{"format":"email"}"#);
        let schema_root = validate(&schema_bytes).unwrap();
        let err = scan_schema(schema_root).unwrap_err();
        assert!(matches!(err, Error::SchemaUnsupported(_)));
    }
}
