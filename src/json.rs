//! JSON interchange (spec §6.3): parses a JSON source into an encoded
//! document, symmetric with [`crate::value::Value::to_json`]/`to_json5`
//! on the dump side.
//!
//! Grounded in teacher's `src/json_flex.rs` for the "walk a parsed JSON
//! tree, emit encoder events" shape, but built on `serde_json` instead of
//! the teacher's hand-rolled `no_std` parser — this crate targets `std`
//! and the pack's other repos all reach for `serde_json` rather than
//! rolling their own (see DESIGN.md).

use crate::encoder::{Encoder, EncoderOptions};
use crate::error::{Error, Result};
use serde_json::Value as JsonValue;

/// Parses `json` and encodes it as a complete document using `opts`.
/// Rejects `NaN`/`Infinity` (spec §6.3); `serde_json` already refuses
/// them at parse time, so no extra check is needed on that front.
pub fn encode_json(json: &str, opts: EncoderOptions) -> Result<Vec<u8>> {
    let parsed: JsonValue = serde_json::from_str(json).map_err(|e| Error::JsonError {
        message: e.to_string(),
        position: e.column(),
    })?;
    let mut enc = Encoder::new(opts);
    write_json_value(&mut enc, &parsed)?;
    enc.finish()
}

fn write_json_value(enc: &mut Encoder, v: &JsonValue) -> Result<()> {
    match v {
        JsonValue::Null => enc.write_null(),
        JsonValue::Bool(b) => enc.write_bool(*b),
        JsonValue::Number(n) => write_json_number(enc, n),
        JsonValue::String(s) => enc.write_string(s),
        JsonValue::Array(items) => {
            enc.begin_array(Some(items.len()))?;
            for item in items {
                write_json_value(enc, item)?;
            }
            enc.end_array()
        }
        JsonValue::Object(map) => {
            enc.begin_dict(Some(map.len()))?;
            for (key, val) in map {
                enc.write_key_str(key)?;
                write_json_value(enc, val)?;
            }
            enc.end_dict()
        }
    }
}

fn write_json_number(enc: &mut Encoder, n: &serde_json::Number) -> Result<()> {
    if let Some(i) = n.as_i64() {
        enc.write_int(i)
    } else if let Some(u) = n.as_u64() {
        enc.write_uint(u)
    } else if let Some(d) = n.as_f64() {
        enc.write_double(d)
    } else {
        Err(Error::JsonError {
            message: "number out of range".into(),
            position: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate;

    #[test]
    fn round_trips_object_with_mixed_types() {
        let json = r#"{"name":"ok","count":42,"ratio":1.5,"flags":[true,false,null]}"#;
        let bytes = encode_json(json, EncoderOptions::default()).unwrap();
        let root = validate(&bytes).unwrap();
        let dict = root.as_dict().unwrap();
        assert_eq!(dict.get("name").unwrap().as_string(), Some("ok"));
        assert_eq!(dict.get("count").unwrap().as_int(), 42);
        assert_eq!(dict.get("ratio").unwrap().as_double(), 1.5);
        let flags = dict.get("flags").unwrap().as_array().unwrap();
        assert_eq!(flags.count(), 3);
    }

    #[test]
    fn large_unsigned_round_trips_past_i64_max() {
        let json = format!(r#"{{"big":{}}}"#, u64::MAX);
        let bytes = encode_json(&json, EncoderOptions::default()).unwrap();
        let root = validate(&bytes).unwrap();
        let dict = root.as_dict().unwrap();
        assert_eq!(dict.get("big").unwrap().as_unsigned(), u64::MAX);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = encode_json("{not valid", EncoderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::JsonError { .. }));
    }

    #[test]
    fn dump_round_trips_back_to_equivalent_json() {
        let json = r#"{"a":1,"b":[1,2,3]}"#;
        let bytes = encode_json(json, EncoderOptions::default()).unwrap();
        let root = validate(&bytes).unwrap();
        let out = root.to_json().unwrap();
        let reparsed: JsonValue = serde_json::from_str(&out).unwrap();
        let original: JsonValue = serde_json::from_str(json).unwrap();
        assert_eq!(reparsed, original);
    }
}
