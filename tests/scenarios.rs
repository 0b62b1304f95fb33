//! End-to-end scenarios exercising the encoder, decoder, mutable overlay,
//! and JSON Schema validator together against one loaded document, the
//! way a caller actually uses this crate rather than one module at a time.

use compactdoc::encoder::{Encoder, EncoderOptions};
use compactdoc::jsonschema::{ErrorKind, JsonSchema};
use compactdoc::mutable::array::MutableArray;
use compactdoc::mutable::ChildHandle;
use compactdoc::error::Error;
use compactdoc::validator::{from_trusted_data, validate};

#[test]
fn scenario_1_basic_dict_lookup() {
    let mut enc = Encoder::new(EncoderOptions::default());
    enc.begin_dict(None).unwrap();
    enc.write_key_str("foo").unwrap();
    enc.write_int(17).unwrap();
    enc.write_key_str("bar").unwrap();
    enc.write_string("wow").unwrap();
    enc.write_key_str("bool").unwrap();
    enc.write_bool(true).unwrap();
    enc.end_dict().unwrap();
    let bytes = enc.finish().unwrap();

    let root = validate(&bytes).unwrap();
    let dict = root.as_dict().unwrap();
    assert_eq!(dict.get("foo").unwrap().as_int(), 17);
    assert_eq!(dict.get("bar").unwrap().as_string(), Some("wow"));
    assert_eq!(dict.get("bool").unwrap().as_int(), 1);
}

#[test]
fn scenario_2_large_array_stays_narrow() {
    let mut enc = Encoder::new(EncoderOptions::default());
    enc.begin_array(None).unwrap();
    for i in 0..1000i64 {
        enc.write_int(i).unwrap();
    }
    enc.end_array().unwrap();
    let bytes = enc.finish().unwrap();

    let root = validate(&bytes).unwrap();
    let arr = root.as_array().unwrap();
    assert_eq!(arr.count(), 1000);
    for (i, v) in arr.iter().enumerate() {
        assert_eq!(v.as_int(), i as i64);
    }

    // Every value is a short int (narrow 2-byte slot): no 4-byte slots
    // means the array header's wide-items flag is clear.
    assert_eq!(bytes[0] >> 4, compactdoc::value::tags::tag::ARRAY);
    assert_eq!(bytes[0] & compactdoc::value::tags::flag::COLLECTION_WIDE, 0);
}

#[test]
fn scenario_3_signed_unsigned_boundaries() {
    let mut enc = Encoder::new(EncoderOptions::default());
    enc.begin_array(None).unwrap();
    enc.write_int(i64::MAX).unwrap();
    enc.write_int(i64::MIN).unwrap();
    enc.write_uint(u64::MAX).unwrap();
    enc.end_array().unwrap();
    let bytes = enc.finish().unwrap();

    let root = validate(&bytes).unwrap();
    let arr = root.as_array().unwrap();
    assert_eq!(arr.get(0).unwrap().as_int(), i64::MAX);
    assert_eq!(arr.get(1).unwrap().as_int(), i64::MIN);
    assert_eq!(arr.get(2).unwrap().as_unsigned(), u64::MAX);
}

#[test]
fn scenario_4_delta_mutation_round_trip() {
    let mut enc = Encoder::new(EncoderOptions::default());
    enc.begin_array(None).unwrap();
    for i in 0..1000i64 {
        enc.begin_dict(None).unwrap();
        enc.write_key_str("name").unwrap();
        enc.write_string(&format!("item-{i}")).unwrap();
        enc.end_dict().unwrap();
    }
    enc.end_array().unwrap();
    let base = enc.finish().unwrap();

    let root = validate(&base).unwrap();
    let marr = MutableArray::from_value(root).unwrap();
    let child = MutableArray::make_mutable_child(&marr, 123).unwrap();
    let child_dict = match child {
        ChildHandle::Dict(d) => d,
        _ => panic!("expected dict child at index 123"),
    };
    child_dict.borrow_mut().set("name", "X");

    let mut delta_enc = Encoder::with_base(&base, EncoderOptions::default());
    marr.borrow().write_to(&mut delta_enc).unwrap();
    let delta = delta_enc.finish().unwrap();

    assert!(delta.len() < base.len());

    let mut full = base.clone();
    full.extend_from_slice(&delta);
    let merged = validate(&full).unwrap();
    let merged_arr = merged.as_array().unwrap();

    let mutated = merged_arr.get(123).unwrap();
    let mutated_name = mutated.as_dict().unwrap().get("name").unwrap();
    assert_eq!(mutated_name.as_string(), Some("X"));

    let untouched = merged_arr.get(0).unwrap();
    let untouched_name = untouched.as_dict().unwrap().get("name").unwrap();
    assert_eq!(untouched_name.as_string(), Some("item-0"));
    // The untouched element's value pointer still resolves into `base`'s
    // address range, i.e. it was re-pointed at, not copied into the delta.
    assert!(untouched_name.addr() < base.len());
}

#[test]
fn scenario_5_schema_validation_reports_failing_path() {
    let schema = JsonSchema::from_json(
        r#"{
            "type": "object",
            "properties": {
                "str": {"type": "string"},
                "arr": {"items": {"enum": [1, 2]}}
            }
        }"#,
        "",
    )
    .unwrap();

    let ok_bytes = compactdoc::json::encode_json(
        r#"{"str":"hi","arr":[1,2]}"#,
        EncoderOptions::default(),
    )
    .unwrap();
    let ok_doc = from_trusted_data(&ok_bytes).unwrap();
    assert!(schema.validate(ok_doc).unwrap().ok());

    let bad_bytes = compactdoc::json::encode_json(
        r#"{"str":"hi","arr":[1,2,3.5]}"#,
        EncoderOptions::default(),
    )
    .unwrap();
    let bad_doc = from_trusted_data(&bad_bytes).unwrap();
    let result = schema.validate(bad_doc).unwrap();
    let failure = result.into_error().expect("expected a validation failure");
    assert_eq!(failure.kind, ErrorKind::NotEnum);
    assert_eq!(failure.failing_path, "$.arr[2]");
    assert_eq!(failure.failing_value.as_double(), 3.5);
    assert_eq!(failure.schema_fragment, "[1,2]");
}

#[test]
fn scenario_6_ref_registration_and_unregister() {
    let schema =
        JsonSchema::from_json(r#"{"$ref":"http://x/y"}"#, "").unwrap();
    schema
        .add_schema(r#"{"$id":"http://x/y","type":"integer"}"#, "http://x/y")
        .unwrap();

    let str_bytes =
        compactdoc::json::encode_json(r#""hi""#, EncoderOptions::default()).unwrap();
    let str_doc = from_trusted_data(&str_bytes).unwrap();
    let result = schema.validate(str_doc).unwrap();
    let failure = result.into_error().expect("expected a type mismatch");
    assert_eq!(failure.kind, ErrorKind::TypeMismatch);

    assert!(schema.remove_schema("http://x/y"));

    let str_doc = from_trusted_data(&str_bytes).unwrap();
    match schema.validate(str_doc) {
        Err(Error::UnknownSchemaRef { uri }) => assert_eq!(uri, "http://x/y"),
        other => panic!("expected UnknownSchemaRef, got {other:?}"),
    }
}
