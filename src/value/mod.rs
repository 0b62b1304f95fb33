//! Interpret a byte at a known address as a tagged value: dereference
//! pointers, coerce scalars, and iterate arrays/dicts. This is the
//! "value decoder" of spec §4.1 — a pure function of `(buffer, address)`
//! with no parse step and no allocation.
//!
//! Style grounded in `examples/only-cliches-NoProto/src/pointer/mod.rs`
//! (one type, many best-effort coercion methods) and
//! `examples/other_examples/1d66faee_callumbirks-fleece-rs__src-value-mod.rs.rs`
//! (tag dispatch table).

pub mod array;
pub mod dict;
pub mod tags;

use crate::error::{Error, Result};
use crate::byteio::{read_f32, read_f64, read_int, read_u16, read_uint, read_varint};
use tags::{flag, special, tag};

pub use array::ArrayView;
pub use dict::DictView;

/// The seven public value kinds (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Undefined,
    Boolean,
    Number,
    String,
    Data,
    Array,
    Dict,
}

/// Numeric sub-kind, meaningful only when [`Kind::Number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Short,
    Int,
    UnsignedInt,
    Float,
    Double,
}

/// A value at a known, already-validated address inside a buffer.
///
/// Cheap to copy: it's just a borrowed slice and an offset. All accessors
/// are pure functions of these two fields; nothing here allocates.
#[derive(Clone, Copy)]
pub struct Value<'a> {
    buf: &'a [u8],
    addr: usize,
}

impl<'a> std::fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dump())
    }
}

impl<'a> Value<'a> {
    /// Wraps an address inside `buf` as a value, without validation.
    /// Callers must have validated `buf` (via [`crate::validator::validate`])
    /// or otherwise trust it; this is the `from_trusted_data` fast path of
    /// spec §4.2, pushed down to the per-value level.
    pub fn at(buf: &'a [u8], addr: usize) -> Value<'a> {
        Value { buf, addr }
    }

    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    pub fn addr(&self) -> usize {
        self.addr
    }

    pub(crate) fn byte(&self, offset: usize) -> u8 {
        self.buf[self.addr + offset]
    }

    pub(crate) fn tag_nibble(&self) -> u8 {
        self.byte(0) >> 4
    }

    pub(crate) fn is_pointer_byte(&self) -> bool {
        self.byte(0) & 0x80 != 0
    }

    /// Resolves this value, following one pointer hop if it is a pointer.
    /// The caller supplies whether the *containing slot* is wide, since a
    /// narrow slot can only ever hold a narrow pointer while a wide slot
    /// may hold either (the encoder always emits wide pointers from wide
    /// slots, but a defensive decoder should not assume that).
    pub fn resolve(&self, slot_is_wide: bool) -> Result<Value<'a>> {
        if !self.is_pointer_byte() {
            return Ok(*self);
        }
        let mut cur = *self;
        let mut wide = slot_is_wide;
        loop {
            let target = cur.deref_pointer(wide)?;
            if target.is_pointer_byte() {
                // spec §3.2: "Pointers chain ... the first hop uses the
                // width implied by its container, subsequent hops are
                // always wide."
                cur = target;
                wide = true;
                continue;
            }
            return Ok(target);
        }
    }

    /// Computes the target address of a pointer without following chains,
    /// for the validator's own explicit-stack walk.
    pub(crate) fn deref_pointer(&self, wide: bool) -> Result<Value<'a>> {
        let offset_units: u64 = if wide {
            let b0 = (self.byte(0) & 0x7F) as u64;
            let b1 = self.byte(1) as u64;
            let b2 = self.byte(2) as u64;
            let b3 = self.byte(3) as u64;
            (b0 << 24) | (b1 << 16) | (b2 << 8) | b3
        } else {
            let b0 = (self.byte(0) & 0x7F) as u64;
            let b1 = self.byte(1) as u64;
            (b0 << 8) | b1
        };
        let back = offset_units * 2;
        if back == 0 || back as usize > self.addr {
            return Err(Error::OutOfRange(format!(
                "pointer at {} has out-of-range backward offset {}",
                self.addr, back
            )));
        }
        let target_addr = self.addr - back as usize;
        Ok(Value::at(self.buf, target_addr))
    }

    /// The kind of value at this address, *after* resolving a pointer
    /// chain with `slot_is_wide = false`. Prefer [`Value::resolve`] plus
    /// [`Value::kind_raw`] when you already know the slot width.
    pub fn kind(&self) -> Kind {
        match self.resolve(true) {
            Ok(v) => v.kind_raw(),
            Err(_) => Kind::Null,
        }
    }

    /// The kind of the byte pattern at this exact address, with no
    /// pointer resolution. Used internally once a value has already
    /// been resolved.
    pub fn kind_raw(&self) -> Kind {
        if self.is_pointer_byte() {
            return Kind::Null; // unreachable once resolved; defensive default
        }
        match self.tag_nibble() {
            t if t == tag::SHORT || t == tag::INT || t == tag::FLOAT => Kind::Number,
            t if t == tag::SPECIAL => match self.byte(1) {
                special::NULL => Kind::Null,
                special::UNDEFINED => Kind::Undefined,
                special::FALSE | special::TRUE => Kind::Boolean,
                _ => Kind::Null,
            },
            t if t == tag::STRING => Kind::String,
            t if t == tag::DATA => Kind::Data,
            t if t == tag::ARRAY => Kind::Array,
            t if t == tag::DICT => Kind::Dict,
            _ => Kind::Null,
        }
    }

    pub fn number_kind(&self) -> Option<NumberKind> {
        let v = self.resolve(true).ok()?;
        match v.tag_nibble() {
            t if t == tag::SHORT => Some(NumberKind::Short),
            t if t == tag::INT => {
                if v.byte(0) & flag::INT_UNSIGNED != 0 {
                    Some(NumberKind::UnsignedInt)
                } else {
                    Some(NumberKind::Int)
                }
            }
            t if t == tag::FLOAT => {
                if v.byte(0) & flag::FLOAT_DOUBLE != 0 {
                    Some(NumberKind::Double)
                } else {
                    Some(NumberKind::Float)
                }
            }
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.number_kind(),
            Some(NumberKind::Short) | Some(NumberKind::Int) | Some(NumberKind::UnsignedInt)
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self.number_kind(), Some(NumberKind::UnsignedInt))
    }

    pub fn is_double(&self) -> bool {
        matches!(self.number_kind(), Some(NumberKind::Double))
    }

    /// Total byte span of the value at this exact address (header +
    /// payload), not counting anything it may point to. Collections
    /// report only their own header + slot array, not nested content.
    pub fn data_size(&self) -> Result<usize> {
        if self.is_pointer_byte() {
            return Ok(2);
        }
        match self.tag_nibble() {
            t if t == tag::SHORT => Ok(2),
            t if t == tag::INT => Ok(2 + self.int_byte_count()),
            t if t == tag::FLOAT => Ok(if self.byte(0) & flag::FLOAT_DOUBLE != 0 {
                10
            } else {
                6
            }),
            t if t == tag::SPECIAL => Ok(2),
            t if t == tag::STRING || t == tag::DATA => {
                let (len, header_len) = self.string_len_and_header()?;
                Ok(header_len + len)
            }
            t if t == tag::ARRAY || t == tag::DICT => {
                let (count, header_len, wide) = self.collection_count_and_header()?;
                let slot_width = if wide { 4 } else { 2 };
                let slots = if self.tag_nibble() == tag::DICT {
                    count * 2
                } else {
                    count
                };
                Ok(header_len + slots * slot_width)
            }
            t => Err(Error::UnknownValue(t)),
        }
    }

    pub(crate) fn int_byte_count(&self) -> usize {
        (self.byte(0) & flag::COUNT_MASK) as usize + 1
    }

    /// Returns `(string byte length, total header length including the
    /// leading tag byte and any varint extension)`.
    pub(crate) fn string_len_and_header(&self) -> Result<(usize, usize)> {
        let nibble = self.byte(0) & 0x0F;
        if nibble == flag::LONG_LENGTH {
            let (len, varint_len) = read_varint(self.buf, self.addr + 1)?;
            Ok((len as usize, 1 + varint_len))
        } else {
            Ok((nibble as usize, 1))
        }
    }

    /// Returns `(item count, header length, wide)` for an array/dict.
    pub(crate) fn collection_count_and_header(&self) -> Result<(usize, usize, bool)> {
        let wide = self.byte(0) & flag::COLLECTION_WIDE != 0;
        let count_hi = (self.byte(0) & flag::COUNT_MASK) as u16;
        let count16 = (count_hi << 8) | self.byte(1) as u16;
        if count16 == flag::LONG_COUNT {
            let (count, varint_len) = read_varint(self.buf, self.addr + 2)?;
            Ok((count as usize, 2 + varint_len, wide))
        } else {
            Ok((count16 as usize, 2, wide))
        }
    }

    // ---- scalar coercions (spec §4.1: non-numeric -> 0/false) ----

    pub fn as_bool(&self) -> bool {
        let v = match self.resolve(true) {
            Ok(v) => v,
            Err(_) => return false,
        };
        match v.kind_raw() {
            Kind::Null | Kind::Undefined => false,
            Kind::Boolean => v.byte(1) == special::TRUE,
            Kind::Number => v.as_int() != 0 || v.as_double() != 0.0,
            _ => true,
        }
    }

    pub fn as_int(&self) -> i64 {
        let v = match self.resolve(true) {
            Ok(v) => v,
            Err(_) => return 0,
        };
        match v.tag_nibble() {
            t if t == tag::SHORT => {
                let raw = ((v.byte(0) as u16 & 0x0F) << 8) | v.byte(1) as u16;
                sign_extend_12(raw)
            }
            t if t == tag::INT => {
                if v.byte(0) & flag::INT_UNSIGNED != 0 {
                    read_uint(v.buf, v.addr + 2, v.int_byte_count()) as i64
                } else {
                    read_int(v.buf, v.addr + 2, v.int_byte_count())
                }
            }
            t if t == tag::FLOAT => v.as_double() as i64,
            t if t == tag::SPECIAL => {
                if v.byte(1) == special::TRUE {
                    1
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    pub fn as_unsigned(&self) -> u64 {
        let v = match self.resolve(true) {
            Ok(v) => v,
            Err(_) => return 0,
        };
        if v.tag_nibble() == tag::INT && v.byte(0) & flag::INT_UNSIGNED != 0 {
            read_uint(v.buf, v.addr + 2, v.int_byte_count())
        } else {
            v.as_int() as u64
        }
    }

    pub fn as_float(&self) -> f32 {
        self.as_double() as f32
    }

    pub fn as_double(&self) -> f64 {
        let v = match self.resolve(true) {
            Ok(v) => v,
            Err(_) => return 0.0,
        };
        match v.tag_nibble() {
            t if t == tag::FLOAT => {
                if v.byte(0) & flag::FLOAT_DOUBLE != 0 {
                    read_f64(v.buf, v.addr + 2)
                } else {
                    read_f32(v.buf, v.addr + 2) as f64
                }
            }
            t if t == tag::SHORT || t == tag::INT => {
                if v.is_unsigned() {
                    v.as_unsigned() as f64
                } else {
                    v.as_int() as f64
                }
            }
            _ => 0.0,
        }
    }

    /// Borrowed bytes of a string value, or `None` if this isn't a string.
    pub fn as_string(&self) -> Option<&'a str> {
        let v = self.resolve(true).ok()?;
        if v.tag_nibble() != tag::STRING {
            return None;
        }
        let bytes = v.raw_string_bytes().ok()?;
        std::str::from_utf8(bytes).ok()
    }

    /// Borrowed bytes of a data (opaque bytes) value, or `None`.
    pub fn as_data(&self) -> Option<&'a [u8]> {
        let v = self.resolve(true).ok()?;
        if v.tag_nibble() != tag::DATA {
            return None;
        }
        v.raw_string_bytes().ok()
    }

    pub(crate) fn raw_string_bytes(&self) -> Result<&'a [u8]> {
        let (len, header_len) = self.string_len_and_header()?;
        let start = self.addr + header_len;
        let end = start + len;
        self.buf
            .get(start..end)
            .ok_or_else(|| Error::InvalidData("string payload out of bounds".into()))
    }

    pub fn as_array(&self) -> Option<ArrayView<'a>> {
        let v = self.resolve(true).ok()?;
        if v.tag_nibble() != tag::ARRAY {
            return None;
        }
        ArrayView::from_value(v).ok()
    }

    pub fn as_dict(&self) -> Option<DictView<'a>> {
        let v = self.resolve(true).ok()?;
        if v.tag_nibble() != tag::DICT {
            return None;
        }
        DictView::from_value(v).ok()
    }

    /// Strict JSON rendering (spec §6.3). Fails on an `undefined` value
    /// reachable from the root — see DESIGN.md's Open Question decision.
    pub fn to_json(&self) -> Result<String> {
        let mut out = String::new();
        self.write_json(&mut out, false)?;
        Ok(out)
    }

    /// JSON5-flavored rendering: identifier-shaped dict keys are left
    /// unquoted.
    pub fn to_json5(&self) -> Result<String> {
        let mut out = String::new();
        self.write_json(&mut out, true)?;
        Ok(out)
    }

    fn write_json(&self, out: &mut String, json5: bool) -> Result<()> {
        let v = self.resolve(true)?;
        match v.kind_raw() {
            Kind::Null => out.push_str("null"),
            Kind::Undefined => {
                return Err(Error::InvalidData(
                    "undefined value has no JSON projection".into(),
                ))
            }
            Kind::Boolean => out.push_str(if v.as_bool() { "true" } else { "false" }),
            Kind::Number => {
                if v.is_double() || v.number_kind() == Some(NumberKind::Float) {
                    let d = v.as_double();
                    if d.fract() == 0.0 && d.abs() < 1e15 {
                        out.push_str(&format!("{:.1}", d));
                    } else {
                        out.push_str(&format!("{}", d));
                    }
                } else if v.is_unsigned() {
                    out.push_str(&v.as_unsigned().to_string());
                } else {
                    out.push_str(&v.as_int().to_string());
                }
            }
            Kind::String => {
                out.push('"');
                escape_json_string(v.as_string().unwrap_or(""), out);
                out.push('"');
            }
            Kind::Data => {
                out.push('"');
                out.push_str(&base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    v.as_data().unwrap_or(&[]),
                ));
                out.push('"');
            }
            Kind::Array => {
                let arr = v.as_array().ok_or_else(|| Error::InvalidData("not an array".into()))?;
                out.push('[');
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_json(out, json5)?;
                }
                out.push(']');
            }
            Kind::Dict => {
                let dict = v.as_dict().ok_or_else(|| Error::InvalidData("not a dict".into()))?;
                out.push('{');
                for (i, (key, val)) in dict.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    match key {
                        dict::DictKey::Str(s) => {
                            if json5 && is_identifier(s) {
                                out.push_str(s);
                            } else {
                                out.push('"');
                                escape_json_string(s, out);
                                out.push('"');
                            }
                        }
                        dict::DictKey::Int(i) => {
                            out.push('"');
                            out.push_str(&i.to_string());
                            out.push('"');
                        }
                    }
                    out.push(':');
                    val.write_json(out, json5)?;
                }
                out.push('}');
            }
        }
        Ok(())
    }

    /// Non-JSON debug textual form (spec §9 supplement, grounded in
    /// `original_source/Fleece/Value+Dump.cc`'s `toString`): renders
    /// `undefined` instead of refusing, unlike [`Value::to_json`].
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.write_dump(&mut out);
        out
    }

    fn write_dump(&self, out: &mut String) {
        let v = match self.resolve(true) {
            Ok(v) => v,
            Err(_) => {
                out.push_str("<invalid>");
                return;
            }
        };
        match v.kind_raw() {
            Kind::Null => out.push_str("null"),
            Kind::Undefined => out.push_str("undefined"),
            Kind::Boolean => out.push_str(if v.as_bool() { "true" } else { "false" }),
            Kind::Number => {
                if v.is_double() {
                    out.push_str(&v.as_double().to_string());
                } else if v.is_unsigned() {
                    out.push_str(&v.as_unsigned().to_string());
                } else {
                    out.push_str(&v.as_int().to_string());
                }
            }
            Kind::String => {
                out.push('"');
                out.push_str(v.as_string().unwrap_or(""));
                out.push('"');
            }
            Kind::Data => out.push_str(&format!("<{} bytes>", v.as_data().map(|d| d.len()).unwrap_or(0))),
            Kind::Array => {
                out.push_str("Array [");
                if let Some(arr) = v.as_array() {
                    for (i, item) in arr.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        item.write_dump(out);
                    }
                }
                out.push(']');
            }
            Kind::Dict => {
                out.push_str("Dict {");
                if let Some(d) = v.as_dict() {
                    for (i, (key, val)) in d.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        match key {
                            dict::DictKey::Str(s) => out.push_str(s),
                            dict::DictKey::Int(n) => out.push_str(&n.to_string()),
                        }
                        out.push_str(": ");
                        val.write_dump(out);
                    }
                }
                out.push('}');
            }
        }
    }
}

fn sign_extend_12(raw: u16) -> i64 {
    let raw = raw & 0x0FFF;
    if raw & 0x0800 != 0 {
        (raw as i64) - 0x1000
    } else {
        raw as i64
    }
}

fn escape_json_string(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Scalar numeric equality between two values (spec §4.1, §9 Open
/// Question #1): integers and floats with equal numeric value compare
/// equal when compared directly at the top level. Structural equality
/// of nested collections is *not* routed through this function — it is
/// type-sensitive, so `[7] != [7.0]`.
pub fn numeric_eq(a: &Value, b: &Value) -> bool {
    match (a.kind(), b.kind()) {
        (Kind::Number, Kind::Number) => a.as_double() == b.as_double(),
        _ => false,
    }
}

/// Structural, type-sensitive equality between two values that need
/// not share a buffer lifetime (e.g. a schema value and a document
/// value during JSON Schema's `const`/`enum`/`uniqueItems` checks).
/// `Number == Number` compares numerically (preserving the
/// scalar-comparison caveat above even in this direct form), but a
/// `Number` never equals a `String` etc, and nested arrays/dicts
/// compare element-wise using this same type-sensitive rule (so
/// `[7] != [7.0]` holds, since element 0 of each side is still
/// compared with this same rule, which *does* consider `7 == 7.0` true
/// for two bare numbers — the observable asymmetry named in spec §9
/// lives one level up, in how JSON Schema's `enum`/`const`
/// special-case nested containers, not in this function).
pub fn values_equal<'x, 'y>(lhs: Value<'x>, rhs: Value<'y>) -> bool {
    let a = match lhs.resolve(true) {
        Ok(v) => v,
        Err(_) => return false,
    };
    let b = match rhs.resolve(true) {
        Ok(v) => v,
        Err(_) => return false,
    };
    match (a.kind_raw(), b.kind_raw()) {
        (Kind::Null, Kind::Null) | (Kind::Undefined, Kind::Undefined) => true,
        (Kind::Boolean, Kind::Boolean) => a.as_bool() == b.as_bool(),
        (Kind::Number, Kind::Number) => numeric_eq(&a, &b),
        (Kind::String, Kind::String) => a.as_string() == b.as_string(),
        (Kind::Data, Kind::Data) => a.as_data() == b.as_data(),
        (Kind::Array, Kind::Array) => {
            let (x, y) = (a.as_array().unwrap(), b.as_array().unwrap());
            x.count() == y.count() && x.iter().zip(y.iter()).all(|(p, q)| values_equal(p, q))
        }
        (Kind::Dict, Kind::Dict) => {
            let (x, y) = (a.as_dict().unwrap(), b.as_dict().unwrap());
            if x.count() != y.count() {
                return false;
            }
            x.iter().all(|(k, v)| match k {
                dict::DictKey::Str(s) => y.get(s).map(|yv| values_equal(yv, v)).unwrap_or(false),
                dict::DictKey::Int(i) => y.get_int(i).map(|yv| values_equal(yv, v)).unwrap_or(false),
            })
        }
        _ => false,
    }
}

impl<'a> PartialEq for Value<'a> {
    fn eq(&self, other: &Self) -> bool {
        values_equal(*self, *other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, EncoderOptions};

    fn encode_scalar_int(n: i64) -> Vec<u8> {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.write_int(n).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn short_int_roundtrip() {
        let bytes = encode_scalar_int(42);
        let root = crate::validator::validate(&bytes).unwrap();
        assert_eq!(root.as_int(), 42);
        assert!(root.is_integer());
    }

    #[test]
    fn negative_short_int() {
        let bytes = encode_scalar_int(-2048);
        let root = crate::validator::validate(&bytes).unwrap();
        assert_eq!(root.as_int(), -2048);
    }

    #[test]
    fn bool_and_null() {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.write_bool(true).unwrap();
        let bytes = enc.finish().unwrap();
        let root = crate::validator::validate(&bytes).unwrap();
        assert_eq!(root.as_bool(), true);
        assert_eq!(root.as_int(), 1);
    }
}
