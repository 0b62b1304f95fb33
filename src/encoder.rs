//! Single-pass encoder (spec §4.6): builds one array/dict/scalar tree with
//! a fixed-depth stack of open collections, writing narrow or wide slots
//! once each collection's pointer widths are known.
//!
//! Grounded in `examples/original_source/Fleece/Encoder.cc`: the pending-item
//! stack (`valueArray`/`_stack`), the "inline if it fits in four bytes,
//! otherwise emit out-of-line and point at it" rule (`writeRawValue`), the
//! string dedup table (`StringTable`/`_strings`), and `sortDict`'s
//! permutation sort. Reworked onto this crate's little-endian, uniform
//! two-byte-header layout and backward-only pointers instead of Fleece's
//! own bit layout.

use crate::error::{Error, Result};
use crate::value::tags::{flag, special, tag};
use crate::value::{dict::DictKey, Kind, Value};
use crate::writer::Writer;
use std::collections::HashMap;

/// Collections deeper than this are rejected rather than silently growing
/// the stack without bound (spec §4.6).
const MAX_STACK_DEPTH: usize = 10;
/// Strings longer than this are never deduped; not worth a hash lookup.
const MAX_SHARED_STRING_SIZE: usize = 15;

#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Write each distinct string's payload only once, pointing later
    /// occurrences back at the first (spec §4.6 step 2).
    pub unique_strings: bool,
    /// Write dict keys in sorted order so lookups can binary search
    /// (spec §4.3).
    pub sort_keys: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            unique_strings: true,
            sort_keys: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameTag {
    Top,
    Array,
    Dict,
}

#[derive(Clone)]
enum Pending {
    /// A value small enough to live directly in its slot: the low `len`
    /// bytes are meaningful, the rest zero padding. `len` is only used to
    /// decide whether the *frame* must go wide; the bytes themselves are
    /// already zero-padded out to 4.
    Inline { bytes: [u8; 4], len: usize },
    /// A value written out-of-line at absolute stream position `pos`
    /// (in the base+output combined addressing space).
    Pointer(u64),
}

struct Frame {
    tag: FrameTag,
    items: Vec<Pending>,
    /// One entry per key/value pair, parallel to `items[0], items[2], ...`
    /// Populated only for `Dict` frames when `sort_keys` is on.
    keys: Vec<SortKey>,
    wide: bool,
}

impl Frame {
    fn new(tag: FrameTag) -> Self {
        Frame {
            tag,
            items: Vec::new(),
            keys: Vec::new(),
            wide: false,
        }
    }
}

#[derive(Clone)]
enum SortKey {
    Str(String),
    Int(i64),
}

impl SortKey {
    fn cmp_to(&self, other: &SortKey) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (SortKey::Int(a), SortKey::Int(b)) => a.cmp(b),
            (SortKey::Int(_), SortKey::Str(_)) => Ordering::Less,
            (SortKey::Str(_), SortKey::Int(_)) => Ordering::Greater,
            (SortKey::Str(a), SortKey::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
        }
    }
}

/// Builds one encoded document. Not reusable across documents; create a
/// fresh `Encoder` for each call to `finish`.
pub struct Encoder {
    out: Writer,
    base_len: u64,
    stack: Vec<Frame>,
    strings: HashMap<String, u64>,
    opts: EncoderOptions,
    writing_key: bool,
    blocked_on_key: bool,
}

impl Encoder {
    pub fn new(opts: EncoderOptions) -> Self {
        Encoder {
            out: Writer::new(),
            base_len: 0,
            stack: vec![Frame::new(FrameTag::Top)],
            strings: HashMap::new(),
            opts,
            writing_key: false,
            blocked_on_key: false,
        }
    }

    /// Starts a delta/patch encoder: `base` is an already-encoded document
    /// that stays immutable. Pointers in the new output may reach back
    /// into it, and [`Encoder::write_existing`] can re-point at a value
    /// already there instead of re-encoding it (spec §4.7's delta mode).
    pub fn with_base(base: &[u8], opts: EncoderOptions) -> Self {
        let mut enc = Encoder::new(opts);
        enc.base_len = base.len() as u64;
        enc
    }

    fn top(&mut self) -> &mut Frame {
        self.stack.last_mut().expect("stack always has a Top frame")
    }

    fn abs_pos(&self) -> u64 {
        self.base_len + self.out.position() as u64
    }

    fn check_not_blocked(&self) -> Result<()> {
        if self.blocked_on_key {
            return Err(Error::EncodeError("need a key before this value".into()));
        }
        Ok(())
    }

    /// Mirrors `Encoder::addItem` in `original_source/Fleece/Encoder.cc`:
    /// every written value (including a collection's own pointer, once
    /// closed) passes through here, which drives the key/value
    /// alternation state machine for whichever frame is on top.
    fn add_item(&mut self, item: Pending, key: Option<SortKey>) -> Result<()> {
        if self.blocked_on_key {
            return Err(Error::EncodeError("need a key before this value".into()));
        }
        if self.writing_key {
            self.writing_key = false;
        } else if self.top().tag == FrameTag::Dict {
            self.blocked_on_key = true;
            self.writing_key = true;
        }
        let frame = self.top();
        frame.items.push(item);
        if let Some(k) = key {
            frame.keys.push(k);
        }
        Ok(())
    }

    /// Adds `bytes` (a complete, already even-padded header+payload) as
    /// the next item: inline if it fits in four bytes, otherwise written
    /// out-of-line and referenced by pointer (spec §4.6 step 1).
    fn add_raw(&mut self, bytes: &[u8], key: Option<SortKey>) -> Result<()> {
        if bytes.len() <= 4 {
            let mut buf = [0u8; 4];
            buf[..bytes.len()].copy_from_slice(bytes);
            if bytes.len() > 2 {
                self.force_wide();
            }
            self.add_item(
                Pending::Inline {
                    bytes: buf,
                    len: bytes.len(),
                },
                key,
            )
        } else {
            let pos = self.abs_pos();
            self.out.write(bytes)?;
            self.add_item(Pending::Pointer(pos), key)
        }
    }

    fn force_wide(&mut self) {
        self.top().wide = true;
    }

    // ---- scalars ----

    pub fn write_null(&mut self) -> Result<()> {
        self.add_raw(&[tag::SPECIAL << 4, special::NULL], None)
    }

    pub fn write_bool(&mut self, b: bool) -> Result<()> {
        let v = if b { special::TRUE } else { special::FALSE };
        self.add_raw(&[tag::SPECIAL << 4, v], None)
    }

    pub fn write_undefined(&mut self) -> Result<()> {
        self.add_raw(&[tag::SPECIAL << 4, special::UNDEFINED], None)
    }

    pub fn write_int(&mut self, i: i64) -> Result<()> {
        if (-2048..2048).contains(&i) {
            self.write_short_int(i)
        } else {
            self.write_sized_int(i as u64, false)
        }
    }

    pub fn write_uint(&mut self, u: u64) -> Result<()> {
        if u < 2048 {
            self.write_short_int(u as i64)
        } else {
            self.write_sized_int(u, true)
        }
    }

    fn write_short_int(&mut self, i: i64) -> Result<()> {
        let raw = (i & 0x0FFF) as u16;
        let b0 = (tag::SHORT << 4) | ((raw >> 8) as u8 & 0x0F);
        let b1 = (raw & 0xFF) as u8;
        self.add_raw(&[b0, b1], None)
    }

    fn write_sized_int(&mut self, u: u64, unsigned: bool) -> Result<()> {
        let len = if unsigned {
            minimal_unsigned_len(u)
        } else {
            minimal_signed_len(u as i64)
        };
        let mut bytes = Vec::with_capacity(2 + len + 1);
        let mut b0 = (tag::INT << 4) | ((len as u8 - 1) & flag::COUNT_MASK);
        if unsigned {
            b0 |= flag::INT_UNSIGNED;
        }
        bytes.push(b0);
        bytes.push(0);
        for i in 0..len {
            bytes.push(((u >> (8 * i)) & 0xFF) as u8);
        }
        if bytes.len() % 2 != 0 {
            bytes.push(0);
        }
        self.add_raw(&bytes, None)
    }

    pub fn write_double(&mut self, n: f64) -> Result<()> {
        if n.is_nan() {
            return Err(Error::EncodeError("cannot encode NaN".into()));
        }
        if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
            return self.write_int(n as i64);
        }
        if (n as f32) as f64 == n {
            return self.write_float(n as f32);
        }
        let mut bytes = vec![(tag::FLOAT << 4) | flag::FLOAT_DOUBLE, 0];
        bytes.extend_from_slice(&n.to_le_bytes());
        self.add_raw(&bytes, None)
    }

    pub fn write_float(&mut self, n: f32) -> Result<()> {
        if n.is_nan() {
            return Err(Error::EncodeError("cannot encode NaN".into()));
        }
        if n.fract() == 0.0 && n >= i32::MIN as f32 && n <= i32::MAX as f32 {
            return self.write_int(n as i64);
        }
        let mut bytes = vec![tag::FLOAT << 4, 0];
        bytes.extend_from_slice(&n.to_le_bytes());
        self.add_raw(&bytes, None)
    }

    // ---- strings / data ----

    fn string_header(t: u8, len: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + len);
        if len < flag::LONG_LENGTH as usize {
            bytes.push((t << 4) | len as u8);
        } else {
            bytes.push((t << 4) | flag::LONG_LENGTH);
            crate::byteio::write_varint(&mut bytes, len as u64);
        }
        bytes
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_string_impl(s, None)
    }

    fn write_string_impl(&mut self, s: &str, key: Option<SortKey>) -> Result<()> {
        let header = Encoder::string_header(tag::STRING, s.len());
        let total = header.len() + s.len();
        if self.opts.unique_strings && s.len() <= MAX_SHARED_STRING_SIZE && total > 4 {
            if let Some(&pos) = self.strings.get(s) {
                return self.add_item(Pending::Pointer(pos), key);
            }
        }
        if total <= 4 {
            let mut bytes = header;
            bytes.extend_from_slice(s.as_bytes());
            return self.add_raw(&bytes, key);
        }
        let pos = self.abs_pos();
        self.out.write(&header)?;
        self.out.write(s.as_bytes())?;
        self.out.pad_to_even()?;
        if self.opts.unique_strings && s.len() <= MAX_SHARED_STRING_SIZE {
            self.strings.insert(s.to_string(), pos);
        }
        self.add_item(Pending::Pointer(pos), key)
    }

    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let header = Encoder::string_header(tag::DATA, data.len());
        let total = header.len() + data.len();
        if total <= 4 {
            let mut bytes = header;
            bytes.extend_from_slice(data);
            return self.add_raw(&bytes, None);
        }
        let pos = self.abs_pos();
        self.out.write(&header)?;
        self.out.write(data)?;
        self.out.pad_to_even()?;
        self.add_item(Pending::Pointer(pos), None)
    }

    // ---- collections ----

    pub fn begin_array(&mut self, _reserve: Option<usize>) -> Result<()> {
        self.push_frame(FrameTag::Array)
    }

    pub fn begin_dict(&mut self, _reserve: Option<usize>) -> Result<()> {
        self.push_frame(FrameTag::Dict)?;
        self.writing_key = true;
        self.blocked_on_key = true;
        Ok(())
    }

    fn push_frame(&mut self, tag: FrameTag) -> Result<()> {
        self.check_not_blocked()?;
        if self.stack.len() >= MAX_STACK_DEPTH {
            return Err(Error::EncodeError(format!(
                "collection nesting exceeds the maximum depth of {}",
                MAX_STACK_DEPTH
            )));
        }
        self.stack.push(Frame::new(tag));
        Ok(())
    }

    pub fn write_key_str(&mut self, key: &str) -> Result<()> {
        self.begin_key()?;
        self.write_string_impl(key, Some(SortKey::Str(key.to_string())))
    }

    pub fn write_key_int(&mut self, key: i64) -> Result<()> {
        self.begin_key()?;
        self.write_short_int_key(key)
    }

    fn write_short_int_key(&mut self, key: i64) -> Result<()> {
        if (-2048..2048).contains(&key) {
            self.write_short_int(key)?;
        } else {
            self.write_sized_int(key as u64, false)?;
        }
        self.top().keys.push(SortKey::Int(key));
        Ok(())
    }

    fn begin_key(&mut self) -> Result<()> {
        if self.top().tag != FrameTag::Dict {
            return Err(Error::EncodeError("not writing a dict".into()));
        }
        if !self.blocked_on_key {
            return Err(Error::EncodeError("need a value before the next key".into()));
        }
        self.blocked_on_key = false;
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<()> {
        self.end_collection(FrameTag::Array)
    }

    pub fn end_dict(&mut self) -> Result<()> {
        if !self.writing_key {
            return Err(Error::EncodeError("need a value before ending the dict".into()));
        }
        self.end_collection(FrameTag::Dict)
    }

    fn end_collection(&mut self, expected: FrameTag) -> Result<()> {
        if self.stack.len() < 2 {
            return Err(Error::EncodeError("not inside a collection".into()));
        }
        if self.top().tag != expected {
            return Err(Error::EncodeError("ending the wrong kind of collection".into()));
        }
        let mut frame = self.stack.pop().unwrap();
        self.writing_key = false;
        self.blocked_on_key = false;

        if expected == FrameTag::Dict && self.opts.sort_keys {
            sort_dict(&mut frame);
        }

        let count = if expected == FrameTag::Dict {
            frame.items.len() / 2
        } else {
            frame.items.len()
        };

        if count == 0 {
            // Empty collections inline as a bare two-byte header, just
            // like any other tiny raw value.
            let t = if expected == FrameTag::Dict { tag::DICT } else { tag::ARRAY };
            return self.add_raw(&[t << 4, 0], None);
        }

        let header = Encoder::collection_header(expected, count as u64, false);
        let wide = frame.wide || Encoder::pointer_reach_needs_wide(self, &frame, header.len());

        let header = Encoder::collection_header(expected, count as u64, wide);
        let pos = self.abs_pos();
        self.out.write(&header)?;

        let slot_base = self.abs_pos();
        let width = if wide { 4usize } else { 2usize };
        for (i, item) in frame.items.iter().enumerate() {
            let slot_addr = slot_base + (i * width) as u64;
            let bytes = self.render_slot(item, slot_addr, wide)?;
            self.out.write(&bytes)?;
        }

        self.add_item(Pending::Pointer(pos), None)
    }

    /// Whether any pointer among `frame`'s items would overflow a narrow
    /// (15-bit) backward offset once the collection's header and slots are
    /// laid out, starting right after `header_len` more bytes are written.
    fn pointer_reach_needs_wide(enc: &Encoder, frame: &Frame, header_len: usize) -> bool {
        let slot_base = enc.abs_pos() + header_len as u64;
        let mut addr = slot_base;
        for item in &frame.items {
            if let Pending::Pointer(target) = item {
                let back = addr.saturating_sub(*target);
                if back > crate::value::tags::NARROW_POINTER_MAX_REACH {
                    return true;
                }
            }
            addr += 2; // narrow assumption while probing; wide items never overflow narrow probing early
        }
        false
    }

    fn collection_header(tag_kind: FrameTag, count: u64, wide: bool) -> Vec<u8> {
        let t = if tag_kind == FrameTag::Dict { tag::DICT } else { tag::ARRAY };
        let mut bytes = Vec::with_capacity(2);
        let mut b0 = t << 4;
        if wide {
            b0 |= flag::COLLECTION_WIDE;
        }
        if count < flag::LONG_COUNT as u64 {
            bytes.push(b0 | ((count >> 8) as u8 & flag::COUNT_MASK));
            bytes.push((count & 0xFF) as u8);
        } else {
            bytes.push(b0 | 0x07);
            bytes.push(0xFF);
            crate::byteio::write_varint(&mut bytes, count);
        }
        if bytes.len() % 2 != 0 {
            bytes.push(0);
        }
        bytes
    }

    /// Renders one slot's final bytes given the collection's chosen
    /// width, converting any still-pending absolute pointer into a
    /// relative backward offset from `slot_addr`.
    fn render_slot(&self, item: &Pending, slot_addr: u64, wide: bool) -> Result<Vec<u8>> {
        let width = if wide { 4 } else { 2 };
        match item {
            Pending::Inline { bytes, .. } => Ok(bytes[..width].to_vec()),
            Pending::Pointer(target) => {
                let back = slot_addr.saturating_sub(*target);
                if back == 0 || back % 2 != 0 {
                    return Err(Error::EncodeError("pointer target misaligned".into()));
                }
                let units = back / 2;
                let max = if wide {
                    crate::value::tags::WIDE_POINTER_MAX_REACH
                } else {
                    crate::value::tags::NARROW_POINTER_MAX_REACH
                };
                if back > max {
                    return Err(Error::EncodeError("pointer reach exceeds collection width".into()));
                }
                let mut out = Vec::with_capacity(width);
                if wide {
                    out.push((0x80 | ((units >> 24) & 0x7F)) as u8);
                    out.push(((units >> 16) & 0xFF) as u8);
                    out.push(((units >> 8) & 0xFF) as u8);
                    out.push((units & 0xFF) as u8);
                } else {
                    out.push((0x80 | ((units >> 8) & 0x7F)) as u8);
                    out.push((units & 0xFF) as u8);
                }
                Ok(out)
            }
        }
    }

    /// Points at a value that already lives in this encoder's `base`
    /// buffer instead of re-encoding it, for the mutable overlay's
    /// unchanged-subtree fast path (spec §4.7).
    pub fn write_existing(&mut self, v: Value) -> Result<()> {
        self.add_item(Pending::Pointer(v.addr() as u64), None)
    }

    /// Deep-copies a value read from any buffer into this encoder's
    /// output, recursing into arrays/dicts. Used when a value must be
    /// moved rather than pointed at (its source buffer isn't this
    /// encoder's base).
    pub fn write_value(&mut self, v: Value) -> Result<()> {
        match v.kind() {
            Kind::Null => self.write_null(),
            Kind::Undefined => self.write_undefined(),
            Kind::Boolean => self.write_bool(v.as_bool()),
            Kind::Number => {
                if v.is_double() {
                    self.write_double(v.as_double())
                } else if v.is_unsigned() {
                    self.write_uint(v.as_unsigned())
                } else {
                    self.write_int(v.as_int())
                }
            }
            Kind::String => self.write_string(v.as_string().unwrap_or("")),
            Kind::Data => self.write_data(v.as_data().unwrap_or(&[])),
            Kind::Array => {
                let arr = v.as_array().ok_or_else(|| Error::InvalidData("not an array".into()))?;
                self.begin_array(Some(arr.count()))?;
                for item in arr.iter() {
                    self.write_value(item)?;
                }
                self.end_array()
            }
            Kind::Dict => {
                let d = v.as_dict().ok_or_else(|| Error::InvalidData("not a dict".into()))?;
                self.begin_dict(Some(d.count()))?;
                for (key, val) in d.iter() {
                    match key {
                        DictKey::Str(s) => self.write_key_str(s)?,
                        DictKey::Int(i) => self.write_key_int(i)?,
                    }
                    self.write_value(val)?;
                }
                self.end_dict()
            }
        }
    }

    /// Finishes the document, consuming the encoder. Exactly one
    /// top-level value must have been written.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.stack.len() != 1 {
            return Err(Error::EncodeError("unclosed array/dict".into()));
        }
        let mut top = self.stack.pop().unwrap();
        if top.items.len() != 1 {
            return Err(Error::EncodeError(
                "exactly one top-level value must be written".into(),
            ));
        }
        let item = top.items.pop().unwrap();
        match item {
            Pending::Pointer(target) => {
                // Root is always referenced by a narrow pointer.
                let end = self.abs_pos();
                let back = end.saturating_sub(target);
                if back == 0 || back % 2 != 0 || back > crate::value::tags::NARROW_POINTER_MAX_REACH {
                    return Err(Error::EncodeError("root pointer out of narrow range".into()));
                }
                let units = back / 2;
                self.out
                    .write(&[(0x80 | ((units >> 8) & 0x7F)) as u8, (units & 0xFF) as u8])?;
            }
            Pending::Inline { bytes, len } => {
                if len <= 2 && self.out.is_empty() {
                    self.out.write(&bytes[..2])?;
                } else {
                    let pos = self.abs_pos();
                    let width = if len > 2 { 4 } else { 2 };
                    self.out.write(&bytes[..width])?;
                    let end = self.abs_pos();
                    let back = end - pos;
                    let units = back / 2;
                    self.out
                        .write(&[(0x80 | ((units >> 8) & 0x7F)) as u8, (units & 0xFF) as u8])?;
                }
            }
        }
        Ok(self.out.finish())
    }
}

fn minimal_unsigned_len(u: u64) -> usize {
    let mut len = 1;
    while len < 8 && u >= (1u64 << (8 * len)) {
        len += 1;
    }
    len
}

fn minimal_signed_len(i: i64) -> usize {
    let mut len = 1;
    while len < 8 {
        let min = -(1i64 << (8 * len - 1));
        let max = (1i64 << (8 * len - 1)) - 1;
        if i >= min && i <= max {
            break;
        }
        len += 1;
    }
    len
}

fn sort_dict(frame: &mut Frame) {
    let n = frame.keys.len();
    if n < 2 {
        return;
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| frame.keys[a].cmp_to(&frame.keys[b]));

    let old_items = frame.items.clone();
    let old_keys = frame.keys.clone();
    for (new_i, &old_i) in order.iter().enumerate() {
        frame.items[2 * new_i] = old_items[2 * old_i].clone();
        frame.items[2 * new_i + 1] = old_items[2 * old_i + 1].clone();
        frame.keys[new_i] = old_keys[old_i].clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate;

    #[test]
    fn array_of_scalars() {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.begin_array(None).unwrap();
        enc.write_int(1).unwrap();
        enc.write_int(2).unwrap();
        enc.write_bool(true).unwrap();
        enc.write_string("hello").unwrap();
        enc.end_array().unwrap();
        let bytes = enc.finish().unwrap();
        let root = validate(&bytes).unwrap();
        let arr = root.as_array().unwrap();
        assert_eq!(arr.count(), 4);
        assert_eq!(arr.get(0).unwrap().as_int(), 1);
        assert_eq!(arr.get(3).unwrap().as_string(), Some("hello"));
    }

    #[test]
    fn string_dedup() {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.begin_array(None).unwrap();
        enc.write_string("a repeated string value").unwrap();
        enc.write_string("a repeated string value").unwrap();
        enc.end_array().unwrap();
        let bytes = enc.finish().unwrap();
        let root = validate(&bytes).unwrap();
        let arr = root.as_array().unwrap();
        assert_eq!(arr.get(0).unwrap().as_string(), arr.get(1).unwrap().as_string());
    }

    #[test]
    fn large_array_forces_long_count() {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.begin_array(None).unwrap();
        for i in 0..2100i64 {
            enc.write_int(i).unwrap();
        }
        enc.end_array().unwrap();
        let bytes = enc.finish().unwrap();
        let root = validate(&bytes).unwrap();
        let arr = root.as_array().unwrap();
        assert_eq!(arr.count(), 2100);
        for i in [0usize, 1000, 2099] {
            assert_eq!(arr.get(i).unwrap().as_int(), i as i64);
        }
    }

    #[test]
    fn rejects_unclosed_collection() {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.begin_array(None).unwrap();
        enc.write_int(1).unwrap();
        assert!(enc.finish().is_err());
    }
}
