//! Structural validation of an untrusted buffer before any [`Value`] is
//! handed to a caller (spec §4.2).
//!
//! Walks every value reachable from the root with an explicit stack
//! (never recursion, so a hostile buffer can't blow it), checking bounds,
//! alignment, UTF-8, and backward-only pointer reach as it goes. Grounded
//! in `examples/only-cliches-NoProto/src/pointer/mod.rs`'s bounds-checked
//! accessors, generalized from "check one field at a time" to a full
//! reachability walk the way `original_source/Fleece/Value.cc`'s
//! `validate` does.

use crate::error::{Error, Result};
use crate::value::tags::tag;
use crate::value::Value;
use std::collections::HashSet;

/// Validates `buf` as a complete document, returning the root value on
/// success. Every reachable address is checked for in-bounds headers,
/// in-bounds payloads, even alignment, valid UTF-8 (for strings), and
/// strictly-backward pointer targets.
pub fn validate(buf: &[u8]) -> Result<Value<'_>> {
    if buf.len() < 2 || buf.len() % 2 != 0 {
        return Err(Error::InvalidData(format!(
            "buffer length {} is not a positive even number",
            buf.len()
        )));
    }
    let root_addr = buf.len() - 2;
    if root_addr == 0 {
        // A two-byte buffer: the root is an inline value, not a pointer.
        validate_reachable(buf, 0, false)?;
        return Ok(Value::at(buf, 0));
    }
    let root_slot = Value::at(buf, root_addr);
    if !root_slot.is_pointer_byte() {
        return Err(Error::InvalidData(
            "trailing two bytes are not a root pointer".into(),
        ));
    }
    let root = validate_reachable(buf, root_addr, false)?;
    Ok(root)
}

/// Validates `buf` without walking it, trusting the caller. Used by
/// decoders that already know the bytes came from this crate's own
/// encoder (spec §4.2's `from_trusted_data` fast path).
pub fn from_trusted_data(buf: &[u8]) -> Result<Value<'_>> {
    if buf.len() < 2 {
        return Err(Error::InvalidData("buffer too short to hold a root".into()));
    }
    let root_addr = buf.len() - 2;
    if root_addr == 0 {
        return Ok(Value::at(buf, 0));
    }
    Value::at(buf, root_addr).resolve(false)
}

/// Walks the pointer chain and reachability graph starting at `addr`,
/// returning the fully-resolved non-pointer value the chain lands on.
fn validate_reachable<'a>(buf: &'a [u8], addr: usize, wide: bool) -> Result<Value<'a>> {
    let mut visited: HashSet<usize> = HashSet::new();
    let mut cur_addr = addr;
    let mut cur_wide = wide;
    let result = loop {
        let v = validate_one(buf, cur_addr, cur_wide, &mut visited)?;
        if v.is_pointer_byte() {
            let target = v.deref_pointer(cur_wide)?;
            cur_addr = target.addr();
            cur_wide = true; // spec §3.2: chained hops are always wide
            continue;
        }
        break v;
    };
    Ok(result)
}

/// Validates the single value header at `addr` (not following pointers
/// itself) and, if it's a collection, pushes its slots onto an explicit
/// stack for iterative validation. Returns the value at `addr` so the
/// caller can decide whether to chase a further pointer hop.
fn validate_one<'a>(
    buf: &'a [u8],
    addr: usize,
    wide_if_pointer: bool,
    visited: &mut HashSet<usize>,
) -> Result<Value<'a>> {
    let mut stack: Vec<(usize, bool)> = vec![(addr, wide_if_pointer)];
    let root_value = Value::at(buf, addr);

    while let Some((a, slot_wide)) = stack.pop() {
        if !visited.insert(a) {
            continue;
        }
        if a % 2 != 0 {
            return Err(Error::InvalidData(format!("value at {} is not 2-byte aligned", a)));
        }
        if a + 2 > buf.len() {
            return Err(Error::InvalidData(format!("value header at {} out of bounds", a)));
        }
        let v = Value::at(buf, a);
        if v.is_pointer_byte() {
            let pointer_span = if slot_wide { 4 } else { 2 };
            if a + pointer_span > buf.len() {
                return Err(Error::InvalidData(format!("pointer at {} out of bounds", a)));
            }
            let target = v.deref_pointer(slot_wide)?;
            if target.addr() >= a {
                return Err(Error::OutOfRange(format!(
                    "pointer at {} does not point strictly backward",
                    a
                )));
            }
            stack.push((target.addr(), true));
            continue;
        }
        let size = v.data_size()?;
        if a + size > buf.len() {
            return Err(Error::InvalidData(format!(
                "value at {} (size {}) runs past end of buffer",
                a, size
            )));
        }
        match v.tag_nibble() {
            t if t == tag::STRING => {
                let bytes = v.raw_string_bytes()?;
                std::str::from_utf8(bytes)
                    .map_err(|_| Error::InvalidData(format!("invalid utf-8 in string at {}", a)))?;
            }
            t if t == tag::ARRAY => {
                let (count, header_len, wide) = v.collection_count_and_header()?;
                let slot_width = if wide { 4 } else { 2 };
                for i in 0..count {
                    stack.push((a + header_len + i * slot_width, wide));
                }
            }
            t if t == tag::DICT => {
                let (count, header_len, wide) = v.collection_count_and_header()?;
                let slot_width = if wide { 4 } else { 2 };
                for i in 0..count {
                    let key_addr = a + header_len + i * 2 * slot_width;
                    stack.push((key_addr, wide));
                    stack.push((key_addr + slot_width, wide));
                }
            }
            _ => {}
        }
    }
    Ok(root_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, EncoderOptions};

    #[test]
    fn rejects_odd_length() {
        let buf = [0u8, 1, 2];
        assert!(validate(&buf).is_err());
    }

    #[test]
    fn rejects_forward_pointer() {
        // A crafted two-slot buffer where the "root pointer" points
        // forward past itself instead of backward.
        let buf = [0x00, 0x00, 0x80, 0x01];
        assert!(validate(&buf).is_err());
    }

    #[test]
    fn accepts_encoder_output() {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.begin_array(None).unwrap();
        enc.write_int(1).unwrap();
        enc.write_string("hi").unwrap();
        enc.end_array().unwrap();
        let bytes = enc.finish().unwrap();
        let root = validate(&bytes).unwrap();
        let arr = root.as_array().unwrap();
        assert_eq!(arr.count(), 2);
    }
}
