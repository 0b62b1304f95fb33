//! Dict lookup (spec §4.3): binary search over sorted key slots, with a
//! cached lookup key fast path and an unsorted linear fallback.
//!
//! Grounded in `examples/only-cliches-NoProto/src/collection/table.rs`'s
//! vtable binary search, generalized from fixed column indices to
//! sorted string/int keys the way `original_source/Fleece/Dict.cc`'s
//! `findExact`/cached-key algorithm does.

use super::tags::tag;
use super::Value;
use crate::error::Result;
use std::cmp::Ordering;

/// A dict key as read off a key slot: either a shared-key integer or a
/// borrowed string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictKey<'a> {
    Str(&'a str),
    Int(i64),
}

impl<'a> DictKey<'a> {
    fn cmp_to(&self, other: &DictKey<'a>) -> Ordering {
        match (self, other) {
            // spec §4.3: integer keys sort before string keys.
            (DictKey::Int(a), DictKey::Int(b)) => a.cmp(b),
            (DictKey::Int(_), DictKey::Str(_)) => Ordering::Less,
            (DictKey::Str(_), DictKey::Int(_)) => Ordering::Greater,
            (DictKey::Str(a), DictKey::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
        }
    }
}

#[derive(Clone, Copy)]
pub struct DictView<'a> {
    buf: &'a [u8],
    first: usize,
    count: usize,
    wide: bool,
}

impl<'a> DictView<'a> {
    pub(crate) fn from_value(v: Value<'a>) -> Result<DictView<'a>> {
        let (count, header_len, wide) = v.collection_count_and_header()?;
        Ok(DictView {
            buf: v.buf(),
            first: v.addr() + header_len,
            count,
            wide,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_wide(&self) -> bool {
        self.wide
    }

    fn slot_width(&self) -> usize {
        if self.wide {
            4
        } else {
            2
        }
    }

    fn key_slot_addr(&self, i: usize) -> usize {
        self.first + i * 2 * self.slot_width()
    }

    fn value_slot_addr(&self, i: usize) -> usize {
        self.key_slot_addr(i) + self.slot_width()
    }

    fn key_at(&self, i: usize) -> Option<DictKey<'a>> {
        if i >= self.count {
            return None;
        }
        let slot = Value::at(self.buf, self.key_slot_addr(i));
        let resolved = slot.resolve(self.wide).ok()?;
        if resolved.tag_nibble() == tag::SHORT {
            Some(DictKey::Int(resolved.as_int()))
        } else {
            resolved.as_string().map(DictKey::Str)
        }
    }

    fn value_at(&self, i: usize) -> Option<Value<'a>> {
        if i >= self.count {
            return None;
        }
        Value::at(self.buf, self.value_slot_addr(i))
            .resolve(self.wide)
            .ok()
    }

    /// Binary search by string key. Requires the dict to be sorted
    /// (the default encoder behavior; see [`DictView::get_unsorted`]
    /// for dicts encoded with `sort_keys = false`).
    pub fn get(&self, key: &str) -> Option<Value<'a>> {
        let target = DictKey::Str(key);
        self.binary_search(&target).and_then(|i| self.value_at(i))
    }

    pub fn get_int(&self, key: i64) -> Option<Value<'a>> {
        let target = DictKey::Int(key);
        self.binary_search(&target).and_then(|i| self.value_at(i))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn binary_search(&self, target: &DictKey<'a>) -> Option<usize> {
        let mut lo = 0i64;
        let mut hi = self.count as i64 - 1;
        while lo <= hi {
            let mid = (lo + hi) / 2;
            let mid_key = self.key_at(mid as usize)?;
            match mid_key.cmp_to(target) {
                Ordering::Equal => return Some(mid as usize),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid - 1,
            }
        }
        None
    }

    /// Linear fallback for dicts encoded with `sort_keys = false`
    /// (spec §4.3).
    pub fn get_unsorted(&self, key: &str) -> Option<Value<'a>> {
        for i in 0..self.count {
            if self.key_at(i) == Some(DictKey::Str(key)) {
                return self.value_at(i);
            }
        }
        None
    }

    /// A sorted-key-array lookup that walks both sequences in tandem,
    /// amortizing the cost of looking up several keys at once (spec
    /// §4.3's "multi-key lookup").
    pub fn get_many<'k>(&self, sorted_keys: &[&'k str]) -> Vec<(&'k str, Option<Value<'a>>)> {
        let mut out = Vec::with_capacity(sorted_keys.len());
        let mut dict_i = 0usize;
        for &key in sorted_keys {
            while dict_i < self.count {
                let dk = match self.key_at(dict_i) {
                    Some(dk) => dk,
                    None => break,
                };
                match dk.cmp_to(&DictKey::Str(key)) {
                    Ordering::Less => dict_i += 1,
                    Ordering::Equal => {
                        out.push((key, self.value_at(dict_i)));
                        break;
                    }
                    Ordering::Greater => {
                        out.push((key, None));
                        break;
                    }
                }
            }
            if dict_i >= self.count {
                out.push((key, None));
            }
        }
        out
    }

    pub fn iter(&self) -> DictIter<'a> {
        DictIter { view: *self, i: 0 }
    }
}

pub struct DictIter<'a> {
    view: DictView<'a>,
    i: usize,
}

impl<'a> Iterator for DictIter<'a> {
    type Item = (DictKey<'a>, Value<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.view.count {
            return None;
        }
        let key = self.view.key_at(self.i)?;
        let val = self.view.value_at(self.i)?;
        self.i += 1;
        Some((key, val))
    }
}

/// A cache an application can keep per access-site to skip the binary
/// search on repeat lookups of the same key (spec §4.3, cache tier ii:
/// the last matching slot index as a hint). Tiers i (shared-key integer)
/// and iii (cached key-value pointer) from the same spec paragraph are
/// not implemented here: `DictView` carries no reference to a
/// `SharedKeys` table to resolve a string key to its integer encoding
/// against, and a cached pointer to the key slot buys nothing over the
/// slot-index hint once the hint already lands in O(1). See DESIGN.md.
pub struct LookupKey<'k> {
    key: &'k str,
    last_slot_hint: Option<usize>,
}

impl<'k> LookupKey<'k> {
    pub fn new(key: &'k str) -> Self {
        LookupKey {
            key,
            last_slot_hint: None,
        }
    }

    /// Looks up `self.key` in `dict`, using and then refreshing the
    /// cached hint. A hit on the cached slot index is `O(1)`; a miss
    /// falls back to the ordinary binary search.
    pub fn get<'a>(&mut self, dict: &DictView<'a>) -> Option<Value<'a>> {
        if let Some(hint) = self.last_slot_hint {
            if hint < dict.count {
                if let Some(DictKey::Str(s)) = dict.key_at(hint) {
                    if s == self.key {
                        return dict.value_at(hint);
                    }
                }
            }
        }
        let target = DictKey::Str(self.key);
        let slot = dict.binary_search(&target)?;
        self.last_slot_hint = Some(slot);
        dict.value_at(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, EncoderOptions};

    #[test]
    fn dict_lookup_sorted() {
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
        let root = crate::validator::validate(&bytes).unwrap();
        let dict = root.as_dict().unwrap();
        assert_eq!(dict.get("foo").unwrap().as_int(), 17);
        assert_eq!(dict.get("bar").unwrap().as_string(), Some("wow"));
        assert_eq!(dict.get("bool").unwrap().as_int(), 1);
    }
}
