//! Mutable dict overlay (spec §4.7), grounded in
//! `original_source/Fleece/MutableDict.hh`/`.cc`. Unlike the array side,
//! the overlay only holds touched keys (`_map` in the original), merged
//! with the source dict's sorted key stream at lookup/iteration time.

use super::{detach, ChildHandle, ParentLink, Slot};
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::value::dict::DictKey;
use crate::value::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

/// An owned dict key, ordered the same way `DictKey` is (spec §4.3:
/// integer keys sort before string keys).
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Key {
    Str(String),
    Int(i64),
}

impl Key {
    fn cmp_to(&self, other: &Key) -> Ordering {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            (Key::Int(_), Key::Str(_)) => Ordering::Less,
            (Key::Str(_), Key::Int(_)) => Ordering::Greater,
            (Key::Str(a), Key::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_to(other)
    }
}
impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> From<DictKey<'a>> for Key {
    fn from(k: DictKey<'a>) -> Self {
        match k {
            DictKey::Str(s) => Key::Str(s.to_string()),
            DictKey::Int(i) => Key::Int(i),
        }
    }
}

pub struct MutableDict<'a> {
    /// `None` entries are tombstones that mask a same-named source key.
    overlay: BTreeMap<Key, Option<Slot<'a>>>,
    source: Option<Value<'a>>,
    /// `removeAll()` was called: source is fully masked regardless of
    /// `overlay`'s tombstones (overlay entries added afterward still win).
    cleared: bool,
    changed: bool,
    parent: Option<ParentLink<'a>>,
}

impl<'a> MutableDict<'a> {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(MutableDict {
            overlay: BTreeMap::new(),
            source: None,
            cleared: false,
            changed: false,
            parent: None,
        }))
    }

    pub fn from_value(source: Value<'a>) -> Result<Rc<RefCell<Self>>> {
        if source.as_dict().is_none() {
            return Err(Error::InvalidData("not a dict".into()));
        }
        Ok(Rc::new(RefCell::new(MutableDict {
            overlay: BTreeMap::new(),
            source: Some(source),
            cleared: false,
            changed: false,
            parent: None,
        })))
    }

    pub fn source(&self) -> Option<Value<'a>> {
        self.source
    }

    pub fn count(&self) -> usize {
        self.iterate_pairs().count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn get(&self, key: &str) -> Option<Slot<'a>> {
        if let Some(entry) = self.overlay.get(&Key::Str(key.to_string())) {
            return entry.clone();
        }
        if self.cleared {
            return None;
        }
        self.source
            .and_then(|v| v.as_dict())
            .and_then(|d| d.get(key))
            .map(Slot::Value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Slot<'a>>) {
        let old = self
            .overlay
            .insert(Key::Str(key.to_string()), Some(value.into()))
            .flatten();
        if let Some(old) = old {
            detach(&old);
        }
        self.mark_changed();
    }

    pub fn remove(&mut self, key: &str) {
        if self.get(key).is_none() {
            return;
        }
        let old = self.overlay.insert(Key::Str(key.to_string()), None).flatten();
        if let Some(old) = old {
            detach(&old);
        }
        self.mark_changed();
    }

    pub fn clear(&mut self) {
        for (_, entry) in self.overlay.iter() {
            if let Some(slot) = entry {
                detach(slot);
            }
        }
        self.overlay.clear();
        self.cleared = true;
        self.mark_changed();
    }

    /// Merges the source dict's sorted stream with the overlay, yielding
    /// each key at most once; tombstones mask base keys and overlay
    /// entries shadow base entries with the same key (spec §4.7).
    pub fn iterate(&self) -> impl Iterator<Item = (Key, Slot<'a>)> + '_ {
        self.iterate_pairs()
    }

    fn iterate_pairs(&self) -> impl Iterator<Item = (Key, Slot<'a>)> + '_ {
        let source_iter = if self.cleared {
            None
        } else {
            self.source.and_then(|v| v.as_dict()).map(|d| d.iter())
        };
        MergeIter {
            source: source_iter,
            source_peek: None,
            overlay: self.overlay.iter(),
            overlay_peek: None,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn mark_changed(&mut self) {
        if self.changed {
            return;
        }
        self.changed = true;
        if let Some(parent) = self.parent.clone() {
            parent.mark_changed();
        }
    }

    pub(crate) fn set_parent(&mut self, parent: ParentLink<'a>) {
        self.parent = Some(parent);
    }

    pub(crate) fn clear_parent(&mut self) {
        self.parent = None;
    }

    /// If `key` holds an immutable array/dict value, replaces it
    /// in-place with a mutable copy and returns it; if already mutable,
    /// returns it; otherwise `None` (spec §4.7).
    pub fn make_mutable_child(self_rc: &Rc<RefCell<Self>>, key: &str) -> Option<ChildHandle<'a>> {
        let existing = self_rc.borrow().get(key)?;
        match existing {
            Slot::Array(rc) => Some(ChildHandle::Array(rc)),
            Slot::Dict(rc) => Some(ChildHandle::Dict(rc)),
            Slot::Value(v) => {
                if v.as_array().is_some() {
                    let child = super::MutableArray::from_value(v).ok()?;
                    child
                        .borrow_mut()
                        .set_parent(ParentLink::Dict(Rc::downgrade(self_rc)));
                    self_rc
                        .borrow_mut()
                        .overlay
                        .insert(Key::Str(key.to_string()), Some(Slot::Array(child.clone())));
                    Some(ChildHandle::Array(child))
                } else if v.as_dict().is_some() {
                    let child = MutableDict::from_value(v).ok()?;
                    child
                        .borrow_mut()
                        .set_parent(ParentLink::Dict(Rc::downgrade(self_rc)));
                    self_rc
                        .borrow_mut()
                        .overlay
                        .insert(Key::Str(key.to_string()), Some(Slot::Dict(child.clone())));
                    Some(ChildHandle::Dict(child))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Writes this dict to `enc`: a single pointer back at the source if
    /// nothing underneath changed, otherwise a freshly recursed copy with
    /// keys in sorted order (spec §4.7).
    pub fn write_to(&self, enc: &mut Encoder) -> Result<()> {
        if !self.changed {
            if let Some(src) = self.source {
                return enc.write_existing(src);
            }
            enc.begin_dict(None)?;
            return enc.end_dict();
        }
        enc.begin_dict(None)?;
        for (key, slot) in self.iterate() {
            match key {
                Key::Str(s) => enc.write_key_str(&s)?,
                Key::Int(i) => enc.write_key_int(i)?,
            }
            super::write_slot(enc, &slot)?;
        }
        enc.end_dict()
    }
}

impl<'a> Default for MutableDict<'a> {
    fn default() -> Self {
        MutableDict {
            overlay: BTreeMap::new(),
            source: None,
            cleared: false,
            changed: false,
            parent: None,
        }
    }
}

/// Sorted-merge of the source dict's iterator and the overlay's `BTreeMap`
/// iterator, matching spec §4.7's "merge of two sorted streams".
struct MergeIter<'a, 'b> {
    source: Option<crate::value::dict::DictIter<'a>>,
    source_peek: Option<(Key, Value<'a>)>,
    overlay: std::collections::btree_map::Iter<'b, Key, Option<Slot<'a>>>,
    overlay_peek: Option<(Key, &'b Option<Slot<'a>>)>,
}

impl<'a, 'b> Iterator for MergeIter<'a, 'b> {
    type Item = (Key, Slot<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.source_peek.is_none() {
                self.source_peek = self
                    .source
                    .as_mut()
                    .and_then(|it| it.next())
                    .map(|(k, v)| (Key::from(k), v));
            }
            if self.overlay_peek.is_none() {
                self.overlay_peek = self.overlay.next().map(|(k, v)| (k.clone(), v));
            }

            match (self.source_peek.clone(), self.overlay_peek.clone()) {
                (None, None) => return None,
                (Some(_), None) => {
                    let (k, v) = self.source_peek.take().unwrap();
                    return Some((k, Slot::Value(v)));
                }
                (None, Some(_)) => {
                    let (k, entry) = self.overlay_peek.take().unwrap();
                    match entry {
                        Some(slot) => return Some((k, slot.clone())),
                        None => continue, // tombstone with no base key behind it
                    }
                }
                (Some((sk, _)), Some((ok, _))) => match sk.cmp_to(&ok) {
                    Ordering::Less => {
                        let (k, v) = self.source_peek.take().unwrap();
                        return Some((k, Slot::Value(v)));
                    }
                    Ordering::Equal => {
                        self.source_peek = None;
                        let (k, entry) = self.overlay_peek.take().unwrap();
                        match entry {
                            Some(slot) => return Some((k, slot.clone())),
                            None => continue, // tombstoned: base key is masked
                        }
                    }
                    Ordering::Greater => {
                        let (k, entry) = self.overlay_peek.take().unwrap();
                        match entry {
                            Some(slot) => return Some((k, slot.clone())),
                            None => continue,
                        }
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, EncoderOptions};
    use crate::validator::validate;

    fn sample_doc() -> Vec<u8> {
        let mut enc = Encoder::new(EncoderOptions::default());
        enc.begin_dict(None).unwrap();
        enc.write_key_str("a").unwrap();
        enc.write_int(1).unwrap();
        enc.write_key_str("b").unwrap();
        enc.write_int(2).unwrap();
        enc.write_key_str("c").unwrap();
        enc.write_int(3).unwrap();
        enc.end_dict().unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn get_falls_through_to_source() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let mdict = MutableDict::from_value(root).unwrap();
        match mdict.borrow().get("b").unwrap() {
            Slot::Value(v) => assert_eq!(v.as_int(), 2),
            _ => panic!("expected borrowed value"),
        }
        assert!(!mdict.borrow().is_changed());
    }

    #[test]
    fn set_shadows_and_remove_tombstones() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let mdict = MutableDict::from_value(root).unwrap();
        mdict.borrow_mut().set("b", 99i64);
        match mdict.borrow().get("b").unwrap() {
            Slot::Int(99) => {}
            _ => panic!("expected overwritten int"),
        }
        mdict.borrow_mut().remove("a");
        assert!(mdict.borrow().get("a").is_none());
        assert_eq!(mdict.borrow().count(), 2);
    }

    #[test]
    fn iterate_merges_sorted_streams() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let mdict = MutableDict::from_value(root).unwrap();
        mdict.borrow_mut().set("aa", 10i64); // sorts between "a" and "b"
        mdict.borrow_mut().remove("b");
        let keys: Vec<String> = mdict
            .borrow()
            .iterate()
            .map(|(k, _)| match k {
                Key::Str(s) => s,
                Key::Int(i) => i.to_string(),
            })
            .collect();
        assert_eq!(keys, vec!["a", "aa", "c"]);
    }

    #[test]
    fn clear_masks_everything() {
        let bytes = sample_doc();
        let root = validate(&bytes).unwrap();
        let mdict = MutableDict::from_value(root).unwrap();
        mdict.borrow_mut().clear();
        assert_eq!(mdict.borrow().count(), 0);
        mdict.borrow_mut().set("fresh", 1i64);
        assert_eq!(mdict.borrow().count(), 1);
    }
}
