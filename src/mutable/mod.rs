//! Copy-on-write mutable overlay (spec §4.7): a tree of `MutableArray`/
//! `MutableDict` nodes sitting on top of an (optional) immutable source
//! value, tracking only what was touched.
//!
//! Grounded in `examples/original_source/Fleece/MutableValue.hh` /
//! `MutableArray.hh` / `MutableDict.hh`: a slot either still points at an
//! untouched source value or owns a replacement (inline scalar or a
//! promoted child collection). The C++ original gives each child a raw
//! pointer back to the slot that holds it so reassigning that slot can
//! notify the child; this crate has no raw self-referential pointers, so
//! the back-reference is a `Weak<RefCell<_>>` plus an index/key
//! (`ParentLink`), cleared whenever the owning slot is overwritten.
//!
//! Unlike the original's lazily-populated `std::vector<MutableValue>`
//! (each element left as "untouched, fall through to source" until
//! written), `MutableArray` here eagerly wraps every source element as a
//! `Slot::Value` on construction — indices are cheap to enumerate up
//! front and this avoids a parallel "is this index touched" bitmap. The
//! dict side stays lazy (`overlay` only holds touched keys), because
//! eagerly cloning every key string would be wasteful and dict lookups
//! already need to check the overlay first regardless.

pub mod array;
pub mod dict;

use crate::error::Result;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub use array::MutableArray;
pub use dict::MutableDict;

pub type ArrayRef<'a> = Rc<RefCell<MutableArray<'a>>>;
pub type DictRef<'a> = Rc<RefCell<MutableDict<'a>>>;

/// One item living in a mutable array or dict overlay.
#[derive(Clone)]
pub enum Slot<'a> {
    /// Untouched, borrowed straight from a source document.
    Value(Value<'a>),
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(String),
    Data(Vec<u8>),
    Array(ArrayRef<'a>),
    Dict(DictRef<'a>),
}

impl<'a> From<bool> for Slot<'a> {
    fn from(b: bool) -> Self {
        Slot::Bool(b)
    }
}
impl<'a> From<i64> for Slot<'a> {
    fn from(i: i64) -> Self {
        Slot::Int(i)
    }
}
impl<'a> From<u64> for Slot<'a> {
    fn from(u: u64) -> Self {
        Slot::UInt(u)
    }
}
impl<'a> From<f64> for Slot<'a> {
    fn from(d: f64) -> Self {
        Slot::Double(d)
    }
}
impl<'a> From<&str> for Slot<'a> {
    fn from(s: &str) -> Self {
        Slot::Str(s.to_string())
    }
}
impl<'a> From<String> for Slot<'a> {
    fn from(s: String) -> Self {
        Slot::Str(s)
    }
}
impl<'a> From<Vec<u8>> for Slot<'a> {
    fn from(d: Vec<u8>) -> Self {
        Slot::Data(d)
    }
}
impl<'a> From<Value<'a>> for Slot<'a> {
    fn from(v: Value<'a>) -> Self {
        Slot::Value(v)
    }
}
impl<'a> From<ArrayRef<'a>> for Slot<'a> {
    fn from(a: ArrayRef<'a>) -> Self {
        Slot::Array(a)
    }
}
impl<'a> From<DictRef<'a>> for Slot<'a> {
    fn from(d: DictRef<'a>) -> Self {
        Slot::Dict(d)
    }
}

/// Either of the two collection node types, returned by
/// `make_mutable_child` once a source array/dict has been promoted (or
/// was already mutable).
pub enum ChildHandle<'a> {
    Array(ArrayRef<'a>),
    Dict(DictRef<'a>),
}

/// A back-reference from a promoted child collection to the slot that
/// holds it, so reassigning or removing that slot can detach the child
/// (spec §4.7: "this back-pointer makes `mutate()` O(depth) rather than
/// O(tree)").
#[derive(Clone)]
pub(crate) enum ParentLink<'a> {
    Array(Weak<RefCell<MutableArray<'a>>>),
    Dict(Weak<RefCell<MutableDict<'a>>>),
}

impl<'a> ParentLink<'a> {
    fn mark_changed(&self) {
        match self {
            ParentLink::Array(w) => {
                if let Some(rc) = w.upgrade() {
                    rc.borrow_mut().mark_changed();
                }
            }
            ParentLink::Dict(w) => {
                if let Some(rc) = w.upgrade() {
                    rc.borrow_mut().mark_changed();
                }
            }
        }
    }
}

/// Clears the back-reference of a slot holding a promoted child, called
/// whenever that slot is overwritten or removed so the orphaned child
/// stops propagating `changed` into a collection that no longer owns it.
pub(crate) fn detach(slot: &Slot<'_>) {
    match slot {
        Slot::Array(rc) => rc.borrow_mut().clear_parent(),
        Slot::Dict(rc) => rc.borrow_mut().clear_parent(),
        _ => {}
    }
}

pub(crate) fn write_slot(enc: &mut crate::encoder::Encoder, slot: &Slot<'_>) -> Result<()> {
    match slot {
        // Untouched source values are re-pointed at, not re-encoded —
        // they still live in the encoder's base buffer (spec §4.7).
        Slot::Value(v) => enc.write_existing(*v),
        Slot::Null => enc.write_null(),
        Slot::Undefined => enc.write_undefined(),
        Slot::Bool(b) => enc.write_bool(*b),
        Slot::Int(i) => enc.write_int(*i),
        Slot::UInt(u) => enc.write_uint(*u),
        Slot::Double(d) => enc.write_double(*d),
        Slot::Str(s) => enc.write_string(s),
        Slot::Data(d) => enc.write_data(d),
        Slot::Array(rc) => rc.borrow().write_to(enc),
        Slot::Dict(rc) => rc.borrow().write_to(enc),
    }
}
