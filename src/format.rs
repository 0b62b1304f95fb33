//! # Binary document format
//!
//! A document is a contiguous, little-endian byte range ending at its
//! root value. There is no separate header: the last two bytes of the
//! buffer are either a narrow inline scalar (only possible when the
//! whole buffer is 2 bytes) or a narrow backward pointer to the root
//! value, which lies somewhere earlier in the buffer. `len % 2 == 0`
//! and `len >= 2` always hold.
//!
//! Every value begins on a 2-byte boundary. Reading one starts with its
//! first byte's high nibble, the *tag*:
//!
//! ```text
//! 0000iiii iiiiiiii       short int   (12-bit signed, split across the low nibble + byte1)
//! 0001uccc -------- ...   int         (u = unsigned, ccc = byte count - 1, LE payload follows)
//! 0010d--- -------- ...   float       (d = is_double, zero pad byte, LE payload follows)
//! 0011---- ssssssss       special     (byte1: 0x00 null, 0x04 false, 0x08 true, 0x0C undefined)
//! 0100cccc ssssssss ...   string      (cccc byte length, or 0xF + varint length, then payload)
//! 0101cccc dddddddd ...   data        (same shape as string)
//! 0110wccc cccccccc ...   array       (w = wide-items flag, 11-bit count or 0x7FF + varint)
//! 0111wccc cccccccc ...   dict        (same shape as array, key/value slot pairs)
//! 1ooooooo oooooooo       pointer     (top bit set; 15-bit narrow or 31-bit wide backward offset,
//!                                      in units of 2 bytes)
//! ```
//!
//! See [`crate::value::tags`] for the constants these diagrams name.
//!
//! ## Pointers
//!
//! A pointer's top bit is always set, regardless of width; the
//! remaining 15 (narrow) or 31 (wide) bits are a backward offset, in
//! units of 2 bytes, from the pointer's own address to its target's.
//! Offsets only ever point earlier in the buffer — there is no forward
//! pointer, which is what makes an explicit-stack validator sufficient
//! to rule out cycles: every hop strictly decreases the address, so a
//! walk can never revisit one.
//!
//! A slot's width (narrow vs wide) is fixed by its container: array and
//! dict element slots are narrow unless the collection header's wide
//! flag is set, in which case every slot in that collection is 4 bytes
//! and every pointer written from it is a wide pointer, giving it
//! enough reach to address anything earlier in a large buffer. Pointer
//! chains (a pointer whose target is itself a pointer) are followed
//! until a non-pointer value is reached — this happens when an
//! out-of-line value was originally reached through a narrow slot
//! whose reach was too small, so the encoder leaves a wide pointer
//! behind it instead of relocating the narrow slot.
//!
//! ## Scalars
//!
//! - **Short int**: the common case for small integers (`-2048..2048`),
//!   packed entirely into the 2-byte slot with no out-of-line payload.
//! - **Int**: a 1-8 byte little-endian payload follows the header byte,
//!   sign- or zero-extended on read depending on the unsigned flag. A
//!   value that fits unsigned in 8 bytes but not signed in 8 (i.e.
//!   greater than `i64::MAX`) is the one case an encoder must mark
//!   unsigned; everything else is free to pick whichever byte count is
//!   smallest.
//! - **Float**: a 4- or 8-byte IEEE-754 little-endian payload.
//! - **Special**: null, true, false, undefined — four fixed byte
//!   patterns, no payload.
//!
//! ## Strings and data
//!
//! A length-prefixed byte run: the header nibble's `cccc` is the length
//! directly when it's 14 or fewer, or the sentinel `0xF` followed by an
//! unsigned LEB128 varint length when it's not. Strings are required to
//! be valid UTF-8 (checked once, up front, by [`crate::validator`]);
//! data (opaque bytes, exposed to JSON interchange as base64) is never
//! interpreted. Both kinds may be deduplicated by the encoder's string
//! table — two equal values at different encode sites can end up
//! sharing one out-of-line byte run — which only ever affects the
//! buffer's size, never anything observable from the decoder side.
//!
//! ## Collections
//!
//! Arrays and dicts share a header shape: an 11-bit count, or the
//! sentinel `0x7FF` followed by a varint count, plus the wide-items
//! flag. An array's slots are `count` value-or-pointer slots in order.
//! A dict's slots are `count` *pairs* — a key slot followed by a value
//! slot — sorted by key unless the encoder was asked not to, in which
//! case lookup falls back to a linear scan. A key slot holds either a
//! short int (a shared-key integer, see below) or a string; integer
//! keys sort before string keys. Binary search over a sorted dict is
//! the default lookup path.
//!
//! ## Shared keys
//!
//! A dict key that is a short, plain identifier (alphanumeric plus `_`
//! and `-`, within an encoder-configured length limit) may be written
//! as a shared-key integer instead of a string, via the process-wide
//! table in [`crate::sharedkeys`]. This only changes the key slot's
//! *tag*, not anything about how the value that follows it is read — a
//! decoder that doesn't have the table can still walk the document
//! structurally, it just can't turn a shared-key integer back into its
//! original string without consulting the same table the encoder used.
