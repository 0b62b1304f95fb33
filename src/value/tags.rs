//! Tag nibble and flag-bit constants for the on-disk value header (spec §3.2).
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

/// High-nibble tags, i.e. `buf[addr] >> 4` for non-pointer values.
pub mod tag {
    pub const SHORT: u8 = 0x0;
    pub const INT: u8 = 0x1;
    pub const FLOAT: u8 = 0x2;
    pub const SPECIAL: u8 = 0x3;
    pub const STRING: u8 = 0x4;
    pub const DATA: u8 = 0x5;
    pub const ARRAY: u8 = 0x6;
    pub const DICT: u8 = 0x7;
    /// Not a single value: any tag nibble `0x8..=0xF` is a pointer.
    pub const POINTER_FIRST: u8 = 0x8;
}

pub mod special {
    pub const NULL: u8 = 0x00;
    pub const FALSE: u8 = 0x04;
    pub const TRUE: u8 = 0x08;
    pub const UNDEFINED: u8 = 0x0C;
}

pub mod flag {
    /// `Int` low-nibble bit: set means the payload is an unsigned integer.
    pub const INT_UNSIGNED: u8 = 0x08;
    /// `Int`/`Float` low-nibble mask for byte count - 1 / double flag.
    pub const COUNT_MASK: u8 = 0x07;
    /// `Float` low-nibble bit: set means the payload is a 64-bit double.
    pub const FLOAT_DOUBLE: u8 = 0x08;
    /// `Array`/`Dict` low-nibble bit: set means element slots are 4 bytes wide.
    pub const COLLECTION_WIDE: u8 = 0x08;
    /// `String`/`Data` sentinel low-nibble value: an unsigned varint length follows.
    pub const LONG_LENGTH: u8 = 0x0F;
    /// `Array`/`Dict` sentinel count value: an unsigned varint count follows.
    pub const LONG_COUNT: u16 = 0x7FF;
}

/// Narrow pointer maximum backward reach, in bytes (15-bit offset in units of 2).
pub const NARROW_POINTER_MAX_REACH: u64 = 0x7FFF * 2;
/// Wide pointer maximum backward reach, in bytes (31-bit offset in units of 2).
pub const WIDE_POINTER_MAX_REACH: u64 = 0x7FFF_FFFF * 2;
