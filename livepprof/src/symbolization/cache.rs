//! Memo table from address chains to resolved locations.
//!
//! Keys are a 64-bit FNV-1 hash of the little-endian address bytes. Two
//! different chains hashing to the same key would share an entry: collisions
//! are accepted, the cache is best-effort.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::Location;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash an address chain into a cache key.
#[must_use]
pub fn cache_key(addrs: &[u64]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for addr in addrs {
        for byte in addr.to_le_bytes() {
            hash = hash.wrapping_mul(FNV_PRIME);
            hash ^= u64::from(byte);
        }
    }
    hash
}

/// Append-only location cache, safe to share between collector loops.
///
/// Reads only take the shared side of the lock, so lookups from concurrent
/// loops do not block each other once the cache is warm.
#[derive(Debug, Default)]
pub struct LocationCache {
    entries: RwLock<HashMap<u64, Location>>,
}

impl LocationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, addrs: &[u64]) -> Option<Location> {
        self.entries.read().get(&cache_key(addrs)).cloned()
    }

    /// Store a location, overwriting any entry with the same key.
    pub fn insert(&self, addrs: &[u64], location: Location) {
        self.entries.write().insert(cache_key(addrs), location);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
