//! Shared types for grid nodes and clients
//!
//! Keys travel as bincode-encoded bytes, values as encoded binary objects.
//! Nodes never look inside either.

use crate::error::Result;
use crate::memory::ArenaSlot;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Instant;

/// Encode a cache key to its wire form
pub fn encode_key<K: Serialize>(key: &K) -> Result<Vec<u8>> {
    Ok(bincode::serialize(key)?)
}

/// Decode a cache key from its wire form
pub fn decode_key<K: DeserializeOwned>(bytes: &[u8]) -> Result<K> {
    Ok(bincode::deserialize(bytes)?)
}

/// Encoded key/value pair as exchanged between handle and node
#[derive(Clone, Debug, PartialEq)]
pub struct RawEntry {
    pub key: Vec<u8>,
    pub value: Bytes,
}

impl RawEntry {
    pub fn new(key: Vec<u8>, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Internal cache entry pointing into the node's arena
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Where the encoded value lives
    pub slot: ArenaSlot,
    /// TTL in seconds (0 = no expiration)
    pub ttl_seconds: u64,
    /// Timestamp when entry was created
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn new(slot: ArenaSlot, ttl_seconds: u64) -> Self {
        Self {
            slot,
            ttl_seconds,
            created_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        if self.ttl_seconds == 0 {
            return false;
        }
        self.created_at.elapsed().as_secs() >= self.ttl_seconds
    }
}

// Conversion helpers between our types and protobuf types
impl From<crate::pb::CacheEntry> for RawEntry {
    fn from(pb: crate::pb::CacheEntry) -> Self {
        Self {
            key: pb.key,
            value: Bytes::from(pb.value),
        }
    }
}

impl From<RawEntry> for crate::pb::CacheEntry {
    fn from(entry: RawEntry) -> Self {
        Self {
            key: entry.key,
            value: entry.value.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codec() {
        let encoded = encode_key(&42i32).unwrap();
        assert_eq!(encoded, 42i32.to_le_bytes());
        assert_eq!(decode_key::<i32>(&encoded).unwrap(), 42);

        let text = encode_key(&"org-1".to_string()).unwrap();
        assert_eq!(decode_key::<String>(&text).unwrap(), "org-1");
    }

    #[test]
    fn test_decode_key_rejects_short_input() {
        assert!(decode_key::<i64>(&[1, 2]).is_err());
    }

    #[test]
    fn test_entry_expiry() {
        let slot = ArenaSlot { offset: 0, len: 4 };
        assert!(!CacheEntry::new(slot, 0).is_expired());

        let mut entry = CacheEntry::new(slot, 1);
        assert!(!entry.is_expired());
        entry.created_at -= std::time::Duration::from_secs(2);
        assert!(entry.is_expired());
    }
}
