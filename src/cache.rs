//! Typed cache views
//!
//! A [`Cache`] is a named view over a cache hosted by a grid node. It encodes
//! keys and values on the way in and decodes them on the way out; the backend
//! underneath is either an embedded node or a remote client.

use crate::binary::{BinaryObject, BinaryType};
use crate::error::Result;
use crate::protocol::{decode_key, encode_key, RawEntry};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Raw operations a grid handle must provide
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn put(&self, cache: &str, key: Vec<u8>, value: Bytes) -> Result<()>;

    async fn get(&self, cache: &str, key: Vec<u8>) -> Result<Option<Bytes>>;

    async fn put_all(&self, cache: &str, entries: Vec<RawEntry>) -> Result<()>;

    /// Returns only the entries that exist
    async fn get_all(&self, cache: &str, keys: Vec<Vec<u8>>) -> Result<Vec<RawEntry>>;

    async fn remove(&self, cache: &str, key: Vec<u8>) -> Result<bool>;

    /// Returns the number of entries removed
    async fn clear(&self, cache: &str) -> Result<u64>;

    async fn size(&self, cache: &str) -> Result<u64>;

    /// Returns true if the cache did not exist before
    async fn create_cache(&self, cache: &str, ttl_seconds: u64) -> Result<bool>;

    async fn cache_names(&self) -> Result<Vec<String>>;
}

/// Value types a cache can hold
pub trait CacheValue: Sized + Send {
    fn encode(&self) -> Result<Bytes>;

    fn decode(bytes: Bytes) -> Result<Self>;
}

impl<T: BinaryType + Send> CacheValue for T {
    fn encode(&self) -> Result<Bytes> {
        Ok(self.to_binary()?.into_bytes())
    }

    fn decode(bytes: Bytes) -> Result<Self> {
        BinaryObject::from_bytes(bytes)?.deserialize()
    }
}

impl CacheValue for BinaryObject {
    fn encode(&self) -> Result<Bytes> {
        Ok(self.as_bytes().clone())
    }

    fn decode(bytes: Bytes) -> Result<Self> {
        BinaryObject::from_bytes(bytes)
    }
}

/// Named, typed view over a grid cache
pub struct Cache<K, V> {
    name: String,
    backend: Arc<dyn CacheBackend>,
    _types: PhantomData<fn(K) -> V>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            backend: self.backend.clone(),
            _types: PhantomData,
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: CacheValue,
{
    pub(crate) fn new(name: impl Into<String>, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            _types: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// View of the same cache that returns values in binary form
    pub fn with_keep_binary(&self) -> Cache<K, BinaryObject> {
        Cache::new(self.name.clone(), self.backend.clone())
    }

    pub async fn put(&self, key: &K, value: &V) -> Result<()> {
        let key = encode_key(key)?;
        self.backend.put(&self.name, key, value.encode()?).await
    }

    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        let key = encode_key(key)?;
        match self.backend.get(&self.name, key).await? {
            Some(bytes) => V::decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    pub async fn put_all<'a, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a K, &'a V)>,
        K: 'a,
        V: 'a,
    {
        let raw = entries
            .into_iter()
            .map(|(k, v)| Ok(RawEntry::new(encode_key(k)?, v.encode()?)))
            .collect::<Result<Vec<_>>>()?;
        if raw.is_empty() {
            return Ok(());
        }
        self.backend.put_all(&self.name, raw).await
    }

    /// Keys without a value are absent from the returned map
    pub async fn get_all<'a, I>(&self, keys: I) -> Result<HashMap<K, V>>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let raw_keys = keys
            .into_iter()
            .map(encode_key)
            .collect::<Result<Vec<_>>>()?;
        if raw_keys.is_empty() {
            return Ok(HashMap::new());
        }

        let entries = self.backend.get_all(&self.name, raw_keys).await?;
        let mut result = HashMap::with_capacity(entries.len());
        for entry in entries {
            result.insert(decode_key(&entry.key)?, V::decode(entry.value)?);
        }
        Ok(result)
    }

    pub async fn remove(&self, key: &K) -> Result<bool> {
        let key = encode_key(key)?;
        self.backend.remove(&self.name, key).await
    }

    pub async fn contains_key(&self, key: &K) -> Result<bool> {
        let key = encode_key(key)?;
        Ok(self.backend.get(&self.name, key).await?.is_some())
    }

    pub async fn size(&self) -> Result<u64> {
        self.backend.size(&self.name).await
    }

    /// Remove every entry, returning how many were removed
    pub async fn clear(&self) -> Result<u64> {
        self.backend.clear(&self.name).await
    }
}
