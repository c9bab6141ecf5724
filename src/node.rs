//! Grid node implementation
//!
//! A node hosts named caches over a single memory arena. It can be used
//! in-process through [`CacheBackend`] and, optionally, served to remote
//! clients over gRPC.

use crate::cache::CacheBackend;
use crate::error::{GridError, Result};
use crate::memory::{ArenaConfig, ArenaStats, MemoryArena};
use crate::pb::grid_cache_service_server::{GridCacheService, GridCacheServiceServer};
use crate::pb::{
    ClearRequest, ClearResponse, CreateCacheRequest, CreateCacheResponse, GetAllRequest,
    GetAllResponse, GetRequest, GetResponse, HeartbeatRequest, HeartbeatResponse,
    ListCachesRequest, ListCachesResponse, PutAllRequest, PutAllResponse, PutRequest, PutResponse,
    RegisterClientRequest, RegisterClientResponse, RemoveRequest, RemoveResponse, SizeRequest,
    SizeResponse,
};
use crate::protocol::{CacheEntry, RawEntry};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tonic::transport::server::TcpIncoming;
use tonic::{Request, Response, Status};

/// Settings for a single cache
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub name: String,
    /// TTL applied to every entry (0 = no expiration)
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl_seconds: 0,
        }
    }
}

/// Node configuration
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Node ID
    pub node_id: u32,
    /// Memory arena size in bytes
    pub memory_size: usize,
    /// Caches created at startup
    pub caches: Vec<CacheConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            memory_size: 64 * 1024 * 1024, // 64MB
            caches: Vec::new(),
        }
    }
}

/// Registered client information
struct RegisteredClient {
    registered_at: Instant,
}

/// Entries of one named cache
struct CacheStore {
    ttl_seconds: u64,
    entries: DashMap<Vec<u8>, CacheEntry>,
}

impl CacheStore {
    fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            entries: DashMap::new(),
        }
    }
}

/// Grid node
///
/// Lock order is arena first, then cache entries.
pub struct GridNode {
    config: NodeConfig,
    /// Arena holding every cached value
    arena: RwLock<MemoryArena>,
    /// Caches by name
    caches: DashMap<String, Arc<CacheStore>>,
    /// Registered clients
    clients: RwLock<HashMap<u32, RegisteredClient>>,
}

impl GridNode {
    /// Create a node and the caches named in its configuration
    pub fn new(config: NodeConfig) -> Result<Self> {
        let arena = MemoryArena::new(ArenaConfig {
            size: config.memory_size,
            ..Default::default()
        })?;

        let caches = DashMap::new();
        for cache in &config.caches {
            caches.insert(cache.name.clone(), Arc::new(CacheStore::new(cache.ttl_seconds)));
        }

        tracing::info!(
            "Grid node {} started with {} cache(s), {} bytes of memory",
            config.node_id,
            caches.len(),
            config.memory_size
        );

        Ok(Self {
            config,
            arena: RwLock::new(arena),
            caches,
            clients: RwLock::new(HashMap::new()),
        })
    }

    /// Get the gRPC service for this node
    pub fn into_service(self: Arc<Self>) -> GridCacheServiceServer<GridCacheServiceImpl> {
        GridCacheServiceServer::new(GridCacheServiceImpl { inner: self })
    }

    pub fn node_id(&self) -> u32 {
        self.config.node_id
    }

    pub fn memory_stats(&self) -> ArenaStats {
        self.arena.read().stats()
    }

    fn store(&self, cache: &str) -> Result<Arc<CacheStore>> {
        self.caches
            .get(cache)
            .map(|s| s.value().clone())
            .ok_or_else(|| GridError::CacheNotFound(cache.to_string()))
    }

    /// Create a cache if it does not exist yet
    pub fn create_cache(&self, name: &str, ttl_seconds: u64) -> Result<bool> {
        if name.is_empty() {
            return Err(GridError::config("cache name must not be empty"));
        }
        let mut created = false;
        self.caches.entry(name.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(CacheStore::new(ttl_seconds))
        });
        if created {
            tracing::info!("Created cache '{}' (ttl={}s)", name, ttl_seconds);
        }
        Ok(created)
    }

    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|c| c.key().clone()).collect();
        names.sort();
        names
    }

    /// Store a value, replacing any previous value for the key
    pub fn put_value(&self, cache: &str, key: Vec<u8>, value: &[u8]) -> Result<()> {
        let store = self.store(cache)?;
        let mut arena = self.arena.write();
        Self::insert(&mut arena, &store, key, value)
    }

    fn insert(
        arena: &mut MemoryArena,
        store: &CacheStore,
        key: Vec<u8>,
        value: &[u8],
    ) -> Result<()> {
        // An overwrite only needs room for one copy
        let previous = store.entries.get(&key).map(|entry| entry.slot);
        if let Some(old_slot) = previous {
            arena.release(old_slot);
        }
        let slot = match arena.store(value) {
            Ok(slot) => slot,
            Err(e) => {
                if let Some(old_slot) = previous {
                    arena.reclaim(old_slot);
                }
                return Err(e);
            }
        };
        store
            .entries
            .insert(key, CacheEntry::new(slot, store.ttl_seconds));
        Ok(())
    }

    /// Store several values under one arena lock
    pub fn put_all_values(&self, cache: &str, entries: Vec<RawEntry>) -> Result<u64> {
        let store = self.store(cache)?;
        let mut arena = self.arena.write();
        let mut written = 0;
        for entry in entries {
            Self::insert(&mut arena, &store, entry.key, &entry.value)?;
            written += 1;
        }
        Ok(written)
    }

    /// Look up a value, dropping it if its TTL has passed
    pub fn get_value(&self, cache: &str, key: &[u8]) -> Result<Option<Bytes>> {
        let store = self.store(cache)?;
        {
            let arena = self.arena.read();
            match store.entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => {
                    return Ok(Some(Bytes::copy_from_slice(arena.read(entry.slot)?)));
                }
                Some(_) => {}
            };
        }
        tracing::debug!("Dropping expired entry in cache '{}'", cache);
        self.remove_expired(&store, key);
        Ok(None)
    }

    pub fn get_all_values(&self, cache: &str, keys: &[Vec<u8>]) -> Result<Vec<RawEntry>> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get_value(cache, key)? {
                found.push(RawEntry::new(key.clone(), value));
            }
        }
        Ok(found)
    }

    fn remove_expired(&self, store: &CacheStore, key: &[u8]) {
        let mut arena = self.arena.write();
        if let Some((_, entry)) = store.entries.remove_if(key, |_, e| e.is_expired()) {
            arena.release(entry.slot);
        }
    }

    /// Delete a value from a cache
    pub fn delete_value(&self, cache: &str, key: &[u8]) -> Result<bool> {
        let store = self.store(cache)?;
        let mut arena = self.arena.write();
        match store.entries.remove(key) {
            Some((_, entry)) => {
                arena.release(entry.slot);
                Ok(!entry.is_expired())
            }
            None => Ok(false),
        }
    }

    /// Remove every entry of a cache
    pub fn clear_cache(&self, cache: &str) -> Result<u64> {
        let store = self.store(cache)?;
        let mut arena = self.arena.write();
        let mut removed = 0;
        store.entries.retain(|_, entry| {
            arena.release(entry.slot);
            if !entry.is_expired() {
                removed += 1;
            }
            false
        });
        tracing::debug!("Cleared {} entries from cache '{}'", removed, cache);
        Ok(removed)
    }

    /// Number of live entries in a cache
    pub fn cache_size(&self, cache: &str) -> Result<u64> {
        let store = self.store(cache)?;
        Ok(store.entries.iter().filter(|e| !e.is_expired()).count() as u64)
    }

    fn register_client(&self, client_id: u32) {
        self.clients.write().insert(
            client_id,
            RegisteredClient {
                registered_at: Instant::now(),
            },
        );
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

#[async_trait]
impl CacheBackend for GridNode {
    async fn put(&self, cache: &str, key: Vec<u8>, value: Bytes) -> Result<()> {
        self.put_value(cache, key, &value)
    }

    async fn get(&self, cache: &str, key: Vec<u8>) -> Result<Option<Bytes>> {
        self.get_value(cache, &key)
    }

    async fn put_all(&self, cache: &str, entries: Vec<RawEntry>) -> Result<()> {
        self.put_all_values(cache, entries).map(|_| ())
    }

    async fn get_all(&self, cache: &str, keys: Vec<Vec<u8>>) -> Result<Vec<RawEntry>> {
        self.get_all_values(cache, &keys)
    }

    async fn remove(&self, cache: &str, key: Vec<u8>) -> Result<bool> {
        self.delete_value(cache, &key)
    }

    async fn clear(&self, cache: &str) -> Result<u64> {
        self.clear_cache(cache)
    }

    async fn size(&self, cache: &str) -> Result<u64> {
        self.cache_size(cache)
    }

    async fn create_cache(&self, cache: &str, ttl_seconds: u64) -> Result<bool> {
        GridNode::create_cache(self, cache, ttl_seconds)
    }

    async fn cache_names(&self) -> Result<Vec<String>> {
        Ok(GridNode::cache_names(self))
    }
}

/// gRPC service implementation wrapper
pub struct GridCacheServiceImpl {
    inner: Arc<GridNode>,
}

#[tonic::async_trait]
impl GridCacheService for GridCacheServiceImpl {
    async fn put(&self, request: Request<PutRequest>) -> Result<Response<PutResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!("PUT request: cache={}, key={:?}", req.cache_name, req.key);

        self.inner
            .put_value(&req.cache_name, req.key, &req.value)
            .map_err(|e| {
                tracing::warn!("PUT failed: {}", e);
                Status::from(e)
            })?;
        Ok(Response::new(PutResponse {}))
    }

    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let req = request.into_inner();
        let request_id = req.request_id;
        tracing::debug!(
            "GET request: cache={}, key={:?}, request_id={}",
            req.cache_name,
            req.key,
            request_id
        );

        let value = self.inner.get_value(&req.cache_name, &req.key)?;
        Ok(Response::new(GetResponse {
            found: value.is_some(),
            value: value.map(|v| v.to_vec()).unwrap_or_default(),
            request_id,
        }))
    }

    async fn put_all(
        &self,
        request: Request<PutAllRequest>,
    ) -> Result<Response<PutAllResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!(
            "PUT_ALL request: cache={}, entries={}",
            req.cache_name,
            req.entries.len()
        );

        let entries = req.entries.into_iter().map(RawEntry::from).collect();
        let written = self
            .inner
            .put_all_values(&req.cache_name, entries)
            .map_err(|e| {
                tracing::warn!("PUT_ALL failed: {}", e);
                Status::from(e)
            })?;
        Ok(Response::new(PutAllResponse { written }))
    }

    async fn get_all(
        &self,
        request: Request<GetAllRequest>,
    ) -> Result<Response<GetAllResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!(
            "GET_ALL request: cache={}, keys={}",
            req.cache_name,
            req.keys.len()
        );

        let entries = self.inner.get_all_values(&req.cache_name, &req.keys)?;
        Ok(Response::new(GetAllResponse {
            entries: entries.into_iter().map(Into::into).collect(),
        }))
    }

    async fn remove(
        &self,
        request: Request<RemoveRequest>,
    ) -> Result<Response<RemoveResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!("REMOVE request: cache={}, key={:?}", req.cache_name, req.key);

        let key_existed = self.inner.delete_value(&req.cache_name, &req.key)?;
        Ok(Response::new(RemoveResponse { key_existed }))
    }

    async fn clear(&self, request: Request<ClearRequest>) -> Result<Response<ClearResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!("CLEAR request: cache={}", req.cache_name);

        let removed = self.inner.clear_cache(&req.cache_name)?;
        Ok(Response::new(ClearResponse { removed }))
    }

    async fn size(&self, request: Request<SizeRequest>) -> Result<Response<SizeResponse>, Status> {
        let req = request.into_inner();
        let size = self.inner.cache_size(&req.cache_name)?;
        Ok(Response::new(SizeResponse { size }))
    }

    async fn create_cache(
        &self,
        request: Request<CreateCacheRequest>,
    ) -> Result<Response<CreateCacheResponse>, Status> {
        let req = request.into_inner();
        let created = self.inner.create_cache(&req.cache_name, req.ttl_seconds)?;
        Ok(Response::new(CreateCacheResponse { created }))
    }

    async fn list_caches(
        &self,
        _request: Request<ListCachesRequest>,
    ) -> Result<Response<ListCachesResponse>, Status> {
        Ok(Response::new(ListCachesResponse {
            cache_names: self.inner.cache_names(),
        }))
    }

    async fn register_client(
        &self,
        request: Request<RegisterClientRequest>,
    ) -> Result<Response<RegisterClientResponse>, Status> {
        let req = request.into_inner();
        tracing::info!("Client registration: id={}", req.client_id);

        self.inner.register_client(req.client_id);

        Ok(Response::new(RegisterClientResponse {
            node_id: self.inner.node_id(),
            cache_names: self.inner.cache_names(),
        }))
    }

    async fn heartbeat(
        &self,
        request: Request<HeartbeatRequest>,
    ) -> Result<Response<HeartbeatResponse>, Status> {
        let req = request.into_inner();
        match self.inner.clients.read().get(&req.client_id) {
            Some(client) => tracing::trace!(
                "Heartbeat from client {} (registered {:?} ago)",
                req.client_id,
                client.registered_at.elapsed()
            ),
            None => tracing::warn!("Heartbeat from unregistered client {}", req.client_id),
        }
        Ok(Response::new(HeartbeatResponse { alive: true }))
    }
}

/// Parse `listen_addr` and bind it, so address errors surface before serving
pub async fn bind_listener(listen_addr: &str) -> Result<TcpListener> {
    let addr = listen_addr
        .parse::<SocketAddr>()
        .map_err(|e| GridError::config(format!("invalid listen address '{}': {}", listen_addr, e)))?;
    TcpListener::bind(addr).await.map_err(|e| {
        GridError::config(format!("cannot listen on {}: {}", addr, e))
    })
}

/// Serve a node over gRPC on a bound listener until `shutdown` resolves
pub async fn serve_node<F>(node: Arc<GridNode>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send,
{
    let addr = listener.local_addr()?;
    let incoming = TcpIncoming::from_listener(listener, true, None)
        .map_err(|e| GridError::config(format!("cannot accept on {}: {}", addr, e)))?;

    tracing::info!("Grid node {} serving on {}", node.node_id(), addr);

    tonic::transport::Server::builder()
        .add_service(node.into_service())
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node() -> GridNode {
        GridNode::new(NodeConfig {
            node_id: 1,
            memory_size: 1024 * 1024, // 1MB for testing
            caches: vec![CacheConfig::new("orgs")],
        })
        .unwrap()
    }

    #[test]
    fn test_node_creation() {
        let node = test_node();
        assert_eq!(node.cache_names(), vec!["orgs".to_string()]);
        assert_eq!(node.cache_size("orgs").unwrap(), 0);
    }

    #[test]
    fn test_put_and_lookup() {
        let node = test_node();
        node.put_value("orgs", b"key1".to_vec(), b"value1").unwrap();

        let value = node.get_value("orgs", b"key1").unwrap();
        assert_eq!(value.as_deref(), Some(&b"value1"[..]));
        assert_eq!(node.get_value("orgs", b"key2").unwrap(), None);
    }

    #[test]
    fn test_overwrite_releases_old_slot() {
        let node = test_node();
        node.put_value("orgs", b"k".to_vec(), &[1u8; 100]).unwrap();
        let used = node.memory_stats().used;
        node.put_value("orgs", b"k".to_vec(), &[2u8; 100]).unwrap();

        assert_eq!(node.memory_stats().used, used);
        assert_eq!(node.cache_size("orgs").unwrap(), 1);
    }

    #[test]
    fn test_unknown_cache() {
        let node = test_node();
        let err = node.get_value("missing", b"k").unwrap_err();
        assert!(matches!(err, GridError::CacheNotFound(name) if name == "missing"));
    }

    #[test]
    fn test_clear_and_delete() {
        let node = test_node();
        node.put_all_values(
            "orgs",
            vec![
                RawEntry::new(b"a".to_vec(), Bytes::from_static(b"1")),
                RawEntry::new(b"b".to_vec(), Bytes::from_static(b"2")),
            ],
        )
        .unwrap();

        assert!(node.delete_value("orgs", b"a").unwrap());
        assert!(!node.delete_value("orgs", b"a").unwrap());
        assert_eq!(node.clear_cache("orgs").unwrap(), 1);
        assert_eq!(node.cache_size("orgs").unwrap(), 0);
        assert_eq!(node.memory_stats().used, 0);
    }

    #[test]
    fn test_create_cache_is_idempotent() {
        let node = test_node();
        assert!(node.create_cache("people", 0).unwrap());
        assert!(!node.create_cache("people", 0).unwrap());
        assert!(node.create_cache("", 0).is_err());
    }

    #[test]
    fn test_memory_exhaustion_surfaces_on_put() {
        let node = GridNode::new(NodeConfig {
            node_id: 1,
            memory_size: 64,
            caches: vec![CacheConfig::new("tiny")],
        })
        .unwrap();
        let err = node.put_value("tiny", b"k".to_vec(), &[0u8; 128]).unwrap_err();
        assert!(matches!(err, GridError::MemoryExhausted { .. }));
    }

    #[test]
    fn test_overwrite_reuses_old_space() {
        let node = GridNode::new(NodeConfig {
            node_id: 1,
            memory_size: 64,
            caches: vec![CacheConfig::new("tiny")],
        })
        .unwrap();
        node.put_value("tiny", b"k".to_vec(), &[1u8; 40]).unwrap();
        node.put_value("tiny", b"k".to_vec(), &[2u8; 40]).unwrap();

        let value = node.get_value("tiny", b"k").unwrap().unwrap();
        assert_eq!(&value[..], &[2u8; 40]);
        assert_eq!(node.memory_stats().used, 40);
    }

    #[test]
    fn test_failed_overwrite_keeps_old_value() {
        let node = GridNode::new(NodeConfig {
            node_id: 1,
            memory_size: 64,
            caches: vec![CacheConfig::new("tiny")],
        })
        .unwrap();
        node.put_value("tiny", b"a".to_vec(), &[1u8; 16]).unwrap();
        node.put_value("tiny", b"k".to_vec(), &[2u8; 24]).unwrap();

        let err = node.put_value("tiny", b"k".to_vec(), &[3u8; 56]).unwrap_err();
        assert!(matches!(err, GridError::MemoryExhausted { .. }));

        let value = node.get_value("tiny", b"k").unwrap().unwrap();
        assert_eq!(&value[..], &[2u8; 24]);
        assert_eq!(node.memory_stats().used, 40);

        // The reclaimed space is still tracked correctly
        node.put_value("tiny", b"b".to_vec(), &[4u8; 24]).unwrap();
        assert!(node.put_value("tiny", b"c".to_vec(), &[5u8; 8]).is_err());
    }
}
