//! Remote grid client
//!
//! The client registers with a grid node on connect, then forwards every
//! cache operation over gRPC. Values are exchanged in their encoded binary
//! form, so the node never needs the user's types.

use crate::cache::CacheBackend;
use crate::error::{GridError, Result};
use crate::pb::grid_cache_service_client::GridCacheServiceClient;
use crate::pb::{
    ClearRequest, CreateCacheRequest, GetAllRequest, GetRequest, HeartbeatRequest,
    ListCachesRequest, PutAllRequest, PutRequest, RegisterClientRequest, RemoveRequest,
    SizeRequest,
};
use crate::protocol::RawEntry;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use tonic::transport::Channel;
use tonic::Code;

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Client ID announced to the node
    pub client_id: u32,
    /// Node address (gRPC endpoint)
    pub server_addr: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: 1,
            server_addr: "http://[::1]:50051".to_string(),
        }
    }
}

/// Node information after registration
#[derive(Clone, Debug)]
pub struct NodeInfo {
    pub node_id: u32,
    pub cache_names: Vec<String>,
}

/// Remote grid client
pub struct GridClient {
    config: ClientConfig,
    /// gRPC client for the node
    grpc_client: Mutex<Option<GridCacheServiceClient<Channel>>>,
    /// Request ID counter
    request_counter: AtomicU64,
    /// Node information after registration
    node_info: RwLock<Option<NodeInfo>>,
}

impl GridClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            grpc_client: Mutex::new(None),
            request_counter: AtomicU64::new(0),
            node_info: RwLock::new(None),
        }
    }

    /// Connect to the node and register
    pub async fn connect(&self) -> Result<()> {
        tracing::info!("Connecting to grid node at {}", self.config.server_addr);

        let channel = Channel::from_shared(self.config.server_addr.clone())
            .map_err(|e| GridError::config(format!("invalid server address: {}", e)))?
            .connect()
            .await?;

        let mut client = GridCacheServiceClient::new(channel);

        let response = client
            .register_client(RegisterClientRequest {
                client_id: self.config.client_id,
            })
            .await?
            .into_inner();

        tracing::info!(
            "Registered with grid node {}, {} cache(s) available",
            response.node_id,
            response.cache_names.len()
        );

        *self.node_info.write() = Some(NodeInfo {
            node_id: response.node_id,
            cache_names: response.cache_names,
        });
        *self.grpc_client.lock() = Some(client);

        Ok(())
    }

    /// Drop the connection
    pub fn disconnect(&self) {
        if self.grpc_client.lock().take().is_some() {
            tracing::info!("Disconnected from {}", self.config.server_addr);
        }
    }

    /// Check if connected to a node
    pub fn is_connected(&self) -> bool {
        self.grpc_client.lock().is_some()
    }

    pub fn node_info(&self) -> Option<NodeInfo> {
        self.node_info.read().clone()
    }

    /// Send a heartbeat to the node
    pub async fn heartbeat(&self) -> Result<bool> {
        let mut client = self.rpc()?;
        let response = client
            .heartbeat(HeartbeatRequest {
                client_id: self.config.client_id,
            })
            .await?
            .into_inner();
        Ok(response.alive)
    }

    fn rpc(&self) -> Result<GridCacheServiceClient<Channel>> {
        self.grpc_client.lock().clone().ok_or(GridError::NotConnected)
    }
}

/// Turn a node-side NOT_FOUND back into the typed error
fn map_status(cache: &str, status: tonic::Status) -> GridError {
    if status.code() == Code::NotFound {
        GridError::CacheNotFound(cache.to_string())
    } else {
        GridError::Rpc(status)
    }
}

#[async_trait]
impl CacheBackend for GridClient {
    async fn put(&self, cache: &str, key: Vec<u8>, value: Bytes) -> Result<()> {
        let mut client = self.rpc()?;
        client
            .put(PutRequest {
                cache_name: cache.to_string(),
                key,
                value: value.to_vec(),
            })
            .await
            .map_err(|s| map_status(cache, s))?;
        Ok(())
    }

    async fn get(&self, cache: &str, key: Vec<u8>) -> Result<Option<Bytes>> {
        let mut client = self.rpc()?;
        let request_id = self.request_counter.fetch_add(1, Ordering::Relaxed);

        let response = client
            .get(GetRequest {
                cache_name: cache.to_string(),
                key,
                request_id,
            })
            .await
            .map_err(|s| map_status(cache, s))?
            .into_inner();

        if response.request_id != request_id {
            return Err(GridError::Rpc(tonic::Status::internal(format!(
                "response for request {} answered request {}",
                response.request_id, request_id
            ))));
        }

        Ok(response.found.then(|| Bytes::from(response.value)))
    }

    async fn put_all(&self, cache: &str, entries: Vec<RawEntry>) -> Result<()> {
        let mut client = self.rpc()?;
        let expected = entries.len() as u64;
        let response = client
            .put_all(PutAllRequest {
                cache_name: cache.to_string(),
                entries: entries.into_iter().map(Into::into).collect(),
            })
            .await
            .map_err(|s| map_status(cache, s))?
            .into_inner();

        if response.written != expected {
            tracing::warn!(
                "PUT_ALL wrote {} of {} entries to '{}'",
                response.written,
                expected,
                cache
            );
        }
        Ok(())
    }

    async fn get_all(&self, cache: &str, keys: Vec<Vec<u8>>) -> Result<Vec<RawEntry>> {
        let mut client = self.rpc()?;
        let response = client
            .get_all(GetAllRequest {
                cache_name: cache.to_string(),
                keys,
            })
            .await
            .map_err(|s| map_status(cache, s))?
            .into_inner();

        Ok(response.entries.into_iter().map(RawEntry::from).collect())
    }

    async fn remove(&self, cache: &str, key: Vec<u8>) -> Result<bool> {
        let mut client = self.rpc()?;
        let response = client
            .remove(RemoveRequest {
                cache_name: cache.to_string(),
                key,
            })
            .await
            .map_err(|s| map_status(cache, s))?
            .into_inner();
        Ok(response.key_existed)
    }

    async fn clear(&self, cache: &str) -> Result<u64> {
        let mut client = self.rpc()?;
        let response = client
            .clear(ClearRequest {
                cache_name: cache.to_string(),
            })
            .await
            .map_err(|s| map_status(cache, s))?
            .into_inner();
        Ok(response.removed)
    }

    async fn size(&self, cache: &str) -> Result<u64> {
        let mut client = self.rpc()?;
        let response = client
            .size(SizeRequest {
                cache_name: cache.to_string(),
            })
            .await
            .map_err(|s| map_status(cache, s))?
            .into_inner();
        Ok(response.size)
    }

    async fn create_cache(&self, cache: &str, ttl_seconds: u64) -> Result<bool> {
        let mut client = self.rpc()?;
        let response = client
            .create_cache(CreateCacheRequest {
                cache_name: cache.to_string(),
                ttl_seconds,
            })
            .await
            .map_err(|s| map_status(cache, s))?
            .into_inner();
        Ok(response.created)
    }

    async fn cache_names(&self) -> Result<Vec<String>> {
        let mut client = self.rpc()?;
        let response = client
            .list_caches(ListCachesRequest {})
            .await
            .map_err(|s| map_status("", s))?
            .into_inner();
        Ok(response.cache_names)
    }
}
