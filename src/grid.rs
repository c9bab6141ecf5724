//! Grid lifecycle
//!
//! A [`Grid`] is the handle a program holds while it talks to a grid. It either
//! owns an embedded node (optionally serving it over gRPC) or a client
//! connected to a node elsewhere. Stopping or dropping the handle releases it.

use crate::binary::BinaryObject;
use crate::cache::{Cache, CacheBackend, CacheValue};
use crate::client::{ClientConfig, GridClient};
use crate::config::{GridConfig, GridMode};
use crate::error::{GridError, Result};
use crate::node::{bind_listener, serve_node, GridNode, NodeConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Background gRPC server for an embedded node
struct ServerTask {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<()>>,
}

enum Connection {
    Embedded {
        node: Arc<GridNode>,
        server: Option<ServerTask>,
    },
    Remote(Arc<GridClient>),
}

/// Handle to a running grid
pub struct Grid {
    connection: Connection,
    backend: Arc<dyn CacheBackend>,
}

impl Grid {
    /// Start a grid as described by `config`
    pub async fn start(config: &GridConfig) -> Result<Self> {
        config.validate()?;
        match config.mode {
            GridMode::Embedded => {
                let grid = Self::embedded(config.node_config()?)?;
                match config.listen_addr() {
                    Some(addr) => grid.serve(addr).await,
                    None => Ok(grid),
                }
            }
            GridMode::Client => {
                let client_config = config
                    .client_config()
                    .ok_or_else(|| GridError::config("client mode requires [client] section"))?;
                let grid = Self::connect(client_config).await?;
                for cache in &config.caches {
                    grid.create_cache(&cache.name, cache.ttl_seconds).await?;
                }
                Ok(grid)
            }
        }
    }

    /// Start an in-process node without a network listener
    pub fn embedded(config: NodeConfig) -> Result<Self> {
        let node = Arc::new(GridNode::new(config)?);
        Ok(Self {
            backend: node.clone(),
            connection: Connection::Embedded { node, server: None },
        })
    }

    /// Connect to a node running elsewhere
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Arc::new(GridClient::new(config));
        client.connect().await?;
        Ok(Self {
            backend: client.clone(),
            connection: Connection::Remote(client),
        })
    }

    /// Serve the embedded node over gRPC in the background
    ///
    /// `listen_addr` is bound before this returns.
    pub async fn serve(mut self, listen_addr: &str) -> Result<Self> {
        let Connection::Embedded { node, server } = &mut self.connection else {
            return Err(GridError::config("only an embedded grid can serve clients"));
        };
        if server.is_some() {
            return Err(GridError::config("grid node is already serving"));
        }

        let listener = bind_listener(listen_addr).await?;
        let (tx, rx) = oneshot::channel();
        let node = node.clone();
        let handle = tokio::spawn(async move {
            serve_node(node, listener, async move {
                let _ = rx.await;
            })
            .await
        });
        *server = Some(ServerTask {
            shutdown: Some(tx),
            handle,
        });
        Ok(self)
    }

    /// Node ID of the embedded node, or of the node the client registered with
    pub fn node_id(&self) -> Option<u32> {
        match &self.connection {
            Connection::Embedded { node, .. } => Some(node.node_id()),
            Connection::Remote(client) => client.node_info().map(|info| info.node_id),
        }
    }

    /// The embedded node, if this handle owns one
    pub fn local_node(&self) -> Option<&Arc<GridNode>> {
        match &self.connection {
            Connection::Embedded { node, .. } => Some(node),
            Connection::Remote(_) => None,
        }
    }

    /// Typed view of an existing cache
    pub async fn cache<K, V>(&self, name: &str) -> Result<Cache<K, V>>
    where
        K: Serialize + DeserializeOwned + Eq + Hash,
        V: CacheValue,
    {
        let names = self.backend.cache_names().await?;
        if !names.iter().any(|n| n == name) {
            return Err(GridError::CacheNotFound(name.to_string()));
        }
        Ok(Cache::new(name, self.backend.clone()))
    }

    /// Typed view of a cache, creating it with no TTL if needed
    pub async fn get_or_create_cache<K, V>(&self, name: &str) -> Result<Cache<K, V>>
    where
        K: Serialize + DeserializeOwned + Eq + Hash,
        V: CacheValue,
    {
        self.create_cache(name, 0).await?;
        Ok(Cache::new(name, self.backend.clone()))
    }

    /// Binary view of a cache
    pub async fn binary_cache<K>(&self, name: &str) -> Result<Cache<K, BinaryObject>>
    where
        K: Serialize + DeserializeOwned + Eq + Hash,
    {
        self.cache(name).await
    }

    /// Returns true if the cache was created by this call
    pub async fn create_cache(&self, name: &str, ttl_seconds: u64) -> Result<bool> {
        self.backend.create_cache(name, ttl_seconds).await
    }

    pub async fn cache_names(&self) -> Result<Vec<String>> {
        self.backend.cache_names().await
    }

    /// Release the grid: stop the server task or disconnect the client
    pub async fn stop(mut self) -> Result<()> {
        match &mut self.connection {
            Connection::Embedded { node, server } => {
                if let Some(mut task) = server.take() {
                    if let Some(tx) = task.shutdown.take() {
                        let _ = tx.send(());
                    }
                    match task.handle.await {
                        Ok(result) => result?,
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => {
                            tracing::error!("Grid server task failed: {}", e);
                        }
                    }
                }
                tracing::info!("Grid node {} stopped", node.node_id());
            }
            Connection::Remote(client) => client.disconnect(),
        }
        Ok(())
    }
}

impl Drop for Grid {
    fn drop(&mut self) {
        if let Connection::Embedded {
            server: Some(task), ..
        } = &mut self.connection
        {
            if let Some(tx) = task.shutdown.take() {
                let _ = tx.send(());
            }
            task.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Address, Organization, OrganizationType};
    use crate::node::CacheConfig;
    use chrono::Utc;

    fn grid() -> Grid {
        Grid::embedded(NodeConfig {
            node_id: 7,
            memory_size: 1024 * 1024,
            caches: vec![CacheConfig::new("orgs")],
        })
        .unwrap()
    }

    fn org(name: &str) -> Organization {
        Organization::new(
            name,
            Address::new("Main St", 10001),
            OrganizationType::Private,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_typed_put_get() {
        let grid = grid();
        let cache = grid.cache::<i32, Organization>("orgs").await.unwrap();

        cache.put(&1, &org("Acme")).await.unwrap();
        let value = cache.get(&1).await.unwrap().unwrap();
        assert_eq!(value.name(), "Acme");
        assert!(cache.get(&2).await.unwrap().is_none());
        assert!(cache.contains_key(&1).await.unwrap());
    }

    #[tokio::test]
    async fn test_keep_binary_view_shares_entries() {
        let grid = grid();
        let cache = grid.cache::<i32, Organization>("orgs").await.unwrap();
        cache.put(&1, &org("Acme")).await.unwrap();

        let binary = cache.with_keep_binary();
        let value = binary.get(&1).await.unwrap().unwrap();
        assert_eq!(value.type_name(), "Organization");
        assert_eq!(value.field_as::<String>("name").unwrap(), "Acme");
    }

    #[tokio::test]
    async fn test_unknown_cache_and_create() {
        let grid = grid();
        let err = grid.cache::<i32, Organization>("people").await.err().unwrap();
        assert!(matches!(err, GridError::CacheNotFound(_)));

        let people = grid
            .get_or_create_cache::<String, Organization>("people")
            .await
            .unwrap();
        people.put(&"bob".to_string(), &org("Bob Inc")).await.unwrap();
        assert_eq!(people.size().await.unwrap(), 1);
        assert_eq!(
            grid.cache_names().await.unwrap(),
            vec!["orgs".to_string(), "people".to_string()]
        );
    }

    #[tokio::test]
    async fn test_get_all_skips_missing_keys() {
        let grid = grid();
        let cache = grid.cache::<i32, Organization>("orgs").await.unwrap();
        let (a, b) = (org("A"), org("B"));
        cache.put_all([(&1, &a), (&2, &b)]).await.unwrap();

        let values = cache.get_all(&[1, 2, 3]).await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[&2].name(), "B");

        assert!(cache.remove(&1).await.unwrap());
        assert_eq!(cache.clear().await.unwrap(), 1);
        assert_eq!(cache.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stop_embedded() {
        let grid = grid();
        assert_eq!(grid.node_id(), Some(7));
        assert!(grid.local_node().is_some());
        grid.stop().await.unwrap();
    }
}
