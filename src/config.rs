//! Grid configuration loaded from TOML
//!
//! ```toml
//! mode = "embedded"          # or "client"
//!
//! [node]
//! node_id = 0
//! memory_mb = 64
//!
//! [server]                   # optional, serves the embedded node over gRPC
//! listen_addr = "[::1]:50051"
//!
//! [client]                   # used when mode = "client"
//! client_id = 1
//! server_addr = "http://[::1]:50051"
//!
//! [[caches]]
//! name = "organizations"
//! ttl_seconds = 0
//! ```
//!
//! `${VAR}` references are replaced with environment variables before parsing.

use crate::client::ClientConfig;
use crate::error::{GridError, Result};
use crate::node::{CacheConfig, NodeConfig};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Largest arena a node accepts, in megabytes (1 TB)
pub const MAX_MEMORY_MB: usize = 1024 * 1024;

/// How a grid handle reaches its node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridMode {
    /// Run the node inside this process
    #[default]
    Embedded,
    /// Connect to a node running elsewhere
    Client,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub node_id: u32,
    pub memory_mb: usize,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            node_id: 0,
            memory_mb: 64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    pub listen_addr: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_client_id")]
    pub client_id: u32,
    pub server_addr: String,
}

fn default_client_id() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    pub name: String,
    #[serde(default)]
    pub ttl_seconds: u64,
}

/// Complete grid configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub mode: GridMode,
    pub node: NodeSection,
    pub server: Option<ServerSection>,
    pub client: Option<ClientSection>,
    pub caches: Vec<CacheSection>,
}

impl GridConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading grid configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        let config: GridConfig = toml::from_str(&processed)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace `${VAR}` with the variable's value, leaving unknown ones untouched
    fn substitute_env_vars(content: &str) -> String {
        let re = match Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") {
            Ok(re) => re,
            Err(_) => return content.to_string(),
        };
        re.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.memory_mb == 0 {
            return Err(GridError::config("node.memory_mb must be greater than 0"));
        }
        if self.node.memory_mb > MAX_MEMORY_MB {
            return Err(GridError::config(format!(
                "node.memory_mb {} exceeds the limit of {}",
                self.node.memory_mb, MAX_MEMORY_MB
            )));
        }
        self.memory_size()?;

        let mut seen = HashSet::new();
        for cache in &self.caches {
            if cache.name.trim().is_empty() {
                return Err(GridError::config("cache names must not be empty"));
            }
            if !seen.insert(cache.name.as_str()) {
                return Err(GridError::config(format!(
                    "cache '{}' is configured more than once",
                    cache.name
                )));
            }
        }

        if self.mode == GridMode::Client {
            match &self.client {
                Some(client) if !client.server_addr.is_empty() => {}
                _ => {
                    return Err(GridError::config(
                        "client mode requires [client] server_addr",
                    ))
                }
            }
        }

        Ok(())
    }

    pub fn cache_configs(&self) -> Vec<CacheConfig> {
        self.caches
            .iter()
            .map(|c| CacheConfig {
                name: c.name.clone(),
                ttl_seconds: c.ttl_seconds,
            })
            .collect()
    }

    /// Arena size in bytes
    fn memory_size(&self) -> Result<usize> {
        self.node.memory_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            GridError::config(format!(
                "node.memory_mb {} does not fit in memory",
                self.node.memory_mb
            ))
        })
    }

    pub fn node_config(&self) -> Result<NodeConfig> {
        Ok(NodeConfig {
            node_id: self.node.node_id,
            memory_size: self.memory_size()?,
            caches: self.cache_configs(),
        })
    }

    pub fn client_config(&self) -> Option<ClientConfig> {
        self.client.as_ref().map(|c| ClientConfig {
            client_id: c.client_id,
            server_addr: c.server_addr.clone(),
        })
    }

    /// Address the embedded node should serve on, if any
    pub fn listen_addr(&self) -> Option<&str> {
        self.server.as_ref().map(|s| s.listen_addr.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
mode = "embedded"

[node]
node_id = 3
memory_mb = 16

[server]
listen_addr = "127.0.0.1:0"

[[caches]]
name = "organizations"

[[caches]]
name = "sessions"
ttl_seconds = 30
"#;

    #[test]
    fn test_parse_sample() {
        let config = GridConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.mode, GridMode::Embedded);
        assert_eq!(config.node.node_id, 3);
        assert_eq!(config.listen_addr(), Some("127.0.0.1:0"));
        assert_eq!(config.caches.len(), 2);
        assert_eq!(config.caches[1].ttl_seconds, 30);

        let node = config.node_config().unwrap();
        assert_eq!(node.memory_size, 16 * 1024 * 1024);
        assert_eq!(node.caches[0], CacheConfig::new("organizations"));
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = GridConfig::from_toml_str("").unwrap();
        assert_eq!(config, GridConfig::default());
        assert_eq!(config.node.memory_mb, 64);
        assert!(config.listen_addr().is_none());
    }

    #[test]
    fn test_rejects_duplicate_caches() {
        let err = GridConfig::from_toml_str(
            r#"
[[caches]]
name = "a"
[[caches]]
name = "a"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_oversized_memory() {
        let err = GridConfig::from_toml_str(
            r#"
[node]
memory_mb = 9000000000000000000
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("memory_mb"));

        // Fields set after loading are caught by node_config as well
        let mut config = GridConfig::default();
        config.node.memory_mb = usize::MAX;
        assert!(config.validate().is_err());
        assert!(config.node_config().is_err());
    }

    #[test]
    fn test_client_mode_requires_address() {
        let result = GridConfig::from_toml_str(r#"mode = "client""#);
        assert!(result.is_err());

        let config = GridConfig::from_toml_str(
            r#"
mode = "client"
[client]
server_addr = "http://127.0.0.1:50051"
"#,
        )
        .unwrap();
        let client = config.client_config().unwrap();
        assert_eq!(client.client_id, 1);
        assert_eq!(client.server_addr, "http://127.0.0.1:50051");
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("PORTABLE_GRID_TEST_CACHE", "from_env");
        let config = GridConfig::from_toml_str(
            r#"
[[caches]]
name = "${PORTABLE_GRID_TEST_CACHE}"
"#,
        )
        .unwrap();
        assert_eq!(config.caches[0].name, "from_env");

        let untouched = GridConfig::substitute_env_vars("x = \"${PORTABLE_GRID_UNSET_VAR}\"");
        assert_eq!(untouched, "x = \"${PORTABLE_GRID_UNSET_VAR}\"");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = GridConfig::from_file(file.path()).unwrap();
        assert_eq!(config.node.node_id, 3);

        assert!(GridConfig::from_file("/nonexistent/grid.toml").is_err());
    }
}
