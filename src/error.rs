//! Error type shared by the grid library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Key encoding failed: {0}")]
    KeyCodec(#[from] bincode::Error),

    #[error("Malformed binary object: {message}")]
    Binary { message: String },

    #[error("Binary object of type '{type_name}' has no field '{field}'")]
    MissingField { type_name: String, field: String },

    #[error("Field '{field}' holds {actual}, expected {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Cache not found: {0}")]
    CacheNotFound(String),

    #[error("Memory arena exhausted: requested {requested} bytes, {available} available")]
    MemoryExhausted { requested: usize, available: usize },

    #[error("RPC failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Not connected to a grid node")]
    NotConnected,
}

impl GridError {
    pub fn config(message: impl Into<String>) -> Self {
        GridError::Config {
            message: message.into(),
        }
    }

    pub fn binary(message: impl Into<String>) -> Self {
        GridError::Binary {
            message: message.into(),
        }
    }
}

impl From<GridError> for tonic::Status {
    fn from(err: GridError) -> Self {
        match err {
            GridError::CacheNotFound(name) => {
                tonic::Status::not_found(format!("Cache not found: {}", name))
            }
            GridError::MemoryExhausted { .. } => tonic::Status::resource_exhausted(err.to_string()),
            GridError::Rpc(status) => status,
            GridError::Config { .. } => tonic::Status::invalid_argument(err.to_string()),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

pub type Result<T, E = GridError> = std::result::Result<T, E>;
