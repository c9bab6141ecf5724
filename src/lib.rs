pub mod binary;
pub mod cache;
pub mod client;
pub mod config;
pub mod demo;
pub mod error;
pub mod grid;
pub mod memory;
pub mod model;
pub mod node;
pub mod protocol;

// Re-export generated protobuf types
pub mod pb {
    tonic::include_proto!("grid_cache");
}

pub use binary::{BinaryObject, BinaryObjectBuilder, BinaryType, BinaryValue};
pub use cache::Cache;
pub use client::GridClient;
pub use config::GridConfig;
pub use error::{GridError, Result};
pub use grid::Grid;
pub use node::GridNode;
