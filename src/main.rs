//! Portable grid - Main entry point
//!
//! This crate implements an in-memory key-value grid whose values are stored
//! as binary objects, so individual fields can be read without deserializing
//! the whole value.
//!
//! ## Architecture
//!
//! 1. A grid node hosts named caches over a fixed-size memory arena
//! 2. Programs hold a `Grid` handle, either embedding the node or connecting
//!    to one over gRPC
//! 3. Typed cache views encode keys with bincode and values as binary objects
//! 4. A keep-binary view hands values back without deserializing them
//!
//! ## Usage
//!
//! Run the put/get walkthrough against an embedded node:
//! ```bash
//! cargo run --bin cache-put-get -- --config config/grid.toml
//! ```
//!
//! Start a standalone node and talk to it:
//! ```bash
//! cargo run --bin grid-node -- --listen-addr [::1]:50051 --cache orgs
//! cargo run --bin grid-client -- --cache orgs put 1 hello
//! cargo run --bin grid-client -- --cache orgs get 1
//! ```

fn main() {
    println!("Portable grid");
    println!();
    println!("Use the following binaries:");
    println!("  cargo run --bin cache-put-get -- --help");
    println!("  cargo run --bin grid-node -- --help");
    println!("  cargo run --bin grid-client -- --help");
}
