//! Grid node binary
//!
//! Run with: cargo run --bin grid-node -- --help

use anyhow::Result;
use clap::Parser;
use portable_grid::config::{CacheSection, GridConfig, ServerSection};
use portable_grid::Grid;

#[derive(Parser, Debug)]
#[command(name = "grid-node")]
#[command(about = "Standalone grid node serving caches over gRPC")]
struct Args {
    /// Configuration file; flags below override its values
    #[arg(long)]
    config: Option<String>,

    /// Node ID
    #[arg(long)]
    node_id: Option<u32>,

    /// gRPC listen address
    #[arg(long, default_value = "[::1]:50051")]
    listen_addr: String,

    /// Memory arena size in MB
    #[arg(long)]
    memory_mb: Option<usize>,

    /// Cache to create at startup (repeatable)
    #[arg(long = "cache")]
    caches: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of worker threads for processing requests
    #[arg(long, default_value = "4")]
    worker_threads: usize,
}

fn build_config(args: &Args) -> Result<GridConfig> {
    let mut config = match &args.config {
        Some(path) => GridConfig::from_file(path)?,
        None => GridConfig::default(),
    };

    if let Some(node_id) = args.node_id {
        config.node.node_id = node_id;
    }
    if let Some(memory_mb) = args.memory_mb {
        config.node.memory_mb = memory_mb;
    }
    config.server = Some(ServerSection {
        listen_addr: args.listen_addr.clone(),
    });
    for name in &args.caches {
        if !config.caches.iter().any(|c| &c.name == name) {
            config.caches.push(CacheSection {
                name: name.clone(),
                ttl_seconds: 0,
            });
        }
    }
    config.validate()?;
    Ok(config)
}

async fn run_with_config(args: Args) -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = build_config(&args)?;

    tracing::info!("=== Grid Node Configuration ===");
    tracing::info!("Worker threads: {}", args.worker_threads);
    tracing::info!("Listen address: {}", args.listen_addr);
    tracing::info!("Memory arena: {} MB", config.node.memory_mb);
    tracing::info!("Node ID: {}", config.node.node_id);
    tracing::info!(
        "Caches: {}",
        config
            .caches
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    tracing::info!("===============================");

    let grid = Grid::start(&config).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    grid.stop().await?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let worker_threads = args.worker_threads;

    // Build tokio runtime with specified number of worker threads
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?
        .block_on(run_with_config(args))
}
