//! Cache put/get walkthrough
//!
//! Run with: cargo run --bin cache-put-get -- --help

use anyhow::{Context, Result};
use clap::Parser;
use portable_grid::demo::{self, CACHE_NAME, CONFIG_PATH};
use portable_grid::model::Organization;
use portable_grid::{Grid, GridConfig};
use std::io::{self, BufRead, Write};

#[derive(Parser, Debug)]
#[command(name = "cache-put-get")]
#[command(about = "Put and get organizations in deserialized and binary form")]
struct Args {
    /// Grid configuration file
    #[arg(long, default_value = CONFIG_PATH)]
    config: String,

    /// Exit without waiting for Enter
    #[arg(long, default_value_t = false)]
    no_wait: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = GridConfig::from_file(&args.config)
        .with_context(|| format!("loading grid configuration from {}", args.config))?;

    let grid = Grid::start(&config).await.context("starting grid")?;
    let cache = grid
        .get_or_create_cache::<i32, Organization>(CACHE_NAME)
        .await?;

    demo::run_all(&cache).await?;

    grid.stop().await?;

    if !args.no_wait {
        print!("\n>>> Press Enter to exit...");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
    }

    Ok(())
}
