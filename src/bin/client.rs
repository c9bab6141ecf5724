//! Grid client binary
//!
//! Run with: cargo run --bin grid-client -- --help

use anyhow::Result;
use clap::{Parser, Subcommand};
use portable_grid::client::ClientConfig;
use portable_grid::{BinaryObject, BinaryObjectBuilder, Cache, Grid};

/// Type name given to plain text values written from the command line
const TEXT_TYPE: &str = "Text";

#[derive(Parser, Debug)]
#[command(name = "grid-client")]
#[command(about = "Command line client for a grid node")]
struct Args {
    /// Client ID
    #[arg(long, default_value = "1")]
    client_id: u32,

    /// Node address (gRPC endpoint)
    #[arg(long, default_value = "http://[::1]:50051")]
    server_addr: String,

    /// Cache to operate on
    #[arg(long, default_value = "default")]
    cache: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value and print it as JSON
    Get {
        /// Key to get
        key: String,
    },
    /// Put a text value
    Put {
        /// Key to set
        key: String,
        /// Value to set
        value: String,
    },
    /// Remove a value
    Remove {
        /// Key to remove
        key: String,
    },
    /// Print the number of entries
    Size,
    /// Remove every entry
    Clear,
    /// List the node's caches
    List,
    /// Create the cache
    Create {
        /// TTL in seconds (0 = no expiration)
        #[arg(long, default_value = "0")]
        ttl: u64,
    },
    /// Run interactive REPL
    Repl,
}

fn text_value(value: &str) -> Result<BinaryObject> {
    let mut builder = BinaryObjectBuilder::new(TEXT_TYPE);
    builder.set_field("value", value);
    Ok(builder.build()?)
}

async fn cmd_get(cache: &Cache<String, BinaryObject>, key: &str) -> Result<()> {
    match cache.get(&key.to_string()).await {
        Ok(Some(object)) => {
            let json = serde_json::json!({
                "type": object.type_name(),
                "fields": object.to_json(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Ok(None) => println!("Key not found"),
        Err(e) => eprintln!("Error: {}", e),
    }
    Ok(())
}

async fn cmd_put(cache: &Cache<String, BinaryObject>, key: &str, value: &str) -> Result<()> {
    let object = text_value(value)?;
    match cache.put(&key.to_string(), &object).await {
        Ok(()) => println!("OK"),
        Err(e) => eprintln!("Error: {}", e),
    }
    Ok(())
}

async fn cmd_remove(cache: &Cache<String, BinaryObject>, key: &str) -> Result<()> {
    match cache.remove(&key.to_string()).await {
        Ok(true) => println!("Removed"),
        Ok(false) => println!("Key not found"),
        Err(e) => eprintln!("Error: {}", e),
    }
    Ok(())
}

async fn cmd_repl(cache: &Cache<String, BinaryObject>) -> Result<()> {
    use std::io::{self, BufRead, Write};

    println!(
        "Grid REPL on cache '{}' - Commands: get <key>, put <key> <value>, remove <key>, size, clear, quit",
        cache.name()
    );
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "get" => {
                if parts.len() < 2 {
                    println!("Usage: get <key>");
                    continue;
                }
                cmd_get(cache, parts[1]).await?;
            }
            "put" => {
                if parts.len() < 3 {
                    println!("Usage: put <key> <value>");
                    continue;
                }
                cmd_put(cache, parts[1], &parts[2..].join(" ")).await?;
            }
            "remove" | "rm" => {
                if parts.len() < 2 {
                    println!("Usage: remove <key>");
                    continue;
                }
                cmd_remove(cache, parts[1]).await?;
            }
            "size" => println!("{}", cache.size().await?),
            "clear" => println!("Removed {} entries", cache.clear().await?),
            "quit" | "exit" | "q" => {
                println!("Bye!");
                break;
            }
            _ => {
                println!("Unknown command: {}", parts[0]);
            }
        }
    }

    Ok(())
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

    let grid = Grid::connect(ClientConfig {
        client_id: args.client_id,
        server_addr: args.server_addr.clone(),
    })
    .await?;

    match &args.command {
        Commands::List => {
            for name in grid.cache_names().await? {
                println!("{}", name);
            }
        }
        Commands::Create { ttl } => {
            if grid.create_cache(&args.cache, *ttl).await? {
                println!("Created");
            } else {
                println!("Cache already exists");
            }
        }
        command => {
            let cache = grid.binary_cache::<String>(&args.cache).await?;
            match command {
                Commands::Get { key } => cmd_get(&cache, key).await?,
                Commands::Put { key, value } => cmd_put(&cache, key, value).await?,
                Commands::Remove { key } => cmd_remove(&cache, key).await?,
                Commands::Size => println!("{}", cache.size().await?),
                Commands::Clear => println!("Removed {} entries", cache.clear().await?),
                Commands::Repl => cmd_repl(&cache).await?,
                // Handled above
                Commands::List | Commands::Create { .. } => {}
            }
        }
    }

    grid.stop().await?;
    Ok(())
}
