//! Integration tests for the portable grid

use portable_grid::client::ClientConfig;
use portable_grid::config::{CacheSection, ClientSection, GridConfig, GridMode, ServerSection};
use portable_grid::demo::{self, CACHE_NAME};
use portable_grid::model::{Organization, OrganizationType};
use portable_grid::{BinaryObject, Cache, Grid, GridClient, GridError};
use std::io::Write;
use std::time::Duration;

/// Find an available port for testing
fn find_available_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn embedded_config(listen_addr: Option<String>) -> GridConfig {
    GridConfig {
        mode: GridMode::Embedded,
        server: listen_addr.map(|listen_addr| ServerSection { listen_addr }),
        caches: vec![CacheSection {
            name: CACHE_NAME.to_string(),
            ttl_seconds: 0,
        }],
        ..Default::default()
    }
}

/// Start a served node and a client connected to it
async fn served_grid_and_client() -> (Grid, Grid) {
    let (server, client, _) = served_grid_and_client_on_port().await;
    (server, client)
}

async fn served_grid_and_client_on_port() -> (Grid, Grid, u16) {
    let port = find_available_port();
    let server = Grid::start(&embedded_config(Some(format!("127.0.0.1:{}", port))))
        .await
        .unwrap();

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = Grid::connect(ClientConfig {
        client_id: 1,
        server_addr: format!("http://127.0.0.1:{}", port),
    })
    .await
    .unwrap();

    (server, client, port)
}

async fn check_walkthrough(cache: &Cache<i32, Organization>) {
    cache.put(&99, &demo::red_cross()).await.unwrap();
    cache.clear().await.unwrap();
    assert_eq!(cache.size().await.unwrap(), 0);
    assert!(cache.get(&99).await.unwrap().is_none());

    let org = demo::put_get(cache).await.unwrap().unwrap();
    assert_eq!(org.name(), "Microsoft");

    let name = demo::put_get_binary(cache).await.unwrap();
    assert_eq!(name.as_deref(), Some("Microsoft"));

    let orgs = demo::put_all_get_all(cache).await.unwrap();
    assert_eq!(orgs.len(), 2);
    assert_eq!(orgs[&1].name(), "Microsoft");
    assert_eq!(orgs[&2].name(), "Red Cross");
    assert_eq!(orgs[&2].org_type(), OrganizationType::NonProfit);

    let names = demo::put_all_get_all_binary(cache).await.unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(names[&1], "Microsoft");
    assert_eq!(names[&2], "Red Cross");
}

#[tokio::test]
async fn test_walkthrough_embedded() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("portable_grid=debug")
        .try_init();

    let grid = Grid::start(&embedded_config(None)).await.unwrap();
    let cache = grid.cache::<i32, Organization>(CACHE_NAME).await.unwrap();

    check_walkthrough(&cache).await;
    demo::run_all(&cache).await.unwrap();

    grid.stop().await.unwrap();
}

#[tokio::test]
async fn test_walkthrough_remote() {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();

    let (server, client) = served_grid_and_client().await;
    assert_eq!(client.node_id(), Some(0));
    assert_eq!(server.local_node().unwrap().client_count(), 1);

    let cache = client.cache::<i32, Organization>(CACHE_NAME).await.unwrap();
    check_walkthrough(&cache).await;

    // Writes through the client are visible on the node
    let local = server
        .cache::<i32, Organization>(CACHE_NAME)
        .await
        .unwrap();
    assert_eq!(local.size().await.unwrap(), 2);
    assert_eq!(local.get(&2).await.unwrap().unwrap().name(), "Red Cross");

    client.stop().await.unwrap();
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_remote_binary_fields_and_errors() {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();

    let (server, client, port) = served_grid_and_client_on_port().await;

    let cache = client.cache::<i32, Organization>(CACHE_NAME).await.unwrap();
    cache.put(&1, &demo::microsoft()).await.unwrap();

    let binary: Cache<i32, BinaryObject> = client.binary_cache(CACHE_NAME).await.unwrap();
    let object = binary.get(&1).await.unwrap().unwrap();
    let address = object.field_as::<BinaryObject>("address").unwrap();
    assert_eq!(address.field_as::<i32>("zip").unwrap(), 94109);

    // Unknown caches are reported as such
    let err = client
        .cache::<i32, Organization>("nope")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, GridError::CacheNotFound(_)));

    // Removing a key through the client
    assert!(cache.remove(&1).await.unwrap());
    assert!(!cache.remove(&1).await.unwrap());

    // A second, bare client can register and heartbeat
    let bare = GridClient::new(ClientConfig {
        client_id: 2,
        server_addr: format!("http://127.0.0.1:{}", port),
    });
    bare.connect().await.unwrap();
    assert!(bare.heartbeat().await.unwrap());
    assert_eq!(bare.node_info().unwrap().node_id, 0);
    bare.disconnect();
    assert!(!bare.is_connected());

    // Caches created remotely appear on the node
    assert!(client.create_cache("remote-made", 0).await.unwrap());
    assert!(server
        .cache_names()
        .await
        .unwrap()
        .contains(&"remote-made".to_string()));

    client.stop().await.unwrap();
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_ttl_expiry() {
    let mut config = embedded_config(None);
    config.caches.push(CacheSection {
        name: "short-lived".to_string(),
        ttl_seconds: 1,
    });
    let grid = Grid::start(&config).await.unwrap();
    let cache = grid
        .cache::<i32, Organization>("short-lived")
        .await
        .unwrap();

    cache.put(&1, &demo::microsoft()).await.unwrap();
    assert!(cache.get(&1).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(cache.get(&1).await.unwrap().is_none());
    assert_eq!(cache.size().await.unwrap(), 0);
    assert_eq!(grid.local_node().unwrap().memory_stats().used, 0);
}

#[tokio::test]
async fn test_start_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[node]
node_id = 5
memory_mb = 1

[[caches]]
name = "{}"
"#,
        CACHE_NAME
    )
    .unwrap();

    let config = GridConfig::from_file(file.path()).unwrap();
    let grid = Grid::start(&config).await.unwrap();
    assert_eq!(grid.node_id(), Some(5));

    let cache = grid.cache::<i32, Organization>(CACHE_NAME).await.unwrap();
    demo::run_all(&cache).await.unwrap();
    assert_eq!(cache.size().await.unwrap(), 2);
}

#[tokio::test]
async fn test_start_fails_on_unusable_listen_addr() {
    let err = Grid::start(&embedded_config(Some("not-an-address".to_string())))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, GridError::Config { .. }));

    // Port already held by another listener
    let holder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken = holder.local_addr().unwrap().to_string();
    let err = Grid::start(&embedded_config(Some(taken)))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("cannot listen"));
}

#[tokio::test]
async fn test_start_in_client_mode() {
    let port = find_available_port();
    let server = Grid::start(&embedded_config(Some(format!("127.0.0.1:{}", port))))
        .await
        .unwrap();

    let config = GridConfig {
        mode: GridMode::Client,
        client: Some(ClientSection {
            client_id: 4,
            server_addr: format!("http://127.0.0.1:{}", port),
        }),
        caches: vec![CacheSection {
            name: "client-declared".to_string(),
            ttl_seconds: 0,
        }],
        ..Default::default()
    };
    let client = Grid::start(&config).await.unwrap();
    assert_eq!(client.node_id(), Some(0));
    assert!(client.local_node().is_none());

    // Caches declared by the client config exist on the node
    assert!(server
        .cache_names()
        .await
        .unwrap()
        .contains(&"client-declared".to_string()));

    let cache = client
        .cache::<i32, Organization>("client-declared")
        .await
        .unwrap();
    demo::run_all(&cache).await.unwrap();
    assert_eq!(cache.size().await.unwrap(), 2);

    client.stop().await.unwrap();
    server.stop().await.unwrap();
}
