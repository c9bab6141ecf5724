//! Put/get walkthrough against an `Organization` cache
//!
//! Each procedure writes its entries, reads them back and prints what it got.
//! The values read are returned so callers can check them.

use crate::binary::BinaryObject;
use crate::cache::Cache;
use crate::error::Result;
use crate::model::{Address, Organization, OrganizationType};
use chrono::Utc;
use std::collections::HashMap;

/// Name of the cache the walkthrough uses
pub const CACHE_NAME: &str = "put-get-example";

/// Default configuration file for the walkthrough binary
pub const CONFIG_PATH: &str = "config/grid.toml";

pub fn microsoft() -> Organization {
    Organization::new(
        "Microsoft",
        Address::new("1096 Eddy Street, San Francisco, CA", 94109),
        OrganizationType::Private,
        Utc::now(),
    )
}

pub fn red_cross() -> Organization {
    Organization::new(
        "Red Cross",
        Address::new("184 Fidler Drive, San Antonio, TX", 78205),
        OrganizationType::NonProfit,
        Utc::now(),
    )
}

/// Put one organization and read it back deserialized
pub async fn put_get(cache: &Cache<i32, Organization>) -> Result<Option<Organization>> {
    cache.put(&1, &microsoft()).await?;
    println!(">>> Stored organization in cache.");

    let org = cache.get(&1).await?;
    match &org {
        Some(org) => println!(">>> Retrieved organization instance from cache: {}", org),
        None => println!(">>> Organization not found in cache."),
    }
    Ok(org)
}

/// Put one organization and read back only its name from the binary form
pub async fn put_get_binary(cache: &Cache<i32, Organization>) -> Result<Option<String>> {
    cache.put(&1, &microsoft()).await?;
    println!(">>> Stored organization in cache.");

    let binary = cache.with_keep_binary();
    let name = match binary.get(&1).await? {
        Some(org) => Some(org.field_as::<String>("name")?),
        None => None,
    };
    match &name {
        Some(name) => println!(">>> Retrieved organization name from binary object: {}", name),
        None => println!(">>> Organization not found in cache."),
    }
    Ok(name)
}

/// Put two organizations in one call and read both back deserialized
pub async fn put_all_get_all(
    cache: &Cache<i32, Organization>,
) -> Result<HashMap<i32, Organization>> {
    let (org1, org2) = (microsoft(), red_cross());
    cache.put_all([(&1, &org1), (&2, &org2)]).await?;
    println!(">>> Stored organizations in cache.");

    let orgs = cache.get_all(&[1, 2]).await?;
    println!(">>> Retrieved organization instances from cache:");
    let mut keys: Vec<_> = orgs.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        println!(">>>     {}", orgs[&key]);
    }
    Ok(orgs)
}

/// Put two organizations in one call and read both names from binary form
pub async fn put_all_get_all_binary(
    cache: &Cache<i32, Organization>,
) -> Result<HashMap<i32, String>> {
    let (org1, org2) = (microsoft(), red_cross());
    cache.put_all([(&1, &org1), (&2, &org2)]).await?;
    println!(">>> Stored organizations in cache.");

    let binary: Cache<i32, BinaryObject> = cache.with_keep_binary();
    let objects = binary.get_all(&[1, 2]).await?;

    let mut names = HashMap::with_capacity(objects.len());
    for (key, object) in &objects {
        names.insert(*key, object.field_as::<String>("name")?);
    }

    println!(">>> Retrieved organization names from binary objects:");
    let mut keys: Vec<_> = names.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        println!(">>>     {}", names[&key]);
    }
    Ok(names)
}

/// Clear the cache, then run all four procedures in order
pub async fn run_all(cache: &Cache<i32, Organization>) -> Result<()> {
    println!();
    println!(">>> Cache put-get example started.");

    let removed = cache.clear().await?;
    tracing::debug!("Cleared {} stale entries from '{}'", removed, cache.name());

    put_get(cache).await?;
    put_get_binary(cache).await?;
    put_all_get_all(cache).await?;
    put_all_get_all_binary(cache).await?;

    println!();
    println!(">>> Example finished.");
    Ok(())
}
