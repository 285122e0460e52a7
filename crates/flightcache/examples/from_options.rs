// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Example demonstrating a cache opened from a configuration document.
//!
//! The backend is chosen in configuration. With the `redis` or `memcached` feature enabled,
//! swap the `backend` section for `{ "redis": { "url": "redis://127.0.0.1:6379" } }` or
//! `{ "memcached": { "server": "127.0.0.1:11211" } }`.

use std::time::Duration;

use flightcache::{CacheOptions, OriginContext};
use serde::{Deserialize, Serialize};

const CONFIG: &str = r#"{
    "ttl_secs": 120,
    "name": "profiles",
    "backend": { "memory": { "sweep_interval_ms": 1000 } }
}"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Profile {
    id: u64,
    display_name: String,
}

#[tokio::main]
async fn main() -> flightcache::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let options: CacheOptions =
        serde_json::from_str(CONFIG).map_err(|e| flightcache::Error::Config(e.to_string()))?;
    let cache = options.open::<Profile>().await?;
    println!("opened '{}' on the {} backend", cache.name(), cache.store().kind());

    for _ in 0..2 {
        let profile = cache
            .get_or_fetch("profile:42", |ctx: OriginContext| async move {
                println!("loading {} from the database", ctx.key());
                // Guests change often; keep them briefly.
                ctx.set_ttl(Duration::from_secs(10));
                Ok::<_, std::io::Error>(Profile {
                    id: 42,
                    display_name: "guest".to_string(),
                })
            })
            .await?;
        println!("{profile:?}");
    }

    cache.destroy().await
}
