// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tests against a running Redis server.
//!
//! Set `FLIGHTCACHE_REDIS_URL` to run them; they pass trivially otherwise.

use std::time::Duration;

use flightcache_redis::{RedisOptions, RedisStore};
use flightcache_store::{Encoded, Error, Store};

async fn connect() -> Option<RedisStore> {
    let url = std::env::var("FLIGHTCACHE_REDIS_URL").ok()?;
    Some(RedisStore::connect(&RedisOptions::new(url)).await.expect("server is reachable"))
}

#[tokio::test]
async fn round_trips_text_and_bytes() {
    let Some(store) = connect().await else { return };

    store
        .set_with_expiry("flightcache:text", Duration::from_secs(30), "hello".into())
        .await
        .expect("set succeeds");
    assert_eq!(
        store.get("flightcache:text").await.expect("get succeeds").as_deref(),
        Some("hello")
    );

    let payload = vec![0_u8, 159, 146, 150];
    store
        .set_with_expiry("flightcache:raw", Duration::from_millis(1500), Encoded::from(payload.clone()))
        .await
        .expect("set succeeds");
    assert_eq!(
        store.get_raw("flightcache:raw").await.expect("get succeeds").as_deref(),
        Some(payload.as_slice())
    );

    store.delete("flightcache:text").await.expect("delete succeeds");
    store.delete("flightcache:raw").await.expect("delete succeeds");
    assert_eq!(store.get("flightcache:text").await.expect("get succeeds"), None);
}

#[tokio::test]
async fn operations_fail_after_shutdown() {
    let Some(store) = connect().await else { return };

    store.shutdown().await.expect("shutdown succeeds");
    assert!(matches!(store.get("flightcache:any").await, Err(Error::Shutdown)));
}

#[tokio::test]
async fn invalid_url_is_a_store_error() {
    let result = RedisStore::connect(&RedisOptions::new("not a url")).await;
    assert!(matches!(result, Err(Error::Store(_))));
}
