// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Example demonstrating how concurrent misses share a single origin call.
//!
//! A hundred tasks ask for the same cold key at once. Only one of them queries the slow
//! origin; the others wait for its answer. The same happens when the origin fails: every
//! caller sees the one failure, and nothing is cached.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use flightcache::{Cache, OriginContext};

#[tokio::main]
async fn main() -> flightcache::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let cache = Cache::builder::<String>(Duration::from_secs(30)).name("reports").memory().build();
    let origin_calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let cache = cache.clone();
            let origin_calls = Arc::clone(&origin_calls);
            tokio::spawn(async move {
                cache
                    .get_or_fetch("report:daily", move |ctx: OriginContext| async move {
                        origin_calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok::<_, std::io::Error>(format!("contents of {}", ctx.key()))
                    })
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.map_err(flightcache::Error::from_message)??;
    }
    println!("100 callers, {} origin call(s)", origin_calls.load(Ordering::SeqCst));

    let failures = futures_util::future::join_all((0..5).map(|_| {
        cache.get_or_fetch("report:broken", |_ctx: OriginContext| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<String, _>(std::io::Error::other("report generator is down"))
        })
    }))
    .await;
    for failure in failures {
        if let Err(e) = failure {
            println!("caller saw: {e}");
        }
    }
    println!("failure cached: {}", cache.get("report:broken").await?.is_some());

    cache.destroy().await
}
