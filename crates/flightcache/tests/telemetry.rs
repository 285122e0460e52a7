// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tests for the logs and metrics emitted by cache operations.

use std::time::Duration;

use flightcache::{Cache, MemoryStoreBuilder, OriginContext, TelemetryConfig};
use futures_util::future::join_all;
use testing_aids::LogCapture;

#[tokio::test(start_paused = true)]
async fn fetch_logs_every_role() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let cache = Cache::builder::<u32>(Duration::from_secs(60))
        .memory_with(MemoryStoreBuilder::new().sweep_interval(Duration::ZERO))
        .name("orders")
        .build();

    let fetches = (0..3).map(|_| {
        cache.get_or_fetch("order:1", |_ctx: OriginContext| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, std::io::Error>(1)
        })
    });
    join_all(fetches).await;
    cache.get("order:1").await.unwrap();

    capture.assert_contains("cache.name=\"orders\"");
    assert_eq!(capture.count_lines_containing("cache.activity=\"cache.miss\""), 3);
    assert_eq!(capture.count_lines_containing("cache.activity=\"cache.owner\""), 1);
    assert_eq!(capture.count_lines_containing("cache.activity=\"cache.coalesced\""), 2);
    assert_eq!(capture.count_lines_containing("cache.activity=\"cache.stored\""), 1);
    assert_eq!(capture.count_lines_containing("cache.activity=\"cache.hit\""), 1);
    capture.assert_contains("cache.duration_ns");
}

#[tokio::test]
async fn origin_failure_is_logged_as_error() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let cache = Cache::builder::<u32>(Duration::from_secs(60)).memory().build();
    let result = cache
        .get_or_fetch("k", |_ctx: OriginContext| async { Err::<u32, _>(std::io::Error::other("boom")) })
        .await;
    assert!(result.is_err());

    let line = capture
        .output()
        .lines()
        .find(|line| line.contains("cache.origin_error"))
        .map(str::to_string)
        .expect("origin error is logged");
    assert!(line.contains("ERROR"), "unexpected level: {line}");
}

#[tokio::test]
async fn disabled_logs_stay_quiet() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let cache = Cache::builder::<u32>(Duration::from_secs(60))
        .memory_with(MemoryStoreBuilder::new().sweep_interval(Duration::ZERO))
        .telemetry(TelemetryConfig::new())
        .build();
    cache.set("k", &1).await.unwrap();
    cache.get("k").await.unwrap();
    cache.delete("k").await.unwrap();

    capture.assert_not_contains("cache.event");
}

#[tokio::test]
async fn write_and_destroy_are_logged() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let cache = Cache::builder::<u32>(Duration::from_secs(60)).memory().build();
    cache.set("k", &1).await.unwrap();
    cache.delete("k").await.unwrap();
    cache.destroy().await.unwrap();

    capture.assert_contains("cache.operation=\"cache.set\"");
    capture.assert_contains("cache.activity=\"cache.deleted\"");
    capture.assert_contains("cache.activity=\"cache.destroyed\"");
}

#[cfg(feature = "metrics")]
mod metrics {
    use opentelemetry::KeyValue;
    use testing_aids::MetricTester;

    use super::*;

    #[tokio::test]
    async fn events_are_counted() {
        let tester = MetricTester::new();
        let cache = Cache::builder::<u32>(Duration::from_secs(60))
            .memory_with(MemoryStoreBuilder::new().sweep_interval(Duration::ZERO))
            .name("metered")
            .telemetry(TelemetryConfig::new().with_metrics(tester.meter_provider()))
            .build();

        // Miss, owner and stored, then a hit.
        cache
            .get_or_fetch("k", |_ctx: OriginContext| async { Ok::<_, std::io::Error>(5) })
            .await
            .unwrap();
        cache.get("k").await.unwrap();

        assert_eq!(tester.counter_total("cache.event.count"), 4);
        tester.assert_attributes_contain(&[
            KeyValue::new("cache.name", "metered"),
            KeyValue::new("cache.operation", "cache.fetch"),
            KeyValue::new("cache.activity", "cache.owner"),
            KeyValue::new("cache.activity", "cache.hit"),
        ]);
    }
}
