// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "test-util")]

//! Integration tests for the `Store` contract using `MockStore`.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use flightcache_store::{
    Encoded, Error, Store,
    testing::{MockStore, StoreOp},
};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[test]
fn missing_key_is_absent_not_an_error() {
    block_on(async {
        let store = MockStore::new();
        assert_eq!(store.get("missing").await.expect("get failed"), None);
        assert_eq!(store.get_raw("missing").await.expect("get_raw failed"), None);
    });
}

#[test]
fn text_and_raw_reads_see_the_same_payload() {
    block_on(async {
        let store = MockStore::new();
        store
            .set_with_expiry("key", Duration::from_secs(5), Encoded::from("[1,2,3]"))
            .await
            .expect("set failed");

        assert_eq!(store.get("key").await.expect("get failed").as_deref(), Some("[1,2,3]"));
        assert_eq!(
            store.get_raw("key").await.expect("get_raw failed"),
            Some(Bytes::from_static(b"[1,2,3]"))
        );
    });
}

#[test]
fn delete_is_idempotent() {
    block_on(async {
        let store = MockStore::new();
        store.set_with_expiry("key", Duration::from_secs(5), "v".into()).await.expect("set failed");

        store.delete("key").await.expect("first delete failed");
        store.delete("key").await.expect("second delete failed");
        assert!(!store.contains_key("key"));
    });
}

#[test]
fn operations_are_recorded_in_order() {
    block_on(async {
        let store = MockStore::new();
        store.set_with_expiry("a", Duration::from_secs(3), "1".into()).await.expect("set failed");
        let _ = store.get("a").await.expect("get failed");
        store.delete("a").await.expect("delete failed");
        store.shutdown().await.expect("shutdown failed");

        assert_eq!(
            store.operations(),
            vec![
                StoreOp::Set {
                    key: "a".to_string(),
                    ttl: Duration::from_secs(3),
                    data: Encoded::from("1"),
                },
                StoreOp::Get("a".to_string()),
                StoreOp::Delete("a".to_string()),
                StoreOp::Shutdown,
            ]
        );
        assert_eq!(store.set_count(), 1);
    });
}

#[test]
fn injected_failures_surface_as_store_errors() {
    block_on(async {
        let store = MockStore::new();
        store.fail_when(|op| matches!(op, StoreOp::Set { key, .. } if key == "forbidden"));

        let err = store
            .set_with_expiry("forbidden", Duration::from_secs(1), "x".into())
            .await
            .expect_err("set should fail");
        assert!(matches!(err, Error::Store(_)));
        assert!(!store.contains_key("forbidden"));

        store.set_with_expiry("allowed", Duration::from_secs(1), "x".into()).await.expect("set failed");

        store.clear_failures();
        store.set_with_expiry("forbidden", Duration::from_secs(1), "x".into()).await.expect("set failed");
        assert!(store.contains_key("forbidden"));
    });
}

#[test]
fn arc_wrapped_store_delegates() {
    block_on(async {
        let store = Arc::new(MockStore::new());
        store.set_with_expiry("key", Duration::from_secs(1), "v".into()).await.expect("set failed");
        assert_eq!(Store::get(&store, "key").await.expect("get failed").as_deref(), Some("v"));
    });
}
