// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `PendingTasks`.

use std::{
    sync::{
        Arc,
        atomic::{
            AtomicUsize,
            Ordering::{AcqRel, Acquire},
        },
    },
    time::Duration,
};

use flightcache_pending::{PendingTasks, Role};
use flightcache_store::Error;
use futures_util::{StreamExt, stream::FuturesUnordered};

#[tokio::test]
async fn waiters_receive_the_owner_value() {
    let tasks = PendingTasks::<String>::new();

    let Role::Owner(owner) = tasks.enter("key") else {
        panic!("first caller should own the key");
    };
    let waiters: Vec<_> = (0..5)
        .map(|_| match tasks.enter("key") {
            Role::Waiter(waiter) => waiter,
            Role::Owner(_) => panic!("key is already owned"),
        })
        .collect();
    assert_eq!(tasks.waiter_count("key"), Some(5));

    owner.settle(Ok("Result".to_string()));
    assert!(tasks.is_empty());

    for waiter in waiters {
        assert_eq!(waiter.wait().await.expect("owner succeeded"), "Result");
    }
}

#[tokio::test]
async fn waiters_share_the_owner_failure() {
    let tasks = PendingTasks::<String>::new();

    let Role::Owner(owner) = tasks.enter("key") else {
        panic!("first caller should own the key");
    };
    let first = tasks.join("key").expect("entry exists");
    let second = tasks.join("key").expect("entry exists");

    let failure = Error::origin("database unavailable");
    owner.settle(Err(failure.clone()));

    let first = first.wait().await.expect_err("owner failed");
    let second = second.wait().await.expect_err("owner failed");
    let original = failure.origin_source().expect("origin source");
    assert!(Arc::ptr_eq(original, first.origin_source().expect("origin source")));
    assert!(Arc::ptr_eq(original, second.origin_source().expect("origin source")));
    assert_eq!(first.to_string(), second.to_string());
}

#[tokio::test]
async fn dropped_owner_abandons_waiters_and_frees_the_key() {
    let tasks = PendingTasks::<u32>::new();

    let owner = tasks.try_become_owner("key").expect("first caller owns");
    let waiter = tasks.join("key").expect("entry exists");
    drop(owner);

    assert!(matches!(waiter.wait().await, Err(Error::Abandoned)));
    assert!(!tasks.contains("key"));
    assert!(tasks.try_become_owner("key").is_some());
}

#[tokio::test]
async fn cancelled_owner_task_abandons_waiters() {
    let tasks = Arc::new(PendingTasks::<u32>::new());

    let owner_tasks = Arc::clone(&tasks);
    let owner = async move {
        let owner = owner_tasks.try_become_owner("key").expect("first caller owns");
        std::future::pending::<()>().await;
        owner.settle(Ok(1));
    };
    // Give the spawned owner a chance to register the key.
    let owner = tokio::spawn(owner);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let waiter = tasks.join("key").expect("owner registered the key");
    owner.abort();

    assert!(matches!(waiter.wait().await, Err(Error::Abandoned)));
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn clear_leaves_waiters_with_shutdown() {
    let tasks = PendingTasks::<u32>::new();

    let owner = tasks.try_become_owner("key").expect("first caller owns");
    let waiter = tasks.join("key").expect("entry exists");

    assert_eq!(tasks.clear(), 1);
    assert!(matches!(waiter.wait().await, Err(Error::Shutdown)));

    // Settling after the entry was discarded is harmless.
    owner.settle(Ok(7));
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn failure_does_not_poison_the_key() {
    let tasks = PendingTasks::<u32>::new();

    let owner = tasks.try_become_owner("key").expect("first caller owns");
    owner.settle(Err(Error::origin("boom")));

    let owner = tasks.try_become_owner("key").expect("key is free again");
    let waiter = tasks.join("key").expect("entry exists");
    owner.settle(Ok(2));
    assert_eq!(waiter.wait().await.expect("second attempt succeeded"), 2);
}

#[tokio::test]
async fn distinct_keys_have_distinct_owners() {
    let tasks = PendingTasks::<u32>::new();

    let first = tasks.try_become_owner("a").expect("a is free");
    let second = tasks.try_become_owner("b").expect("b is free");
    assert_eq!(tasks.len(), 2);

    second.settle(Ok(2));
    assert!(tasks.contains("a"));
    assert!(!tasks.contains("b"));
    first.settle(Ok(1));
}

#[tokio::test]
async fn dropped_waiter_does_not_disturb_others() {
    let tasks = PendingTasks::<u32>::new();

    let owner = tasks.try_become_owner("key").expect("first caller owns");
    let gone = tasks.join("key").expect("entry exists");
    let kept = tasks.join("key").expect("entry exists");
    drop(gone);

    owner.settle(Ok(3));
    assert_eq!(kept.wait().await.expect("owner succeeded"), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_elect_exactly_one_owner() {
    let tasks = Arc::new(PendingTasks::<usize>::new());
    let owners = Arc::new(AtomicUsize::new(0));

    let futures = FuturesUnordered::new();
    for _ in 0..100 {
        let tasks = Arc::clone(&tasks);
        let owners = Arc::clone(&owners);
        futures.push(tokio::spawn(async move {
            let role = tasks.enter("key");
            match role {
                Role::Owner(owner) => {
                    owners.fetch_add(1, AcqRel);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    owner.settle(Ok(42));
                    42
                }
                Role::Waiter(waiter) => waiter.wait().await.expect("owner succeeded"),
            }
        }));
    }

    let results: Vec<_> = futures.collect().await;
    // Callers that arrive after the owner settled start a new episode, but all of them
    // spawn well within the owner's sleep.
    assert_eq!(owners.load(Acquire), 1);
    assert!(results.into_iter().all(|r| r.expect("task panicked") == 42));
    assert!(tasks.is_empty());
}
