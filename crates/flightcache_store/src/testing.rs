// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock store implementation for testing.
//!
//! This module provides `MockStore`, an in-memory store that records every operation and
//! supports failure injection for exercising error paths. It ignores expiry; use a real
//! backend when a test depends on time passing.

use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::{Encoded, Error, Store};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A text read of the given key.
    Get(String),
    /// A raw read of the given key.
    GetRaw(String),
    /// A write of the given key.
    Set {
        /// The key that was written.
        key: String,
        /// The requested time-to-live.
        ttl: Duration,
        /// The payload that was written.
        data: Encoded,
    },
    /// A delete of the given key.
    Delete(String),
    /// A shutdown request.
    Shutdown,
}

type FailPredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

/// A configurable mock store for testing.
///
/// Clones share state, so a test can keep a handle while the cache owns another.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use flightcache_store::{Store, testing::{MockStore, StoreOp}};
///
/// # futures::executor::block_on(async {
/// let store = MockStore::new();
/// store.set_with_expiry("key", Duration::from_secs(1), "42".into()).await.unwrap();
/// assert_eq!(store.get("key").await.unwrap().as_deref(), Some("42"));
///
/// store.fail_when(|op| matches!(op, StoreOp::Get(_)));
/// assert!(store.get("key").await.is_err());
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockStore {
    data: Arc<Mutex<HashMap<String, Bytes>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl MockStore {
    /// Creates a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a predicate that decides which operations fail.
    ///
    /// A failing operation is still recorded but does not touch the stored data.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Returns how many writes have been recorded.
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.operations.lock().iter().filter(|op| matches!(op, StoreOp::Set { .. })).count()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns true if the store holds the given key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    fn record(&self, op: StoreOp) -> Result<(), Error> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let name = match &op {
            StoreOp::Get(_) => "get",
            StoreOp::GetRaw(_) => "get_raw",
            StoreOp::Set { .. } => "set",
            StoreOp::Delete(_) => "delete",
            StoreOp::Shutdown => "shutdown",
        };
        self.operations.lock().push(op);
        if fail {
            return Err(Error::store(format!("mock: {name} failed")));
        }
        Ok(())
    }
}

impl Store for MockStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.record(StoreOp::Get(key.to_string()))?;
        let found = self.data.lock().get(key).cloned();
        found.map(|bytes| Encoded::Bytes(bytes).into_text()).transpose()
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>, Error> {
        self.record(StoreOp::GetRaw(key.to_string()))?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, data: Encoded) -> Result<(), Error> {
        self.record(StoreOp::Set {
            key: key.to_string(),
            ttl,
            data: data.clone(),
        })?;
        self.data.lock().insert(key.to_string(), data.into_bytes());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.record(StoreOp::Delete(key.to_string()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), Error> {
        self.record(StoreOp::Shutdown)
    }
}
