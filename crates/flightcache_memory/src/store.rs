// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The in-memory [`Store`] implementation.

use std::{
    fmt::Debug,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use dashmap::DashMap;
use flightcache_store::{Encoded, Error, Result, Store};
use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::MemoryStoreBuilder;

struct Row {
    data: Bytes,
    expires_at: Option<Instant>,
}

impl Row {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

struct Shared {
    rows: DashMap<String, Row>,
    closed: AtomicBool,
}

impl Shared {
    fn lookup(&self, key: &str, now: Instant) -> Option<Bytes> {
        let hit = self
            .rows
            .get(key)
            .and_then(|row| row.is_live(now).then(|| row.data.clone()));

        if hit.is_none() {
            self.rows.remove_if(key, |_, row| !row.is_live(now));
        }
        hit
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.rows.retain(|_, row| {
            let live = row.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }
}

/// A concurrent in-process store with per-entry expiry.
///
/// Expired entries are invisible to reads as soon as their deadline passes. A background
/// task started by [`MemoryStoreBuilder::build`] removes them from the map periodically.
/// The task holds only a weak reference to the data and stops once the store is dropped or
/// shut down.
pub struct MemoryStore {
    shared: Arc<Shared>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStore {
    /// Creates a store with the default sweep interval.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring a store.
    #[must_use]
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    pub(crate) fn from_builder(builder: &MemoryStoreBuilder) -> Self {
        let rows = builder.initial_capacity.map_or_else(DashMap::new, DashMap::with_capacity);
        let shared = Arc::new(Shared {
            rows,
            closed: AtomicBool::new(false),
        });

        let sweeper = if builder.sweep_interval.is_zero() {
            None
        } else if let Ok(handle) = tokio::runtime::Handle::try_current() {
            Some(handle.spawn(sweep(Arc::downgrade(&shared), builder.sweep_interval)))
        } else {
            tracing::debug!("no tokio runtime available, expired entries are removed on read only");
            None
        };

        Self {
            shared,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Returns the number of entries held, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.rows.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.rows.is_empty()
    }

    /// Removes every expired entry now and returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.shared.purge_expired(Instant::now())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            Err(Error::Shutdown)
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.len())
            .field("closed", &self.shared.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.abort();
        }
    }
}

async fn sweep(shared: Weak<Shared>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let removed = shared.purge_expired(Instant::now());
        if removed > 0 {
            tracing::trace!(removed, "swept expired entries");
        }
    }
}

impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_raw(key)
            .await?
            .map(|data| Encoded::Bytes(data).into_text())
            .transpose()
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self.shared.lookup(key, Instant::now()))
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, data: Encoded) -> Result<()> {
        self.ensure_open()?;
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };
        self.shared.rows.insert(
            key.to_string(),
            Row {
                data: data.into_bytes(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        self.shared.rows.remove(key);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.abort();
        }
        self.shared.rows.clear();
        tracing::debug!("memory store shut down");
        Ok(())
    }
}
