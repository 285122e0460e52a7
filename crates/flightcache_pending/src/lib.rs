// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Per-key registry of in-flight origin calls.
//!
//! [`PendingTasks`] is the bookkeeping behind single-flight cache population. When a key
//! misses, the first caller becomes the [`Owner`] of that key and runs the origin call.
//! Every caller arriving while the owner is still running becomes a [`Waiter`] and receives
//! the owner's outcome, success or failure, instead of starting a second origin call.
//!
//! # Example
//!
//! ```
//! use flightcache_pending::{PendingTasks, Role};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tasks = PendingTasks::<String>::new();
//!
//! let Role::Owner(owner) = tasks.enter("user:1") else { unreachable!() };
//! let Role::Waiter(waiter) = tasks.enter("user:1") else { unreachable!() };
//!
//! owner.settle(Ok("alice".to_string()));
//! assert_eq!(waiter.wait().await.unwrap(), "alice");
//! assert!(tasks.is_empty());
//! # }
//! ```
//!
//! # Entry lifecycle
//!
//! An entry is created, empty, when a caller becomes owner. Joining callers append a waiter
//! handle to it. [`Owner::settle`] removes the entry and then resolves every handle that
//! was appended, so an entry never outlives the call that owns it. Dropping an owner
//! without settling resolves its waiters with [`Error::Abandoned`].
//!
//! [`PendingTasks::clear`] discards entries without settling them. Waiters still queued at
//! that point observe [`Error::Shutdown`].
//!
//! # Thread Safety
//!
//! All state sits behind one mutex that is held only for the duration of a single
//! check-and-create, append or remove. No lock is ever held while an origin call runs or
//! while a waiter is suspended, and owners of different keys never block each other.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::atomic::{AtomicU64, Ordering},
};

use flightcache_store::{Error, Result};
use parking_lot::Mutex;
use tokio::sync::oneshot;

struct Entry<T> {
    generation: u64,
    waiters: Vec<oneshot::Sender<Result<T>>>,
}

/// Registry of in-flight origin calls, keyed by cache key.
///
/// Each cache instance owns its own registry; nothing is shared between instances.
pub struct PendingTasks<T> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    next_generation: AtomicU64,
}

impl<T> Default for PendingTasks<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }
}

impl<T> Debug for PendingTasks<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTasks").field("len", &self.len()).finish_non_exhaustive()
    }
}

/// The role a caller takes for a key after [`PendingTasks::enter`].
#[derive(Debug)]
pub enum Role<'a, T: Clone> {
    /// The caller must run the origin call and settle the entry.
    Owner(Owner<'a, T>),
    /// Another caller owns the key; await the handle for its outcome.
    Waiter(Waiter<T>),
}

impl<T> PendingTasks<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys with an origin call in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no origin call is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns `true` if an origin call for `key` is in flight.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Returns how many waiters are queued behind the owner of `key`.
    #[must_use]
    pub fn waiter_count(&self, key: &str) -> Option<usize> {
        self.entries.lock().get(key).map(|entry| entry.waiters.len())
    }

    /// Discards every entry without settling it and returns how many were dropped.
    ///
    /// Queued waiters observe [`Error::Shutdown`]. Owners that are still running keep going;
    /// when they settle, they find their entry gone and leave any newer entry for the same
    /// key untouched.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        if !drained.is_empty() {
            tracing::debug!(entries = drained.len(), "discarding pending origin calls");
        }
        drained.len()
    }

    /// Appends a waiter handle to the existing entry for `key`.
    ///
    /// Returns `None` if no origin call for `key` is in flight.
    #[must_use]
    pub fn join(&self, key: &str) -> Option<Waiter<T>> {
        self.entries.lock().get_mut(key).map(Waiter::append)
    }
}

impl<T: Clone> PendingTasks<T> {
    /// Becomes the owner of `key` if no origin call for it is in flight.
    ///
    /// The check and the creation of the entry happen atomically, so no two callers can
    /// both become owner of the same key.
    #[must_use]
    pub fn try_become_owner(&self, key: &str) -> Option<Owner<'_, T>> {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return None;
        }
        Some(self.create(&mut entries, key))
    }

    /// Becomes the owner of `key`, or joins the current owner as a waiter.
    ///
    /// This is [`try_become_owner`](Self::try_become_owner) followed by
    /// [`join`](Self::join) in a single critical section, so the entry cannot be settled
    /// between the two steps.
    pub fn enter(&self, key: &str) -> Role<'_, T> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            return Role::Waiter(Waiter::append(entry));
        }
        Role::Owner(self.create(&mut entries, key))
    }

    fn create(&self, entries: &mut HashMap<String, Entry<T>>, key: &str) -> Owner<'_, T> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            key.to_string(),
            Entry {
                generation,
                waiters: Vec::new(),
            },
        );
        Owner {
            tasks: self,
            key: key.to_string(),
            generation,
            settled: false,
        }
    }

    fn settle(&self, key: &str, generation: u64, outcome: &Result<T>) {
        let waiters = {
            let mut entries = self.entries.lock();
            let owned = entries.get(key).is_some_and(|entry| entry.generation == generation);
            if owned {
                entries.remove(key).map(|entry| entry.waiters).unwrap_or_default()
            } else {
                Vec::new()
            }
        };

        tracing::trace!(key, waiters = waiters.len(), success = outcome.is_ok(), "settling pending origin call");

        for waiter in waiters {
            if waiter.send(outcome.clone()).is_err() {
                tracing::trace!(key, "waiter dropped before the outcome arrived");
            }
        }
    }
}

/// Ownership of the in-flight origin call for one key.
///
/// The owner must report the outcome through [`settle`](Owner::settle). Dropping an owner
/// without settling, for example because its future was cancelled, settles every waiter
/// with [`Error::Abandoned`] so none of them is left hanging.
#[must_use = "an owner must settle its waiters"]
pub struct Owner<'a, T: Clone> {
    tasks: &'a PendingTasks<T>,
    key: String,
    generation: u64,
    settled: bool,
}

impl<T: Clone> Owner<'_, T> {
    /// Returns the key this owner is responsible for.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Removes the entry for this key and resolves every queued waiter with `outcome`.
    pub fn settle(mut self, outcome: Result<T>) {
        self.settled = true;
        self.tasks.settle(&self.key, self.generation, &outcome);
    }
}

impl<T: Clone> Drop for Owner<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(key = %self.key, "owner dropped before settling");
            self.tasks.settle(&self.key, self.generation, &Err(Error::Abandoned));
        }
    }
}

impl<T: Clone> Debug for Owner<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owner")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// A single-resolution handle on the outcome of another caller's origin call.
#[derive(Debug)]
pub struct Waiter<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> Waiter<T> {
    fn append(entry: &mut Entry<T>) -> Self {
        let (sender, receiver) = oneshot::channel();
        entry.waiters.push(sender);
        Self { receiver }
    }

    /// Suspends until the owner settles and returns its outcome.
    ///
    /// # Errors
    ///
    /// Returns the owner's error if the origin call failed, [`Error::Abandoned`] if the owner
    /// was dropped before settling, or [`Error::Shutdown`] if the registry was cleared.
    pub async fn wait(self) -> Result<T> {
        self.receiver.await.unwrap_or(Err(Error::Shutdown))
    }
}
