// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt::Debug, time::Duration};

use flightcache_store::{Result, Store};

use crate::{Cache, OriginContext};

/// A key bound to its origin function and time-to-live.
///
/// Created by [`Cache::define`] and [`Cache::define_with_ttl`]. Each call to
/// [`fetch`](Self::fetch) behaves like [`Cache::get_or_fetch_with_ttl`] with the bound
/// arguments, so concurrent fetches through clones of the cache still share one origin call.
pub struct Defined<V, S, F> {
    cache: Cache<V, S>,
    key: String,
    ttl: Duration,
    origin: F,
}

impl<V, S, F> Defined<V, S, F> {
    pub(crate) fn new(cache: Cache<V, S>, key: String, ttl: Duration, origin: F) -> Self {
        Self { cache, key, ttl, origin }
    }

    /// Returns the bound key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the bound time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<V, S, F, Fut, E> Defined<V, S, F>
where
    V: Clone + Send,
    S: Store,
    F: Fn(OriginContext) -> Fut,
    Fut: Future<Output = std::result::Result<V, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    /// Reads the bound key, calling the bound origin on a miss.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Cache::get_or_fetch_with_ttl`].
    pub async fn fetch(&self) -> Result<V> {
        self.cache.get_or_fetch_with_ttl(&self.key, self.ttl, &self.origin).await
    }
}

impl<V, S: Debug, F> Debug for Defined<V, S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Defined")
            .field("cache", &self.cache)
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
