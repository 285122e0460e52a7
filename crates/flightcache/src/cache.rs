// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache facade.

use std::{fmt::Debug, sync::Arc, time::Duration, time::Instant};

use flightcache_pending::{PendingTasks, Role};
use flightcache_store::{Encoded, Error, Result, Store};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    CacheBuilder, Codec, Defined, JsonCodec, OriginContext,
    telemetry::{CacheActivity, CacheOperation, CacheTelemetry},
};

/// A read-through cache that coalesces concurrent origin calls for the same key.
///
/// Reads go to the store first. On a miss, the first caller for a key runs the origin
/// function while every caller arriving for the same key in the meantime waits for that
/// single call and receives its outcome, success or failure. The result is encoded, written
/// to the store with the caller's time-to-live and handed to everyone.
///
/// `Cache` is cheap to clone; clones share the store and the registry of in-flight calls.
///
/// Create a cache with [`Cache::builder`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use flightcache::{Cache, OriginContext};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> flightcache::Result<()> {
/// let cache = Cache::builder::<String>(Duration::from_secs(60)).memory().build();
///
/// // A miss runs the origin and stores its result.
/// let name = cache
///     .get_or_fetch("user:1", |ctx: OriginContext| async move {
///         Ok::<_, std::io::Error>(format!("name of {}", ctx.key()))
///     })
///     .await?;
/// assert_eq!(name, "name of user:1");
///
/// // The next read is a hit.
/// assert_eq!(cache.get("user:1").await?, Some(name));
/// # Ok(())
/// # }
/// ```
pub struct Cache<V, S = ()> {
    inner: Arc<CacheInner<V, S>>,
}

struct CacheInner<V, S> {
    name: String,
    store: S,
    codec: Box<dyn Codec<V>>,
    pending: PendingTasks<V>,
    default_ttl: Duration,
    decode_raw: bool,
    telemetry: CacheTelemetry,
}

impl<V, S> Clone for Cache<V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, S: Debug> Debug for Cache<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.inner.name)
            .field("store", &self.inner.store)
            .field("default_ttl", &self.inner.default_ttl)
            .field("decode_raw", &self.inner.decode_raw)
            .field("pending", &self.inner.pending.len())
            .finish_non_exhaustive()
    }
}

impl Cache<(), ()> {
    /// Creates a builder for a cache of `V` values encoded as JSON.
    ///
    /// `default_ttl` is the time-to-live used when an operation does not name one.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use flightcache::Cache;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let cache = Cache::builder::<Vec<u32>>(Duration::from_secs(30))
    ///     .memory()
    ///     .name("scores")
    ///     .build();
    /// assert_eq!(cache.name(), "scores");
    /// # }
    /// ```
    #[must_use]
    pub fn builder<V>(default_ttl: Duration) -> CacheBuilder<V>
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        CacheBuilder::new(default_ttl, Box::new(JsonCodec))
    }

    /// Creates a builder for a cache of `V` values encoded with `codec`.
    ///
    /// Use this for value types that are not serde-serializable, such as raw
    /// [`Bytes`](bytes::Bytes) with [`BytesCodec`](crate::BytesCodec).
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use bytes::Bytes;
    /// use flightcache::{BytesCodec, Cache};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> flightcache::Result<()> {
    /// let cache = Cache::builder_with_codec::<Bytes>(Duration::from_secs(30), BytesCodec)
    ///     .memory()
    ///     .decode_raw(true)
    ///     .build();
    ///
    /// cache.set("blob", &Bytes::from_static(&[0, 159, 146, 150])).await?;
    /// assert_eq!(cache.get("blob").await?, Some(Bytes::from_static(&[0, 159, 146, 150])));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn builder_with_codec<V>(default_ttl: Duration, codec: impl Codec<V> + 'static) -> CacheBuilder<V> {
        CacheBuilder::new(default_ttl, Box::new(codec))
    }
}

impl<V, S> Cache<V, S> {
    pub(crate) fn from_parts(
        name: String,
        store: S,
        codec: Box<dyn Codec<V>>,
        default_ttl: Duration,
        decode_raw: bool,
        telemetry: CacheTelemetry,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                name,
                store,
                codec,
                pending: PendingTasks::new(),
                default_ttl,
                decode_raw,
                telemetry,
            }),
        }
    }

    /// Returns the name this cache reports in telemetry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the time-to-live used when an operation does not name one.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Returns `true` if the cache reads payloads as raw bytes.
    #[must_use]
    pub fn decode_raw(&self) -> bool {
        self.inner.decode_raw
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Returns the number of keys whose origin call is currently in flight.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }

    fn record(&self, operation: CacheOperation, activity: CacheActivity, started: Instant) {
        self.inner
            .telemetry
            .record(&self.inner.name, operation, activity, Some(started.elapsed()));
    }

    /// Converts an encoded value into the form the store hands back on a read.
    fn as_read(&self, encoded: Encoded) -> Result<Encoded> {
        if self.inner.decode_raw {
            Ok(Encoded::Bytes(encoded.into_bytes()))
        } else {
            encoded.into_text().map(Encoded::Text)
        }
    }
}

impl<V, S> Cache<V, S>
where
    V: Clone + Send,
    S: Store,
{
    /// Reads `key` without populating it.
    ///
    /// Returns `None` if the key is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store fails and [`Error::Codec`] if the stored payload
    /// cannot be decoded.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        let started = Instant::now();
        match self.read(key).await {
            Ok(Some(value)) => {
                self.record(CacheOperation::Get, CacheActivity::Hit, started);
                Ok(Some(value))
            }
            Ok(None) => {
                self.record(CacheOperation::Get, CacheActivity::Miss, started);
                Ok(None)
            }
            Err(e) => {
                self.record(CacheOperation::Get, CacheActivity::Error, started);
                Err(e)
            }
        }
    }

    /// Reads `key`, calling `origin` on a miss and storing its result with the default
    /// time-to-live.
    ///
    /// See [`get_or_fetch_with_ttl`](Self::get_or_fetch_with_ttl).
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`get_or_fetch_with_ttl`](Self::get_or_fetch_with_ttl).
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, origin: F) -> Result<V>
    where
        F: FnOnce(OriginContext) -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.get_or_fetch_with_ttl(key, self.inner.default_ttl, origin).await
    }

    /// Reads `key`, calling `origin` on a miss and storing its result for `ttl`.
    ///
    /// A hit never calls `origin`. On a miss, at most one origin call per key is in flight in
    /// this cache: the first caller runs `origin`, and callers arriving before it finishes wait
    /// for its outcome instead of calling `origin` themselves. The result is written to the
    /// store once, with the time-to-live held by the [`OriginContext`] when `origin` returns.
    ///
    /// Every caller receives the value as it reads back from the store, that is
    /// `decode(encode(value))`.
    ///
    /// # Errors
    ///
    /// - [`Error::Origin`] if `origin` fails. Every coalesced caller receives the same cause.
    /// - [`Error::Store`] or [`Error::Codec`] if reading, encoding or writing fails.
    /// - [`Error::Abandoned`] if the caller running `origin` was dropped before it finished.
    /// - [`Error::Shutdown`] if the cache was destroyed while waiting.
    ///
    /// Failures are not cached: the next call after a failure starts a new origin call.
    pub async fn get_or_fetch_with_ttl<F, Fut, E>(&self, key: &str, ttl: Duration, origin: F) -> Result<V>
    where
        F: FnOnce(OriginContext) -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();

        match self.read(key).await {
            Ok(Some(value)) => {
                self.record(CacheOperation::Fetch, CacheActivity::Hit, started);
                return Ok(value);
            }
            Ok(None) => self.record(CacheOperation::Fetch, CacheActivity::Miss, started),
            Err(e) => {
                self.record(CacheOperation::Fetch, CacheActivity::Error, started);
                return Err(e);
            }
        }

        match self.inner.pending.enter(key) {
            Role::Owner(owner) => {
                self.record(CacheOperation::Fetch, CacheActivity::Owner, started);

                let ctx = OriginContext::new(key, ttl);
                let outcome = match origin(ctx.clone()).await {
                    Ok(value) => self.populate(key, ctx.ttl(), &value).await,
                    Err(e) => Err(Error::origin(e)),
                };

                owner.settle(outcome.clone());
                self.record_outcome(&outcome, CacheActivity::Stored, started);
                outcome
            }
            Role::Waiter(waiter) => {
                self.record(CacheOperation::Fetch, CacheActivity::Coalesced, started);
                let outcome = waiter.wait().await;
                if outcome.is_err() {
                    self.record_outcome(&outcome, CacheActivity::Coalesced, started);
                }
                outcome
            }
        }
    }

    /// Writes `value` under `key` with the default time-to-live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if the value cannot be encoded and [`Error::Store`] if the
    /// write fails.
    pub async fn set(&self, key: &str, value: &V) -> Result<()> {
        self.set_with_ttl(key, value, self.inner.default_ttl).await
    }

    /// Writes `value` under `key` for `ttl`.
    ///
    /// The write does not interact with an origin call in flight for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if the value cannot be encoded and [`Error::Store`] if the
    /// write fails.
    pub async fn set_with_ttl(&self, key: &str, value: &V, ttl: Duration) -> Result<()> {
        let started = Instant::now();
        let result = match self.inner.codec.encode(value) {
            Ok(encoded) => self.inner.store.set_with_expiry(key, ttl, encoded).await,
            Err(e) => Err(e),
        };

        let activity = if result.is_ok() { CacheActivity::Stored } else { CacheActivity::Error };
        self.record(CacheOperation::Set, activity, started);
        result
    }

    /// Removes `key` from the store.
    ///
    /// An origin call already in flight for `key` is left alone and will write its result
    /// when it finishes, so a value can reappear right after a delete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store fails.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let started = Instant::now();
        let result = self.inner.store.delete(key).await;

        let activity = if result.is_ok() { CacheActivity::Deleted } else { CacheActivity::Error };
        self.record(CacheOperation::Delete, activity, started);
        result
    }

    /// Binds `key` and `origin` into a handle that fetches with the default time-to-live.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use flightcache::{Cache, OriginContext};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> flightcache::Result<()> {
    /// let cache = Cache::builder::<u64>(Duration::from_secs(60)).memory().build();
    /// let answer = cache.define("answer", |_ctx: OriginContext| async { Ok::<_, std::io::Error>(42) });
    ///
    /// assert_eq!(answer.fetch().await?, 42);
    /// # Ok(())
    /// # }
    /// ```
    pub fn define<F, Fut, E>(&self, key: impl Into<String>, origin: F) -> Defined<V, S, F>
    where
        F: Fn(OriginContext) -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.define_with_ttl(key, self.inner.default_ttl, origin)
    }

    /// Binds `key`, `ttl` and `origin` into a reusable fetch handle.
    pub fn define_with_ttl<F, Fut, E>(&self, key: impl Into<String>, ttl: Duration, origin: F) -> Defined<V, S, F>
    where
        F: Fn(OriginContext) -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Defined::new(self.clone(), key.into(), ttl, origin)
    }

    /// Shuts the store down and discards every in-flight registry entry.
    ///
    /// Callers still waiting on an origin call receive [`Error::Shutdown`]. Origin calls that
    /// are running keep going; their results are still handed to their own caller, but their
    /// writes will usually fail because the store is closed.
    ///
    /// # Errors
    ///
    /// Returns the store's shutdown error. The registry is cleared either way.
    pub async fn destroy(&self) -> Result<()> {
        let started = Instant::now();
        let result = self.inner.store.shutdown().await;
        let discarded = self.inner.pending.clear();
        if discarded > 0 {
            tracing::debug!(cache.name = %self.inner.name, discarded, "destroyed cache with origin calls in flight");
        }

        let activity = if result.is_ok() { CacheActivity::Destroyed } else { CacheActivity::Error };
        self.record(CacheOperation::Destroy, activity, started);
        result
    }

    async fn read(&self, key: &str) -> Result<Option<V>> {
        let stored = if self.inner.decode_raw {
            self.inner.store.get_raw(key).await?.map(Encoded::Bytes)
        } else {
            self.inner.store.get(key).await?.map(Encoded::Text)
        };

        stored.map(|data| self.inner.codec.decode(&data)).transpose()
    }

    async fn populate(&self, key: &str, ttl: Duration, value: &V) -> Result<V> {
        let encoded = self.inner.codec.encode(value)?;
        // Only values that read back cleanly are written.
        let readback = self.inner.codec.decode(&self.as_read(encoded.clone())?)?;
        self.inner.store.set_with_expiry(key, ttl, encoded).await?;
        Ok(readback)
    }

    fn record_outcome(&self, outcome: &Result<V>, success: CacheActivity, started: Instant) {
        let activity = match outcome {
            Ok(_) => success,
            Err(Error::Origin(_)) => CacheActivity::OriginError,
            Err(Error::Abandoned) => CacheActivity::Abandoned,
            Err(_) => CacheActivity::Error,
        };
        self.record(CacheOperation::Fetch, activity, started);
    }
}

#[cfg(test)]
mod tests {
    use flightcache_store::testing::{MockStore, StoreOp};
    use testing_aids::CallCounter;

    use super::*;
    use crate::TelemetryConfig;

    fn mock_cache(store: &MockStore) -> Cache<String, MockStore> {
        Cache::builder::<String>(Duration::from_secs(60))
            .store(store.clone())
            .telemetry(TelemetryConfig::new())
            .build()
    }

    #[tokio::test]
    async fn owner_writes_once_with_context_ttl() {
        let store = MockStore::new();
        let cache = mock_cache(&store);

        let value = cache
            .get_or_fetch("k", |ctx: OriginContext| async move {
                ctx.set_ttl(Duration::from_secs(5));
                Ok::<_, std::io::Error>("v".to_string())
            })
            .await
            .expect("origin succeeds");

        assert_eq!(value, "v");
        assert_eq!(store.set_count(), 1);
        assert!(store.operations().contains(&StoreOp::Set {
            key: "k".to_string(),
            ttl: Duration::from_secs(5),
            data: Encoded::Text("\"v\"".to_string()),
        }));
        assert_eq!(cache.pending_len(), 0);
    }

    #[tokio::test]
    async fn read_failure_skips_origin() {
        let store = MockStore::new();
        store.fail_when(|op| matches!(op, StoreOp::Get(_)));
        let cache = mock_cache(&store);

        let calls = CallCounter::new();
        let result = cache
            .get_or_fetch("k", |_ctx: OriginContext| {
                let calls = calls.clone();
                async move {
                    calls.increment();
                    Ok::<_, std::io::Error>("v".to_string())
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Store(_))));
        assert_eq!(calls.count(), 0);
    }

    #[tokio::test]
    async fn write_failure_settles_with_store_error() {
        let store = MockStore::new();
        store.fail_when(|op| matches!(op, StoreOp::Set { .. }));
        let cache = mock_cache(&store);

        let result = cache
            .get_or_fetch("k", |_ctx: OriginContext| async { Ok::<_, std::io::Error>("v".to_string()) })
            .await;

        assert!(matches!(result, Err(Error::Store(_))));
        assert_eq!(cache.pending_len(), 0);
    }

    #[tokio::test]
    async fn raw_mode_reads_bytes() {
        let store = MockStore::new();
        let cache = Cache::builder::<String>(Duration::from_secs(60))
            .store(store.clone())
            .decode_raw(true)
            .build();

        cache.set("k", &"v".to_string()).await.expect("write succeeds");
        assert_eq!(cache.get("k").await.expect("read succeeds"), Some("v".to_string()));
        assert!(store.operations().contains(&StoreOp::GetRaw("k".to_string())));
        assert!(!store.operations().contains(&StoreOp::Get("k".to_string())));
    }

    #[tokio::test]
    async fn destroy_shuts_down_and_clears() {
        let store = MockStore::new();
        let cache = mock_cache(&store);

        let held = cache.inner.pending.try_become_owner("k").expect("free key");
        assert_eq!(cache.pending_len(), 1);

        cache.destroy().await.expect("mock shutdown succeeds");
        assert_eq!(cache.pending_len(), 0);
        assert_eq!(store.operations().last(), Some(&StoreOp::Shutdown));
        held.settle(Ok("late".to_string()));
    }

    #[tokio::test]
    async fn destroy_clears_even_when_shutdown_fails() {
        let store = MockStore::new();
        store.fail_when(|op| matches!(op, StoreOp::Shutdown));
        let cache = mock_cache(&store);

        let _held = cache.inner.pending.try_become_owner("k").expect("free key");
        assert!(cache.destroy().await.is_err());
        assert_eq!(cache.pending_len(), 0);
    }

    #[test]
    fn clones_share_state() {
        let store = MockStore::new();
        let cache = mock_cache(&store);
        let clone = cache.clone();
        assert!(Arc::ptr_eq(&cache.inner, &clone.inner));
        assert!(format!("{cache:?}").contains("flightcache"));
    }
}
