// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deserializable cache configuration.

use std::time::Duration;

use bytes::Bytes;
use flightcache_memory::{MemoryOptions, MemoryStore, MemoryStoreBuilder};
#[cfg(feature = "memcached")]
use flightcache_memcached::{MemcachedOptions, MemcachedStore};
#[cfg(feature = "redis")]
use flightcache_redis::{RedisOptions, RedisStore};
use flightcache_store::{Encoded, Error, Result, Store};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Cache, Codec, JsonCodec, TelemetryConfig};

/// Configuration for a cache, typically loaded from a configuration file.
///
/// The backend is chosen by its key, so exactly one backend can be configured.
///
/// # Examples
///
/// ```
/// use flightcache::CacheOptions;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> flightcache::Result<()> {
/// let options: CacheOptions = serde_json::from_str(
///     r#"{
///         "ttl_secs": 300,
///         "name": "profiles",
///         "backend": { "memory": { "sweep_interval_ms": 250 } }
///     }"#,
/// )
/// .unwrap();
///
/// let cache = options.open::<String>().await?;
/// assert_eq!(cache.name(), "profiles");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct CacheOptions {
    /// Default time-to-live in seconds. Must be greater than zero.
    pub ttl_secs: u64,

    /// The storage backend. Defaults to memory.
    #[serde(default)]
    pub backend: BackendOptions,

    /// Reads payloads as raw bytes instead of text.
    #[serde(default)]
    pub decode_raw: bool,

    /// The name reported in telemetry.
    #[serde(default)]
    pub name: Option<String>,
}

/// Backend selection and its settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum BackendOptions {
    /// In-process memory.
    Memory(MemoryOptions),
    /// A Redis server.
    #[cfg(feature = "redis")]
    #[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
    Redis(RedisOptions),
    /// One or more memcached servers.
    #[cfg(feature = "memcached")]
    #[cfg_attr(docsrs, doc(cfg(feature = "memcached")))]
    Memcached(MemcachedOptions),
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self::Memory(MemoryOptions::default())
    }
}

impl CacheOptions {
    /// Creates options for a memory-backed cache with the given default time-to-live.
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            backend: BackendOptions::default(),
            decode_raw: false,
            name: None,
        }
    }

    /// Replaces the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendOptions) -> Self {
        self.backend = backend;
        self
    }

    /// Returns the default time-to-live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `ttl_secs` is zero.
    pub fn default_ttl(&self) -> Result<Duration> {
        if self.ttl_secs == 0 {
            return Err(Error::Config("ttl_secs must be greater than zero".to_string()));
        }
        Ok(Duration::from_secs(self.ttl_secs))
    }

    /// Connects the configured backend and builds a JSON cache of `V` values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid options and [`Error::Store`] if the backend
    /// cannot be reached.
    pub async fn open<V>(&self) -> Result<Cache<V, Backend>>
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        self.open_with_codec(JsonCodec).await
    }

    /// Connects the configured backend and builds a cache that encodes values with `codec`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid options and [`Error::Store`] if the backend
    /// cannot be reached.
    pub async fn open_with_codec<V>(&self, codec: impl Codec<V> + 'static) -> Result<Cache<V, Backend>> {
        let default_ttl = self.default_ttl()?;
        let backend = Backend::connect(&self.backend).await?;

        let mut builder = Cache::builder_with_codec(default_ttl, codec)
            .store(backend)
            .decode_raw(self.decode_raw)
            .telemetry(TelemetryConfig::new().with_logs());
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        Ok(builder.build())
    }
}

/// A store chosen at configuration time.
#[derive(Debug)]
#[non_exhaustive]
pub enum Backend {
    /// In-process memory.
    Memory(MemoryStore),
    /// A Redis server.
    #[cfg(feature = "redis")]
    #[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
    Redis(RedisStore),
    /// One or more memcached servers.
    #[cfg(feature = "memcached")]
    #[cfg_attr(docsrs, doc(cfg(feature = "memcached")))]
    Memcached(MemcachedStore),
}

impl Backend {
    /// Creates and connects the backend described by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid options and [`Error::Store`] if the backend
    /// cannot be reached.
    #[cfg_attr(
        not(any(feature = "redis", feature = "memcached")),
        allow(clippy::unused_async, reason = "network backends connect asynchronously")
    )]
    pub async fn connect(options: &BackendOptions) -> Result<Self> {
        match options {
            BackendOptions::Memory(memory) => Ok(Self::Memory(MemoryStoreBuilder::from(memory).build())),
            #[cfg(feature = "redis")]
            BackendOptions::Redis(redis) => RedisStore::connect(redis).await.map(Self::Redis),
            #[cfg(feature = "memcached")]
            BackendOptions::Memcached(memcached) => MemcachedStore::connect(memcached).await.map(Self::Memcached),
        }
    }

    /// Returns the backend's kind, as it appears in configuration.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            #[cfg(feature = "redis")]
            Self::Redis(_) => "redis",
            #[cfg(feature = "memcached")]
            Self::Memcached(_) => "memcached",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Backend::Memory($store) => $call,
            #[cfg(feature = "redis")]
            Backend::Redis($store) => $call,
            #[cfg(feature = "memcached")]
            Backend::Memcached($store) => $call,
        }
    };
}

impl Store for Backend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        dispatch!(self, store => store.get(key).await)
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>> {
        dispatch!(self, store => store.get_raw(key).await)
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, data: Encoded) -> Result<()> {
        dispatch!(self, store => store.set_with_expiry(key, ttl, data).await)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        dispatch!(self, store => store.delete(key).await)
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::debug!(backend = self.kind(), "shutting down cache backend");
        dispatch!(self, store => store.shutdown().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_options_default_to_memory() {
        let options: CacheOptions = serde_json::from_str(r#"{ "ttl_secs": 30 }"#).expect("valid options");
        assert_eq!(options, CacheOptions::new(30));
        assert_eq!(options.backend, BackendOptions::Memory(MemoryOptions::default()));
        assert_eq!(options.default_ttl().expect("non-zero"), Duration::from_secs(30));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        assert!(matches!(CacheOptions::new(0).default_ttl(), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let result = serde_json::from_str::<CacheOptions>(r#"{ "ttl_secs": 1, "backend": { "etcd": {} } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<CacheOptions>(r#"{ "ttl_secs": 1, "tll": 2 }"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn open_fails_on_zero_ttl() {
        let result = CacheOptions::new(0).open::<String>().await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn open_builds_memory_cache() {
        let mut options = CacheOptions::new(5);
        options.decode_raw = true;
        options.name = Some("configured".to_string());

        let cache = options.open::<u32>().await.expect("memory backend always opens");
        assert_eq!(cache.name(), "configured");
        assert!(cache.decode_raw());
        assert_eq!(cache.store().kind(), "memory");

        cache.set("k", &9).await.expect("write succeeds");
        assert_eq!(cache.get("k").await.expect("read succeeds"), Some(9));

        cache.destroy().await.expect("shutdown succeeds");
        assert!(matches!(cache.get("k").await, Err(Error::Shutdown)));
    }

    #[cfg(feature = "memcached")]
    #[test]
    fn memcached_backend_parses() {
        let options: CacheOptions =
            serde_json::from_str(r#"{ "ttl_secs": 1, "backend": { "memcached": { "server": "cache:11211" } } }"#)
                .expect("valid options");
        assert_eq!(
            options.backend,
            BackendOptions::Memcached(MemcachedOptions::new("cache:11211"))
        );
    }

    #[cfg(feature = "redis")]
    #[test]
    fn redis_backend_parses() {
        let options: CacheOptions =
            serde_json::from_str(r#"{ "ttl_secs": 1, "backend": { "redis": { "url": "redis://cache:6379" } } }"#)
                .expect("valid options");
        assert_eq!(options.backend, BackendOptions::Redis(RedisOptions::new("redis://cache:6379")));
    }
}
