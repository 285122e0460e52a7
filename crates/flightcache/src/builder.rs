// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`Cache`].

use std::{fmt::Debug, time::Duration};

use flightcache_memory::{MemoryStore, MemoryStoreBuilder};
use flightcache_store::Store;

use crate::{Cache, Codec, TelemetryConfig};

const DEFAULT_NAME: &str = "flightcache";

/// Builder for constructing a [`Cache`].
///
/// Created by [`Cache::builder`] or [`Cache::builder_with_codec`]. A store must be chosen
/// before the cache can be built.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use flightcache::{Cache, MemoryStoreBuilder, TelemetryConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = Cache::builder::<String>(Duration::from_secs(60))
///     .memory_with(MemoryStoreBuilder::new().sweep_interval(Duration::from_secs(1)))
///     .name("sessions")
///     .telemetry(TelemetryConfig::new().with_logs())
///     .build();
/// # }
/// ```
pub struct CacheBuilder<V, S = ()> {
    default_ttl: Duration,
    store: S,
    codec: Box<dyn Codec<V>>,
    decode_raw: bool,
    name: Option<String>,
    telemetry: TelemetryConfig,
}

impl<V> CacheBuilder<V, ()> {
    pub(crate) fn new(default_ttl: Duration, codec: Box<dyn Codec<V>>) -> Self {
        Self {
            default_ttl,
            store: (),
            codec,
            decode_raw: false,
            name: None,
            telemetry: TelemetryConfig::new().with_logs(),
        }
    }

    /// Sets a custom storage backend.
    ///
    /// # Examples
    ///
    /// ```
    /// # #[cfg(feature = "test-util")]
    /// # fn main() {
    /// use std::time::Duration;
    ///
    /// use flightcache::{Cache, MockStore};
    ///
    /// let store = MockStore::new();
    /// let cache = Cache::builder::<u32>(Duration::from_secs(5)).store(store).build();
    /// # }
    /// # #[cfg(not(feature = "test-util"))]
    /// # fn main() {}
    /// ```
    pub fn store<S>(self, store: S) -> CacheBuilder<V, S>
    where
        S: Store,
    {
        CacheBuilder {
            default_ttl: self.default_ttl,
            store,
            codec: self.codec,
            decode_raw: self.decode_raw,
            name: self.name,
            telemetry: self.telemetry,
        }
    }

    /// Stores entries in process memory with the default sweep interval.
    ///
    /// Expired entries are swept in the background when a tokio runtime is running.
    pub fn memory(self) -> CacheBuilder<V, MemoryStore> {
        self.store(MemoryStore::new())
    }

    /// Stores entries in process memory configured by `builder`.
    pub fn memory_with(self, builder: MemoryStoreBuilder) -> CacheBuilder<V, MemoryStore> {
        self.store(builder.build())
    }
}

impl<V, S> CacheBuilder<V, S> {
    /// Replaces the codec used to encode and decode values.
    #[must_use]
    pub fn codec(mut self, codec: impl Codec<V> + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Reads payloads as raw bytes instead of text.
    ///
    /// Enable this when the codec produces binary payloads.
    #[must_use]
    pub fn decode_raw(mut self, decode_raw: bool) -> Self {
        self.decode_raw = decode_raw;
        self
    }

    /// Sets the name the cache reports in telemetry. Defaults to `flightcache`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the telemetry configuration. Logging is enabled by default.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }
}

impl<V, S: Store> CacheBuilder<V, S> {
    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> Cache<V, S> {
        Cache::from_parts(
            self.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            self.store,
            self.codec,
            self.default_ttl,
            self.decode_raw,
            self.telemetry.build(),
        )
    }
}

impl<V, S: Debug> Debug for CacheBuilder<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("default_ttl", &self.default_ttl)
            .field("store", &self.store)
            .field("decode_raw", &self.decode_raw)
            .field("name", &self.name)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}
