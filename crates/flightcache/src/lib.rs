// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A read-through cache that protects origins from stampedes.
//!
//! This crate provides a cache-aside layer over pluggable stores with:
//! - Single-flight coalescing: concurrent misses on one key share a single origin call
//! - Failure coalescing without poisoning: a failed origin call is reported to every waiter and
//!   never cached
//! - Per-call time-to-live, which the origin itself may override
//! - Memory, Redis and memcached backends behind one [`Store`] trait
//! - Pluggable codecs, with JSON as the default
//! - `tracing` logs and optional OpenTelemetry metrics
//!
//! # Examples
//!
//! ## Read-Through Caching
//!
//! ```
//! use std::time::Duration;
//!
//! use flightcache::{Cache, OriginContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> flightcache::Result<()> {
//! let cache = Cache::builder::<u64>(Duration::from_secs(60)).memory().build();
//!
//! let visits = cache
//!     .get_or_fetch("visits:home", |_ctx: OriginContext| async {
//!         // Query the database here.
//!         Ok::<_, std::io::Error>(1_024)
//!     })
//!     .await?;
//! assert_eq!(visits, 1_024);
//! assert_eq!(cache.get("visits:home").await?, Some(1_024));
//! # Ok(())
//! # }
//! ```
//!
//! ## Stampede Protection
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! use flightcache::{Cache, OriginContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = Cache::builder::<String>(Duration::from_secs(60)).memory().build();
//! let calls = AtomicUsize::new(0);
//! let calls = &calls;
//!
//! let fetches = (0..10).map(|_| {
//!     cache.get_or_fetch("report", move |_ctx: OriginContext| async move {
//!         calls.fetch_add(1, Ordering::SeqCst);
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         Ok::<_, std::io::Error>("expensive".to_string())
//!     })
//! });
//! let results = futures_util::future::join_all(fetches).await;
//!
//! assert!(results.iter().all(|r| r.as_deref().ok() == Some("expensive")));
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! # }
//! ```
//!
//! ## Configuration Files
//!
//! [`CacheOptions`] deserializes from any serde format and opens the configured backend:
//!
//! ```
//! use flightcache::CacheOptions;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> flightcache::Result<()> {
//! let options: CacheOptions = serde_json::from_str(r#"{ "ttl_secs": 60 }"#).unwrap();
//! let cache = options.open::<String>().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! Coalescing happens per cache instance, inside one process. Two processes sharing a Redis
//! or memcached server can still run the origin once each.
//!
//! [`Cache::delete`] does not cancel an origin call that is already running for the key; that
//! call will write its result when it finishes.

mod builder;
mod cache;
mod codec;
mod define;
mod options;
mod origin;
mod telemetry;

#[doc(inline)]
pub use builder::CacheBuilder;
#[doc(inline)]
pub use cache::Cache;
#[doc(inline)]
pub use codec::{BytesCodec, Codec, FnCodec, JsonCodec};
#[doc(inline)]
pub use define::Defined;
#[doc(inline)]
pub use flightcache_memory::{MemoryOptions, MemoryStore, MemoryStoreBuilder};
#[cfg(feature = "memcached")]
#[cfg_attr(docsrs, doc(cfg(feature = "memcached")))]
#[doc(inline)]
pub use flightcache_memcached::{MemcachedOptions, MemcachedStore};
#[cfg(feature = "redis")]
#[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
#[doc(inline)]
pub use flightcache_redis::{RedisOptions, RedisStore};
#[doc(inline)]
pub use flightcache_store::{Encoded, Error, Result, SharedSource, Store};
#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
#[doc(inline)]
pub use flightcache_store::testing::{MockStore, StoreOp};
#[doc(inline)]
pub use options::{Backend, BackendOptions, CacheOptions};
#[doc(inline)]
pub use origin::OriginContext;
#[doc(inline)]
pub use telemetry::TelemetryConfig;
