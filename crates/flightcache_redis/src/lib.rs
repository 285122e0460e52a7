// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis store for `flightcache`.
//!
//! [`RedisStore`] keeps payloads in a Redis server and delegates expiry to it. Connections
//! are handled by a [`redis::aio::ConnectionManager`], which multiplexes concurrent commands
//! over one connection and reconnects after failures.
//!
//! # Expiry
//!
//! Redis expiry has whole-second resolution, so a time-to-live is rounded up to the next
//! whole second. A zero time-to-live stores the value without expiry.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use flightcache_redis::{RedisOptions, RedisStore};
//! use flightcache_store::Store;
//!
//! # async fn example() -> flightcache_store::Result<()> {
//! let store = RedisStore::connect(&RedisOptions::new("redis://127.0.0.1:6379")).await?;
//! store.set_with_expiry("greeting", Duration::from_secs(30), "hello".into()).await?;
//! assert_eq!(store.get("greeting").await?.as_deref(), Some("hello"));
//! store.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod options;
mod store;

#[doc(inline)]
pub use options::RedisOptions;
#[doc(inline)]
pub use store::RedisStore;
