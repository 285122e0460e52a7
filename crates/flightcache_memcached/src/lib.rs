// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Memcached store for `flightcache`.
//!
//! [`MemcachedStore`] talks to memcached over the text protocol using `get`, `set` and
//! `delete`, and optionally authenticates with a user name and password when a connection is
//! opened. A comma-separated server list spreads keys across a cluster: each key is sent to
//! the server picked by its xxh3 hash modulo the number of servers.
//!
//! # Expiry
//!
//! Memcached reads an expiry of more than thirty days as an absolute unix time. Longer
//! time-to-live values are converted to absolute times before they are sent, so any
//! duration behaves as a relative one.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use flightcache_memcached::{MemcachedOptions, MemcachedStore};
//! use flightcache_store::Store;
//!
//! # async fn example() -> flightcache_store::Result<()> {
//! let options = MemcachedOptions::new("127.0.0.1:11211").with_timeout(Duration::from_millis(500));
//! let store = MemcachedStore::connect(&options).await?;
//!
//! store.set_with_expiry("greeting", Duration::from_secs(30), "hello".into()).await?;
//! assert_eq!(store.get("greeting").await?.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

mod options;
mod protocol;
mod store;

#[doc(inline)]
pub use options::MemcachedOptions;
#[doc(inline)]
pub use store::MemcachedStore;
