// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process store for `flightcache`.
//!
//! [`MemoryStore`] keeps encoded payloads in a concurrent map. Entries past their
//! time-to-live read as absent immediately, and a background task sweeps them out of the map
//! at a configurable interval so memory held by expired entries is reclaimed even if they are
//! never read again.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use flightcache_memory::MemoryStore;
//! use flightcache_store::Store;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::builder()
//!     .sweep_interval(Duration::from_millis(250))
//!     .build();
//!
//! store.set_with_expiry("key", Duration::from_secs(60), "42".into()).await.unwrap();
//! assert_eq!(store.get("key").await.unwrap().as_deref(), Some("42"));
//! # }
//! ```
//!
//! # Expiry
//!
//! - A zero time-to-live stores the entry without expiry.
//! - The sweep task is only started when the store is built inside a tokio runtime.
//!   Outside a runtime, expired entries are still reported as absent and are removed when
//!   they are next read.

pub mod builder;
mod options;
pub mod store;

#[doc(inline)]
pub use builder::MemoryStoreBuilder;
#[doc(inline)]
pub use options::MemoryOptions;
#[doc(inline)]
pub use store::MemoryStore;
