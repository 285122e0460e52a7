// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Storage backend abstraction for `flightcache`.
//!
//! This crate defines the [`Store`] trait that every backend implements, the [`Encoded`]
//! payload that travels between the codec and the backend, and the shared [`Error`] type.
//!
//! # Overview
//!
//! A store is deliberately dumb: it maps string keys to encoded payloads that expire after
//! a time-to-live. It never sees application values; `flightcache` encodes values before
//! they reach the store and decodes them after they come back. Single-flight coalescing,
//! codecs and telemetry all live above this layer.
//!
//! # Implementing a Store
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use flightcache_store::{Encoded, Error, Store};
//!
//! struct ForeverStore(RwLock<HashMap<String, Bytes>>);
//!
//! impl Store for ForeverStore {
//!     async fn get(&self, key: &str) -> Result<Option<String>, Error> {
//!         match self.get_raw(key).await? {
//!             Some(bytes) => Encoded::Bytes(bytes).into_text().map(Some),
//!             None => Ok(None),
//!         }
//!     }
//!
//!     async fn get_raw(&self, key: &str) -> Result<Option<Bytes>, Error> {
//!         Ok(self.0.read().unwrap().get(key).cloned())
//!     }
//!
//!     async fn set_with_expiry(&self, key: &str, _ttl: Duration, data: Encoded) -> Result<(), Error> {
//!         self.0.write().unwrap().insert(key.to_string(), data.into_bytes());
//!         Ok(())
//!     }
//!
//!     async fn delete(&self, key: &str) -> Result<(), Error> {
//!         self.0.write().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     async fn shutdown(&self) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//! ```

mod encoded;
pub mod error;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub mod ttl;

#[doc(inline)]
pub use encoded::Encoded;
#[doc(inline)]
pub use error::{Error, Result, SharedSource};
#[doc(inline)]
pub use store::Store;
