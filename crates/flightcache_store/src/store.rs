// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache storage backends.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;

use crate::{Encoded, Error};

/// Trait for cache storage backends.
///
/// A store maps string keys to encoded payloads. Implementations must be safe to use
/// concurrently for independent keys; the cache facade issues at most one
/// [`set_with_expiry`](Store::set_with_expiry) per coalesced origin call and otherwise
/// relies on the store for consistency.
///
/// Absence is not an error: a missing or expired key is reported as `Ok(None)`.
pub trait Store: Send + Sync {
    /// Returns the payload stored under `key` as text, or `None` if it is missing or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    /// Returns the payload stored under `key` as raw bytes, or `None` if it is missing or
    /// expired.
    ///
    /// Used when the codec operates on bytes, avoiding a round trip through text.
    fn get_raw(&self, key: &str) -> impl Future<Output = Result<Option<Bytes>, Error>> + Send;

    /// Stores `data` under `key` so that it reads as absent once `ttl` has elapsed.
    ///
    /// What a zero `ttl` means is up to each backend and must be documented there.
    fn set_with_expiry(&self, key: &str, ttl: Duration, data: Encoded) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes `key` immediately. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Releases backend resources such as connections and timers.
    ///
    /// Operations issued after shutdown are not required to succeed.
    fn shutdown(&self) -> impl Future<Output = Result<(), Error>> + Send;
}

impl<S> Store for Arc<S>
where
    S: Store,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send {
        (**self).get(key)
    }

    fn get_raw(&self, key: &str) -> impl Future<Output = Result<Option<Bytes>, Error>> + Send {
        (**self).get_raw(key)
    }

    fn set_with_expiry(&self, key: &str, ttl: Duration, data: Encoded) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).set_with_expiry(key, ttl, data)
    }

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).delete(key)
    }

    fn shutdown(&self) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).shutdown()
    }
}
