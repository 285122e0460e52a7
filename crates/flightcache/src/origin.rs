// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

/// Context handed to an origin function when the cache misses.
///
/// The context carries the key being populated and the time-to-live the value will be stored
/// with. An origin may change that time-to-live with [`set_ttl`](Self::set_ttl), for example
/// to cache negative results for a shorter time; the value in effect when the origin returns
/// is the one used to store the result.
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
/// let cache = Cache::builder::<Option<String>>(Duration::from_secs(300)).memory().build();
///
/// let user = cache
///     .get_or_fetch("user:404", |ctx: OriginContext| async move {
///         // Remember misses for a short while only.
///         ctx.set_ttl(Duration::from_secs(5));
///         Ok::<_, std::io::Error>(None)
///     })
///     .await?;
/// assert_eq!(user, None);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct OriginContext {
    key: Arc<str>,
    ttl: Arc<Mutex<Duration>>,
}

impl OriginContext {
    pub(crate) fn new(key: &str, ttl: Duration) -> Self {
        Self {
            key: Arc::from(key),
            ttl: Arc::new(Mutex::new(ttl)),
        }
    }

    /// Returns the key being populated.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the time-to-live the result will be stored with.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        *self.ttl.lock()
    }

    /// Overrides the time-to-live the result will be stored with.
    ///
    /// Clones of the context share the setting.
    pub fn set_ttl(&self, ttl: Duration) {
        *self.ttl.lock() = ttl;
    }
}
