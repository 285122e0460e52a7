// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory stores.

use std::time::Duration;

use crate::{MemoryOptions, MemoryStore};

/// How often expired entries are swept when no interval is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Builder for configuring a [`MemoryStore`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use flightcache_memory::MemoryStore;
///
/// let store = MemoryStore::builder()
///     .sweep_interval(Duration::from_secs(1))
///     .initial_capacity(1024)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStoreBuilder {
    pub(crate) sweep_interval: Duration,
    pub(crate) initial_capacity: Option<usize>,
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreBuilder {
    /// Creates a builder that sweeps every [`DEFAULT_SWEEP_INTERVAL`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            initial_capacity: None,
        }
    }

    /// Sets how often expired entries are purged in the background.
    ///
    /// A zero interval disables the background sweep; expired entries are then only
    /// removed when they are read.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets a pre-allocation hint for the number of entries.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Builds the store and, inside a tokio runtime, starts its sweep task.
    #[must_use]
    pub fn build(self) -> MemoryStore {
        MemoryStore::from_builder(&self)
    }
}

impl From<&MemoryOptions> for MemoryStoreBuilder {
    fn from(options: &MemoryOptions) -> Self {
        Self::new().sweep_interval(Duration::from_millis(options.sweep_interval_ms))
    }
}
