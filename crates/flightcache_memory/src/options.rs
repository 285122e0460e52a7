// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::Deserialize;

/// Deserializable configuration for a [`MemoryStore`](crate::MemoryStore).
///
/// # Examples
///
/// ```
/// use flightcache_memory::MemoryOptions;
///
/// let options: MemoryOptions = serde_json::from_str(r#"{ "sweep_interval_ms": 250 }"#).unwrap();
/// assert_eq!(options.sweep_interval_ms, 250);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MemoryOptions {
    /// How often expired entries are purged, in milliseconds. Zero disables the sweep.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

fn default_sweep_interval_ms() -> u64 {
    500
}
