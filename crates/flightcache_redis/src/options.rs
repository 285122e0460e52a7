// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::Deserialize;

const DEFAULT_URL: &str = "redis://127.0.0.1:6379";

/// Connection settings for a [`RedisStore`](crate::RedisStore).
///
/// The URL follows the `redis` crate's connection URL format, for example
/// `redis://:password@host:6379/2` or `rediss://host` for TLS.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RedisOptions {
    /// Connection URL. Defaults to `redis://127.0.0.1:6379`.
    #[serde(default = "default_url")]
    pub url: String,
}

impl RedisOptions {
    /// Creates options for the server at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

// The URL may carry credentials.
impl std::fmt::Debug for RedisOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisOptions").finish_non_exhaustive()
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}
