// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use flightcache_store::{Error, Result};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "127.0.0.1:11211";

/// Connection settings for a [`MemcachedStore`](crate::MemcachedStore).
///
/// # Examples
///
/// ```
/// use flightcache_memcached::MemcachedOptions;
///
/// let options: MemcachedOptions = serde_json::from_str(
///     r#"{ "server": "cache.internal:11211", "timeout_ms": 250 }"#,
/// )
/// .unwrap();
/// assert_eq!(options.server, "cache.internal:11211");
/// ```
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MemcachedOptions {
    /// Server addresses as `host:port`, separated by commas. Keys are spread across the
    /// servers by hash. Defaults to `127.0.0.1:11211`.
    #[serde(default = "default_server")]
    pub server: String,

    /// User name for servers that require authentication.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for servers that require authentication.
    #[serde(default)]
    pub password: Option<String>,

    /// Upper bound on connecting plus one request round trip, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl MemcachedOptions {
    /// Creates options for the server at `server`.
    #[must_use]
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            username: None,
            password: None,
            timeout_ms: None,
        }
    }

    /// Sets the credentials sent when a connection is opened.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub(crate) fn servers(&self) -> Result<Vec<String>> {
        let servers: Vec<String> = self
            .server
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect();
        if servers.is_empty() {
            return Err(Error::Config("no memcached server configured".to_string()));
        }
        Ok(servers)
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn credentials(&self) -> Result<Option<Credentials>> {
        match (&self.username, &self.password) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => Ok(Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            })),
            _ => Err(Error::Config(
                "memcached username and password must be set together".to_string(),
            )),
        }
    }
}

impl Default for MemcachedOptions {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER)
    }
}

impl std::fmt::Debug for MemcachedOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedOptions")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_server() {
        let options: MemcachedOptions = serde_json::from_str("{}").expect("valid options");
        assert_eq!(options, MemcachedOptions::default());
        assert_eq!(options.server, "127.0.0.1:11211");
        assert_eq!(options.timeout(), None);
    }

    #[test]
    fn credentials_must_come_in_pairs() {
        let mut options = MemcachedOptions::default();
        assert!(options.credentials().expect("no credentials").is_none());

        options.username = Some("user".to_string());
        assert!(matches!(options.credentials(), Err(Error::Config(_))));

        let options = options.with_credentials("user", "pass");
        let credentials = options.credentials().expect("valid").expect("present");
        assert_eq!(credentials.username, "user");
        assert_eq!(credentials.password, "pass");
    }

    #[test]
    fn server_lists_are_split_on_commas() {
        let options = MemcachedOptions::new("a:11211, b:11211,,c:11211 ");
        assert_eq!(options.servers().expect("valid list"), ["a:11211", "b:11211", "c:11211"]);

        let options = MemcachedOptions::new(" , ");
        assert!(matches!(options.servers(), Err(Error::Config(_))));
    }

    #[test]
    fn debug_hides_password() {
        let options = MemcachedOptions::default().with_credentials("user", "hunter2");
        let debug = format!("{options:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn timeout_round_trips_through_milliseconds() {
        let options = MemcachedOptions::default().with_timeout(Duration::from_millis(750));
        assert_eq!(options.timeout_ms, Some(750));
        assert_eq!(options.timeout(), Some(Duration::from_millis(750)));
    }
}
