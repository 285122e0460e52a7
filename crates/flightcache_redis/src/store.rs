// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bytes::Bytes;
use flightcache_store::{Encoded, Error, Result, Store, ttl::whole_seconds};
use parking_lot::Mutex;
use redis::{AsyncCommands, Client, aio::ConnectionManager};

use crate::RedisOptions;

/// A [`Store`] backed by a Redis server.
///
/// Cloning the underlying connection manager is cheap, so each command runs on its own
/// clone and no lock is held across a round trip. After [`shutdown`](Store::shutdown) the
/// store drops its connection and every operation returns [`Error::Shutdown`].
pub struct RedisStore {
    connection: Mutex<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Connects to the server described by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the URL is invalid or the initial connection fails.
    #[cfg_attr(test, mutants::skip)] // Requires a live server.
    pub async fn connect(options: &RedisOptions) -> Result<Self> {
        let client = Client::open(options.url.as_str()).map_err(Error::store)?;
        let connection = ConnectionManager::new(client).await.map_err(Error::store)?;
        tracing::debug!("connected to redis");
        Ok(Self::from_connection(connection))
    }

    /// Wraps an existing connection manager.
    #[must_use]
    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self {
            connection: Mutex::new(Some(connection)),
        }
    }

    fn connection(&self) -> Result<ConnectionManager> {
        self.connection.lock().clone().ok_or(Error::Shutdown)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("connected", &self.connection.lock().is_some())
            .finish()
    }
}

impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection()?;
        connection.get(key).await.map_err(Error::store)
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>> {
        let mut connection = self.connection()?;
        let data: Option<Vec<u8>> = connection.get(key).await.map_err(Error::store)?;
        Ok(data.map(Bytes::from))
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, data: Encoded) -> Result<()> {
        let mut connection = self.connection()?;
        let data = data.into_bytes().to_vec();
        let seconds = whole_seconds(ttl);
        if seconds == 0 {
            connection.set::<_, _, ()>(key, data).await.map_err(Error::store)
        } else {
            connection.set_ex::<_, _, ()>(key, data, seconds).await.map_err(Error::store)
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut connection = self.connection()?;
        connection.del::<_, ()>(key).await.map_err(Error::store)
    }

    async fn shutdown(&self) -> Result<()> {
        if self.connection.lock().take().is_some() {
            tracing::debug!("redis store shut down");
        }
        Ok(())
    }
}
