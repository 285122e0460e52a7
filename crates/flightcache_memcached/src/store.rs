// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use flightcache_store::{Encoded, Error, Result, Store};
use tokio::{io::BufStream, net::TcpStream, sync::Mutex};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    MemcachedOptions,
    options::Credentials,
    protocol::{self, Failure, Reply, Request},
};

const AUTH_KEY: &str = "auth";

type Connection = BufStream<TcpStream>;

/// A [`Store`] backed by one or more memcached servers, spoken to over the text protocol.
///
/// Each key lives on one server, chosen by hashing the key. The store keeps one connection per
/// server, opened on first use and reopened after any failure that leaves it in an unknown
/// state. Requests to one server are serialized over its connection.
///
/// Keys must be at most 250 bytes and free of whitespace and control characters. Time-to-live
/// values are rounded up to whole seconds, and a zero time-to-live stores without expiry.
pub struct MemcachedStore {
    nodes: Vec<Node>,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
    closed: AtomicBool,
}

struct Node {
    addr: String,
    connection: Mutex<Option<Connection>>,
}

impl MemcachedStore {
    /// Creates a store that connects lazily on its first operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no server is listed or only one of user name and password
    /// is set.
    pub fn new(options: &MemcachedOptions) -> Result<Self> {
        let nodes = options
            .servers()?
            .into_iter()
            .map(|addr| Node {
                addr,
                connection: Mutex::new(None),
            })
            .collect();
        Ok(Self {
            nodes,
            credentials: options.credentials()?,
            timeout: options.timeout(),
            closed: AtomicBool::new(false),
        })
    }

    /// Creates a store and opens a connection to every server immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid options and [`Error::Store`] if a server cannot
    /// be reached or rejects the credentials.
    pub async fn connect(options: &MemcachedOptions) -> Result<Self> {
        let store = Self::new(options)?;
        for node in &store.nodes {
            let connection = store.bounded(store.open(&node.addr)).await.map_err(Error::store)?;
            *node.connection.lock().await = Some(connection);
        }
        Ok(store)
    }

    /// Returns the address of the server that holds `key`.
    #[must_use]
    pub fn server_for(&self, key: &str) -> &str {
        &self.node(key).addr
    }

    fn node(&self, key: &str) -> &Node {
        let count = self.nodes.len() as u64;
        #[expect(clippy::cast_possible_truncation, reason = "the remainder is below the node count")]
        let index = (xxh3_64(key.as_bytes()) % count) as usize;
        &self.nodes[index]
    }

    async fn open(&self, addr: &str) -> std::result::Result<Connection, Failure> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let mut connection = BufStream::new(stream);

        if let Some(credentials) = &self.credentials {
            let line = format!("{} {}", credentials.username, credentials.password);
            let auth = Request::Set {
                key: AUTH_KEY,
                exptime: 0,
                data: line.as_bytes(),
            };
            protocol::exchange(&mut connection, &auth).await?;
        }

        tracing::debug!(server = %addr, "connected to memcached");
        Ok(connection)
    }

    async fn bounded<T>(
        &self,
        work: impl Future<Output = std::result::Result<T, Failure>>,
    ) -> std::result::Result<T, Failure> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or(Err(Failure::Timeout(limit))),
            None => work.await,
        }
    }

    async fn call(&self, request: Request<'_>) -> Result<Reply> {
        let key = match &request {
            Request::Get { key } | Request::Set { key, .. } | Request::Delete { key } => *key,
        };
        protocol::validate_key(key).map_err(Error::store)?;

        let node = self.node(key);
        let mut slot = node.connection.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }

        let reused = slot.take();
        let request = &request;
        let attempt = async move {
            let mut connection = match reused {
                Some(connection) => connection,
                None => self.open(&node.addr).await?,
            };
            match protocol::exchange(&mut connection, request).await {
                Ok(reply) => Ok((connection, Ok(reply))),
                Err(failure) if !failure.breaks_connection() => Ok((connection, Err(failure))),
                Err(failure) => Err(failure),
            }
        };

        match self.bounded(attempt).await {
            Ok((connection, reply)) => {
                *slot = Some(connection);
                reply.map_err(Error::store)
            }
            Err(failure) => {
                tracing::debug!(server = %node.addr, error = %failure, "dropping memcached connection");
                Err(Error::store(failure))
            }
        }
    }
}

impl std::fmt::Debug for MemcachedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let servers: Vec<&str> = self.nodes.iter().map(|node| node.addr.as_str()).collect();
        f.debug_struct("MemcachedStore")
            .field("servers", &servers)
            .field("timeout", &self.timeout)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Store for MemcachedStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_raw(key)
            .await?
            .map(|data| Encoded::Bytes(data).into_text())
            .transpose()
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>> {
        match self.call(Request::Get { key }).await? {
            Reply::Value(data) => Ok(data),
            reply => Err(Error::store(format!("memcached answered get with {reply:?}"))),
        }
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, data: Encoded) -> Result<()> {
        let exptime = protocol::exptime(ttl, SystemTime::now());
        self.call(Request::Set {
            key,
            exptime,
            data: data.as_bytes(),
        })
        .await
        .map(drop)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.call(Request::Delete { key }).await.map(drop)
    }

    async fn shutdown(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(servers = self.nodes.len(), "memcached store shut down");
        }
        for node in &self.nodes {
            *node.connection.lock().await = None;
        }
        Ok(())
    }
}
