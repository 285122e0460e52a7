// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types shared by stores, codecs and the cache facade.

use std::sync::Arc;

/// A shareable error cause.
///
/// Causes are reference counted so a single failure can be handed to every caller that
/// was waiting on the same key without losing its identity.
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// An error from a cache or store operation.
///
/// `Error` is cheap to clone. Cloning shares the underlying cause, so all callers coalesced
/// behind one origin call observe the very same cause object.
///
/// # Example
///
/// ```
/// use flightcache_store::Error;
///
/// let error = Error::from_message("connection reset");
/// assert!(error.to_string().contains("connection reset"));
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The backing store failed to complete an operation.
    #[error("store operation failed: {0}")]
    Store(#[source] SharedSource),

    /// A value could not be encoded or a payload could not be decoded.
    #[error("codec failed: {0}")]
    Codec(#[source] SharedSource),

    /// The origin function failed.
    #[error("origin failed: {0}")]
    Origin(#[source] SharedSource),

    /// The origin call owning this key was dropped before it settled.
    #[error("the origin call owning this key was dropped before it settled")]
    Abandoned,

    /// The store or the cache has been shut down.
    #[error("the cache has been shut down")]
    Shutdown,

    /// The cache or a backend was configured with invalid options.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Creates a store error from any error or message.
    ///
    /// This is the usual way for backends to surface connectivity and protocol failures.
    ///
    /// # Examples
    ///
    /// ```
    /// use flightcache_store::Error;
    ///
    /// let error = Error::from_message("operation failed");
    /// assert!(matches!(error, Error::Store(_)));
    /// ```
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::store(cause)
    }

    /// Creates a store error wrapping `cause`.
    pub fn store(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Store(share(cause))
    }

    /// Creates a codec error wrapping `cause`.
    pub fn codec(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Codec(share(cause))
    }

    /// Creates an origin error wrapping `cause`.
    pub fn origin(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Origin(share(cause))
    }

    /// Returns the shared cause of an origin failure.
    ///
    /// Every caller coalesced behind the same failed origin call gets a clone of the same
    /// `Arc`, so `Arc::ptr_eq` can be used to confirm two failures are one.
    #[must_use]
    pub fn origin_source(&self) -> Option<&SharedSource> {
        match self {
            Self::Origin(source) => Some(source),
            _ => None,
        }
    }

    /// Returns `true` if the origin function produced this error.
    #[must_use]
    pub fn is_origin(&self) -> bool {
        matches!(self, Self::Origin(_))
    }
}

fn share(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> SharedSource {
    Arc::from(cause.into())
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
