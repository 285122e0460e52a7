// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bytes::Bytes;

use crate::{Error, Result};

/// An encoded cache payload.
///
/// Codecs produce either text or raw bytes, and stores hand back one or the other depending
/// on whether the cache reads in text or raw mode. Stores are free to persist both forms as
/// bytes.
///
/// # Examples
///
/// ```
/// use flightcache_store::Encoded;
///
/// let text = Encoded::from("{\"id\":1}");
/// assert_eq!(text.as_bytes(), b"{\"id\":1}");
///
/// let raw = Encoded::from(vec![0_u8, 159, 146, 150]);
/// assert!(raw.into_text().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Encoded {
    /// A UTF-8 payload.
    Text(String),
    /// A binary payload.
    Bytes(Bytes),
}

impl Encoded {
    /// Returns the payload as a byte slice, regardless of its form.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Converts the payload into bytes without copying.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Converts the payload into text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if a binary payload is not valid UTF-8.
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Bytes(bytes) => String::from_utf8(bytes.to_vec()).map_err(Error::codec),
        }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Encoded {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Encoded {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Encoded {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Encoded {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}
