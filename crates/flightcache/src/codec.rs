// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversion between cached values and stored payloads.

use std::fmt::Debug;

use bytes::Bytes;
use flightcache_store::{Encoded, Error, Result};
use serde::{Serialize, de::DeserializeOwned};

/// Converts values to stored payloads and back.
///
/// A codec must be deterministic, and `decode` must accept every payload `encode` produces
/// in both forms of [`Encoded`]: stores may hand back text as bytes and the other way round,
/// depending on the cache's `decode_raw` setting.
///
/// Every value a caller observes has been through `decode(encode(value))`, whether it was
/// read from the store or just produced by the origin.
pub trait Codec<V>: Send + Sync {
    /// Encodes `value` into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if the value cannot be represented.
    fn encode(&self, value: &V) -> Result<Encoded>;

    /// Decodes a payload produced by [`encode`](Codec::encode).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if the payload is malformed.
    fn decode(&self, data: &Encoded) -> Result<V>;
}

/// The default codec: JSON via `serde_json`.
///
/// # Examples
///
/// ```
/// use flightcache::{Codec, JsonCodec};
///
/// let encoded = JsonCodec.encode(&vec![1, 2, 3]).unwrap();
/// assert_eq!(encoded.as_bytes(), b"[1,2,3]");
///
/// let decoded: Vec<i32> = JsonCodec.decode(&encoded).unwrap();
/// assert_eq!(decoded, [1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<V> Codec<V> for JsonCodec
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Encoded> {
        serde_json::to_string(value).map(Encoded::Text).map_err(Error::codec)
    }

    fn decode(&self, data: &Encoded) -> Result<V> {
        serde_json::from_slice(data.as_bytes()).map_err(Error::codec)
    }
}

/// A pass-through codec for byte values, meant for caches built with `decode_raw(true)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec<Bytes> for BytesCodec {
    fn encode(&self, value: &Bytes) -> Result<Encoded> {
        Ok(Encoded::Bytes(value.clone()))
    }

    fn decode(&self, data: &Encoded) -> Result<Bytes> {
        Ok(data.clone().into_bytes())
    }
}

/// A codec assembled from an encode closure and a decode closure.
///
/// # Examples
///
/// ```
/// use flightcache::{Codec, Encoded, Error, FnCodec};
///
/// let codec = FnCodec::new(
///     |value: &u64| Ok(Encoded::from(value.to_string())),
///     |data: &Encoded| {
///         std::str::from_utf8(data.as_bytes())
///             .map_err(Error::codec)?
///             .parse::<u64>()
///             .map_err(Error::codec)
///     },
/// );
///
/// let encoded = codec.encode(&42).unwrap();
/// assert_eq!(codec.decode(&encoded).unwrap(), 42);
/// ```
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCodec<E, D> {
    /// Creates a codec from a pair of closures.
    pub fn new<V>(encode: E, decode: D) -> Self
    where
        E: Fn(&V) -> Result<Encoded> + Send + Sync,
        D: Fn(&Encoded) -> Result<V> + Send + Sync,
    {
        Self { encode, decode }
    }
}

impl<V, E, D> Codec<V> for FnCodec<E, D>
where
    E: Fn(&V) -> Result<Encoded> + Send + Sync,
    D: Fn(&Encoded) -> Result<V> + Send + Sync,
{
    fn encode(&self, value: &V) -> Result<Encoded> {
        (self.encode)(value)
    }

    fn decode(&self, data: &Encoded) -> Result<V> {
        (self.decode)(data)
    }
}

impl<E, D> Debug for FnCodec<E, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCodec").finish_non_exhaustive()
    }
}
