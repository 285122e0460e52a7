// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The subset of the memcached text protocol the store speaks.

use std::{
    io,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use flightcache_store::ttl::whole_seconds;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub(crate) const MAX_KEY_LEN: usize = 250;

/// Memcached refuses items larger than this, so a longer data block means a corrupt reply.
const MAX_VALUE_LEN: usize = 1024 * 1024 * 1024;

/// Relative expiry times above this many seconds are read by the server as unix timestamps.
const RELATIVE_EXPIRY_LIMIT: u64 = 60 * 60 * 24 * 30;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Failure {
    #[error("memcached connection failed: {0}")]
    Io(#[from] io::Error),

    #[error("memcached did not answer within {0:?}")]
    Timeout(Duration),

    #[error("unexpected memcached reply: {0:?}")]
    Protocol(String),

    #[error("memcached rejected the request: {0}")]
    Rejected(String),

    #[error("invalid memcached key: {0}")]
    InvalidKey(&'static str),
}

impl Failure {
    /// Whether the connection is in an unknown state after this failure.
    pub(crate) fn breaks_connection(&self) -> bool {
        !matches!(self, Self::Rejected(_) | Self::InvalidKey(_))
    }
}

#[derive(Debug)]
pub(crate) enum Request<'a> {
    Get { key: &'a str },
    Set { key: &'a str, exptime: u64, data: &'a [u8] },
    Delete { key: &'a str },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Reply {
    Value(Option<Bytes>),
    Stored,
    Deleted,
}

impl Request<'_> {
    fn encode(&self) -> Vec<u8> {
        match self {
            Self::Get { key } => format!("get {key}\r\n").into_bytes(),
            Self::Delete { key } => format!("delete {key}\r\n").into_bytes(),
            Self::Set { key, exptime, data } => {
                let mut buf = format!("set {key} 0 {exptime} {}\r\n", data.len()).into_bytes();
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
                buf
            }
        }
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), Failure> {
    if key.is_empty() {
        return Err(Failure::InvalidKey("key is empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(Failure::InvalidKey("key is longer than 250 bytes"));
    }
    if key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(Failure::InvalidKey("key contains whitespace or control characters"));
    }
    Ok(())
}

/// Translates a time-to-live into the `exptime` field of a storage command.
pub(crate) fn exptime(ttl: Duration, now: SystemTime) -> u64 {
    let seconds = whole_seconds(ttl);
    if seconds <= RELATIVE_EXPIRY_LIMIT {
        return seconds;
    }
    now.duration_since(UNIX_EPOCH)
        .map_or(seconds, |since_epoch| since_epoch.as_secs().saturating_add(seconds))
}

/// Writes `request` and reads its reply.
pub(crate) async fn exchange<S>(stream: &mut S, request: &Request<'_>) -> Result<Reply, Failure>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    stream.write_all(&request.encode()).await?;
    stream.flush().await?;

    let line = read_line(stream).await?;
    match request {
        Request::Get { .. } => read_value(stream, line).await.map(Reply::Value),
        Request::Set { .. } if line == "STORED" => Ok(Reply::Stored),
        Request::Delete { .. } if line == "DELETED" || line == "NOT_FOUND" => Ok(Reply::Deleted),
        Request::Set { .. } | Request::Delete { .. } => Err(unexpected(line)),
    }
}

async fn read_value<S>(stream: &mut S, header: String) -> Result<Option<Bytes>, Failure>
where
    S: AsyncBufRead + Unpin,
{
    if header == "END" {
        return Ok(None);
    }

    // VALUE <key> <flags> <bytes> [<cas unique>]
    let Some(len) = header
        .strip_prefix("VALUE ")
        .and_then(|rest| rest.split(' ').nth(2))
        .and_then(|len| len.parse::<usize>().ok())
    else {
        return Err(unexpected(header));
    };
    if len > MAX_VALUE_LEN {
        return Err(Failure::Protocol(format!("value of {len} bytes exceeds the item size limit")));
    }

    let mut data = vec![0; len + 2];
    stream.read_exact(&mut data).await?;
    if !data.ends_with(b"\r\n") {
        return Err(Failure::Protocol("value block is not terminated".to_string()));
    }
    data.truncate(len);

    let trailer = read_line(stream).await?;
    if trailer != "END" {
        return Err(unexpected(trailer));
    }
    Ok(Some(Bytes::from(data)))
}

async fn read_line<S>(stream: &mut S) -> Result<String, Failure>
where
    S: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if stream.read_line(&mut line).await? == 0 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}

fn unexpected(line: String) -> Failure {
    if line == "NOT_STORED" || line.starts_with("SERVER_ERROR") {
        Failure::Rejected(line)
    } else {
        Failure::Protocol(line)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{BufStream, duplex};

    use super::*;

    async fn run(reply: &[u8], request: &Request<'_>) -> (Result<Reply, Failure>, Vec<u8>) {
        let (client, mut server) = duplex(4096);
        server.write_all(reply).await.expect("reply fits in the pipe");
        server.shutdown().await.expect("pipe accepts shutdown");

        let mut client = BufStream::new(client);
        let outcome = exchange(&mut client, request).await;
        drop(client);

        let mut sent = Vec::new();
        server.read_to_end(&mut sent).await.expect("pipe is readable");
        (outcome, sent)
    }

    #[tokio::test]
    async fn get_hit_returns_the_data_block() {
        let (outcome, sent) = run(b"VALUE k 0 5\r\nhello\r\nEND\r\n", &Request::Get { key: "k" }).await;
        assert_eq!(sent, b"get k\r\n");
        assert_eq!(outcome.expect("valid reply"), Reply::Value(Some(Bytes::from_static(b"hello"))));
    }

    #[tokio::test]
    async fn get_hit_accepts_cas_and_binary_data() {
        let (outcome, _) = run(b"VALUE k 3 4 99\r\n\0\r\n\xff\r\nEND\r\n", &Request::Get { key: "k" }).await;
        assert_eq!(
            outcome.expect("valid reply"),
            Reply::Value(Some(Bytes::from_static(b"\0\r\n\xff")))
        );
    }

    #[tokio::test]
    async fn oversized_value_header_is_a_protocol_failure() {
        let (outcome, _) = run(b"VALUE k 0 18446744073709551613\r\n", &Request::Get { key: "k" }).await;
        let failure = outcome.expect_err("length is rejected");
        assert!(matches!(failure, Failure::Protocol(_)), "{failure:?}");
        assert!(failure.breaks_connection());

        let header = format!("VALUE k 0 {}\r\n", MAX_VALUE_LEN + 1);
        let (outcome, _) = run(header.as_bytes(), &Request::Get { key: "k" }).await;
        assert!(matches!(outcome, Err(Failure::Protocol(_))));
    }

    #[tokio::test]
    async fn get_miss_returns_none() {
        let (outcome, _) = run(b"END\r\n", &Request::Get { key: "k" }).await;
        assert_eq!(outcome.expect("valid reply"), Reply::Value(None));
    }

    #[tokio::test]
    async fn set_sends_length_prefixed_block() {
        let request = Request::Set {
            key: "k",
            exptime: 30,
            data: b"abc",
        };
        let (outcome, sent) = run(b"STORED\r\n", &request).await;
        assert_eq!(sent, b"set k 0 30 3\r\nabc\r\n");
        assert_eq!(outcome.expect("valid reply"), Reply::Stored);
    }

    #[tokio::test]
    async fn delete_of_missing_key_succeeds() {
        let (outcome, sent) = run(b"NOT_FOUND\r\n", &Request::Delete { key: "k" }).await;
        assert_eq!(sent, b"delete k\r\n");
        assert_eq!(outcome.expect("valid reply"), Reply::Deleted);
    }

    #[tokio::test]
    async fn server_error_keeps_the_connection() {
        let request = Request::Set {
            key: "k",
            exptime: 0,
            data: b"v",
        };
        let (outcome, _) = run(b"SERVER_ERROR out of memory\r\n", &request).await;
        let failure = outcome.expect_err("server refused");
        assert!(matches!(failure, Failure::Rejected(_)));
        assert!(!failure.breaks_connection());
    }

    #[tokio::test]
    async fn garbage_breaks_the_connection() {
        let (outcome, _) = run(b"HELLO\r\n", &Request::Get { key: "k" }).await;
        let failure = outcome.expect_err("garbage reply");
        assert!(matches!(failure, Failure::Protocol(_)));
        assert!(failure.breaks_connection());
    }

    #[tokio::test]
    async fn closed_connection_is_an_io_failure() {
        let (outcome, _) = run(b"", &Request::Get { key: "k" }).await;
        assert!(matches!(outcome, Err(Failure::Io(_))));
    }

    #[test]
    fn keys_are_validated() {
        assert!(validate_key("user:1").is_ok());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN)).is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
        assert!(validate_key("with space").is_err());
        assert!(validate_key("with\nnewline").is_err());
        assert!(validate_key("bell\u{7}").is_err());
    }

    #[test]
    fn short_ttls_are_relative() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000_000);
        assert_eq!(exptime(Duration::ZERO, now), 0);
        assert_eq!(exptime(Duration::from_millis(1200), now), 2);
        assert_eq!(exptime(Duration::from_secs(RELATIVE_EXPIRY_LIMIT), now), RELATIVE_EXPIRY_LIMIT);
    }

    #[test]
    fn long_ttls_become_timestamps() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000_000);
        let ttl = Duration::from_secs(RELATIVE_EXPIRY_LIMIT + 1);
        assert_eq!(exptime(ttl, now), 1_000_000 + RELATIVE_EXPIRY_LIMIT + 1);
    }
}
