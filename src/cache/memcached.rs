//! Memcached text-protocol backend for the shared cache.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use super::{validate_key, CacheError, DnsCache};

/// Per-round-trip deadline; the transport bounds latency, not the caller.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Upper bound on a buffered response. A reply for a single hostname is far
/// smaller; anything larger is a framing error.
const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// How to tell a reply is complete.
#[derive(Clone, Copy)]
enum ReplyFraming {
    /// Single status line (`set` replies).
    StatusLine,
    /// `get` reply: bare `END`, or a VALUE block closed by `END`.
    ValueBlock,
}

/// Client for a single shared memcached instance.
///
/// The connection is established on first use and reused across calls. Any
/// IO error or timeout drops it so the next call reconnects. Teardown is a
/// process-lifecycle concern; there is no explicit close.
pub struct MemcachedClient {
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<TcpStream>>,
}

impl MemcachedClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
            conn: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one command round trip on the pooled connection.
    async fn round_trip(
        &self,
        command: &[u8],
        framing: ReplyFraming,
    ) -> Result<String, CacheError> {
        let mut guard = self.conn.lock().await;

        if guard.is_none() {
            debug!(addr = %self.addr, "connecting to cache");
            let stream = timeout(self.timeout, TcpStream::connect(&self.addr))
                .await
                .map_err(|_| CacheError::Timeout)?
                .map_err(|e| CacheError::Connect(e.to_string()))?;
            *guard = Some(stream);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(CacheError::Connect("connection unavailable".to_string()));
        };

        match timeout(self.timeout, exchange(stream, command, framing)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                *guard = None;
                Err(e)
            }
            Err(_) => {
                *guard = None;
                Err(CacheError::Timeout)
            }
        }
    }
}

#[async_trait::async_trait]
impl DnsCache for MemcachedClient {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        validate_key(key)?;
        // A value with line breaks would corrupt the wire framing.
        if value.bytes().any(|b| b == b'\r' || b == b'\n') {
            return Err(CacheError::BadValue("value contains line breaks".to_string()));
        }
        let command = format!(
            "set {} 0 {} {}\r\n{}\r\n",
            key,
            ttl.as_secs(),
            value.len(),
            value
        );
        let response = self
            .round_trip(command.as_bytes(), ReplyFraming::StatusLine)
            .await?;
        let status = response.trim_end();
        if status == "STORED" {
            Ok(())
        } else {
            Err(CacheError::Protocol(format!(
                "unexpected store reply: {}",
                status
            )))
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        validate_key(key)?;
        let command = format!("get {}\r\n", key);
        let response = self
            .round_trip(command.as_bytes(), ReplyFraming::ValueBlock)
            .await?;
        parse_get_response(&response, key)
    }
}

fn reply_complete(buf: &[u8], framing: ReplyFraming) -> bool {
    match framing {
        ReplyFraming::StatusLine => buf.ends_with(b"\r\n"),
        ReplyFraming::ValueBlock => value_block_complete(buf),
    }
}

/// A `get` reply is either a lone status line (`END`, `ERROR`, ...) or a
/// VALUE block whose body length is declared in the header, followed by a
/// trailing `END` line. The declared length keeps a body that happens to
/// spell `END` from ending the read early.
fn value_block_complete(buf: &[u8]) -> bool {
    let Some(header_end) = find_crlf(buf) else {
        return false;
    };
    let header = &buf[..header_end];
    if !header.starts_with(b"VALUE ") {
        return true;
    }
    let Some(declared_len) = declared_value_len(header) else {
        // Unparseable VALUE header; the parser reports it.
        return true;
    };
    let expected = header_end + 2 + declared_len + 2 + b"END\r\n".len();
    buf.len() >= expected
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Byte count from a `VALUE <key> <flags> <bytes>` header.
fn declared_value_len(header: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(header).ok()?;
    text.split_whitespace().nth(3).and_then(|v| v.parse().ok())
}

/// Write `command` and read until the reply is complete under `framing`.
async fn exchange(
    stream: &mut TcpStream,
    command: &[u8],
    framing: ReplyFraming,
) -> Result<String, CacheError> {
    stream
        .write_all(command)
        .await
        .map_err(|e| CacheError::Connect(e.to_string()))?;

    let mut buf = BytesMut::with_capacity(256);
    loop {
        let n = stream
            .read_buf(&mut buf)
            .await
            .map_err(|e| CacheError::Connect(e.to_string()))?;
        if n == 0 {
            return Err(CacheError::Connect(
                "connection closed by server".to_string(),
            ));
        }
        if buf.len() > MAX_RESPONSE_SIZE {
            return Err(CacheError::Protocol(
                "response exceeds size limit".to_string(),
            ));
        }
        if reply_complete(&buf, framing) {
            return match std::str::from_utf8(&buf) {
                Ok(text) => Ok(text.to_string()),
                Err(_) => Err(CacheError::Protocol("reply is not utf-8".to_string())),
            };
        }
    }
}

/// Parse a `get` reply: `END` for a miss, or
/// `VALUE <key> <flags> <bytes>\r\n<data>\r\nEND\r\n` for a hit.
fn parse_get_response(response: &str, key: &str) -> Result<Option<String>, CacheError> {
    let mut lines = response.split("\r\n");
    let header = lines.next().unwrap_or("");
    if header == "END" {
        return Ok(None);
    }

    let mut parts = header.split_whitespace();
    if parts.next() != Some("VALUE") {
        return Err(CacheError::Protocol(format!(
            "unexpected get reply: {}",
            header
        )));
    }
    let reply_key = parts.next().unwrap_or("");
    if reply_key != key {
        return Err(CacheError::Protocol(format!(
            "reply for wrong key: {}",
            reply_key
        )));
    }
    // Remaining header fields are <flags> <bytes>
    let declared_len: usize = parts
        .nth(1)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| CacheError::Protocol(format!("bad value header: {}", header)))?;

    let data = lines.next().unwrap_or("");
    if data.len() != declared_len {
        return Err(CacheError::Protocol(format!(
            "value length mismatch: declared {}, got {}",
            declared_len,
            data.len()
        )));
    }
    Ok(Some(data.to_string()))
}
