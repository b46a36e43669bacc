//! Request head sniffing and parsing.
//!
//! # Responsibilities
//! - Read the first request head off a fresh connection, bounded
//! - Parse the request line and header lines, preserving order and casing
//! - Classify the request as a protocol upgrade or plain HTTP
//!
//! # Design Decisions
//! - The head is read once per connection, before any framing layer sees
//!   the stream; bytes past the blank line are kept for replay
//! - Header values are trimmed of optional whitespace, names are kept
//!   exactly as sent so a reconstructed head stays faithful

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on the sniffed request head. Covers large cookie loads.
pub const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Errors from reading or parsing a request head.
#[derive(Debug, Error)]
pub enum HeadError {
    /// The peer closed the connection before the blank line arrived.
    #[error("connection closed before the request head was complete")]
    UnexpectedEof,

    /// The head exceeded the sniffing bound.
    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),

    /// The head is syntactically invalid.
    #[error("malformed request head: {0}")]
    Malformed(&'static str),

    /// Reading from the socket failed.
    #[error("failed to read request head: {0}")]
    Io(#[from] std::io::Error),
}

/// A single header line with the original name casing preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    pub name: String,
    pub value: String,
}

impl HeaderLine {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A parsed HTTP/1.x request head.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// Request method, e.g. `GET`.
    pub method: String,
    /// Raw request target (path plus optional query).
    pub target: String,
    /// Protocol version token, e.g. `HTTP/1.1`.
    pub version: String,
    /// Header lines in arrival order.
    pub headers: Vec<HeaderLine>,
}

impl RequestHead {
    /// Parse a complete head, including the trailing blank line.
    pub fn parse(bytes: &[u8]) -> Result<Self, HeadError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| HeadError::Malformed("request head is not valid UTF-8"))?;

        let mut lines = text.split("\r\n");
        let request_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or(HeadError::Malformed("missing request line"))?;

        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HeadError::Malformed("invalid request line"));
        };

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(HeadError::Malformed("header line without a colon"));
            };
            headers.push(HeaderLine::new(name, value.trim()));
        }

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
            headers,
        })
    }

    /// First value of the named header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(name))
            .map(|h| h.value.as_str())
    }

    /// Whether the named header carries the given token in its
    /// comma-separated value list.
    pub fn has_header_token(&self, name: &str, token: &str) -> bool {
        self.headers.iter().filter(|h| h.is(name)).any(|h| {
            h.value
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case(token))
        })
    }

    /// Whether this request asks for a protocol upgrade.
    pub fn is_upgrade(&self) -> bool {
        self.has_header_token("connection", "upgrade") && self.header("upgrade").is_some()
    }

    /// The path component of the target, without the query.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }
}

/// A parsed request head together with every byte read off the socket.
#[derive(Debug)]
pub struct SniffedRequest {
    /// Parsed request head.
    pub head: RequestHead,
    /// Offset of the first byte past the blank line.
    pub head_len: usize,
    /// All bytes consumed from the socket, including any past the head.
    pub buffer: Vec<u8>,
}

impl SniffedRequest {
    /// Bytes read beyond the request head.
    pub fn preread(&self) -> &[u8] {
        &self.buffer[self.head_len..]
    }
}

/// Read one request head from the stream.
///
/// Accumulates until the `\r\n\r\n` boundary, erroring past
/// [`MAX_HEAD_BYTES`]. Bytes that arrive after the boundary stay in the
/// returned buffer.
pub async fn read_request_head<R>(stream: &mut R) -> Result<SniffedRequest, HeadError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(end) = find_subsequence(&buffer, b"\r\n\r\n") {
            let head_len = end + 4;
            let head = RequestHead::parse(&buffer[..head_len])?;
            return Ok(SniffedRequest {
                head,
                head_len,
                buffer,
            });
        }

        if buffer.len() > MAX_HEAD_BYTES {
            return Err(HeadError::TooLarge(MAX_HEAD_BYTES));
        }

        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(HeadError::UnexpectedEof);
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
