//! Response framer: (status, body) from a raw HTTP/1.1 byte stream
//!
//! Reads chunks until the end-of-headers marker, takes the status code from
//! the status line's second token, scans headers case-insensitively for
//! Content-Length, then reads exactly that many body bytes — accounting for
//! whatever was already buffered past the header boundary. Tolerates any
//! chunking of the stream; a response split across arbitrary reads frames
//! identically.

use std::io::{self, Read};

use thiserror::Error;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 4096;

/// Why a response could not be framed
///
/// Workers treat every variant identically to a connection-level failure:
/// count an error, discard the connection, continue.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Stream closed before the header terminator arrived
    #[error("connection closed before headers completed")]
    TruncatedHeaders,

    /// Status line had fewer than two tokens or a non-numeric code
    #[error("malformed status line")]
    MalformedStatusLine,

    /// Stream closed before the declared body length was delivered
    #[error("connection closed before body completed")]
    TruncatedBody,

    /// Socket-level read failure (including per-operation timeout)
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// A framed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code from the status line
    pub status: u16,
    /// Exactly `Content-Length` body bytes
    pub body: Vec<u8>,
}

/// Read one response off the stream
pub fn read_response<R: Read + ?Sized>(stream: &mut R) -> Result<Response, FrameError> {
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    // Accumulate until the end-of-headers marker. Rescanning the whole
    // buffer finds a terminator even when it straddles two reads.
    let boundary = loop {
        if let Some(pos) = find_terminator(&buf) {
            break pos;
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Err(FrameError::TruncatedHeaders);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = &buf[..boundary];
    let status = parse_status_line(head)?;
    let content_length = parse_content_length(head);

    // Bytes already read past the header boundary belong to the body.
    let mut body: Vec<u8> = buf[boundary + HEADER_TERMINATOR.len()..].to_vec();
    while body.len() < content_length {
        let want = (content_length - body.len()).min(READ_CHUNK);
        let n = stream.read(&mut chunk[..want])?;
        if n == 0 {
            return Err(FrameError::TruncatedBody);
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Response { status, body })
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

/// Status code is the second whitespace-separated token of the first line
fn parse_status_line(head: &[u8]) -> Result<u16, FrameError> {
    let line = head.split(|&b| b == b'\r').next().unwrap_or(head);
    let mut tokens = line.split(|&b| b == b' ').filter(|t| !t.is_empty());
    let _version = tokens.next().ok_or(FrameError::MalformedStatusLine)?;
    let code = tokens.next().ok_or(FrameError::MalformedStatusLine)?;
    std::str::from_utf8(code)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or(FrameError::MalformedStatusLine)
}

/// Case-insensitive Content-Length scan; absent or unparsable means no body
fn parse_content_length(head: &[u8]) -> usize {
    const FIELD: &str = "content-length:";
    for line in head.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.len() < FIELD.len() {
            continue;
        }
        let (name, value) = line.split_at(FIELD.len());
        if name.eq_ignore_ascii_case(FIELD.as_bytes()) {
            return std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(0);
        }
    }
    0
}
