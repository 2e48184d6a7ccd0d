use crate::http::request::{Method, Request};

/// Byte ceiling for a request head; a peer that sends this much without
/// the blank-line terminator gets a 400.
pub const MAX_HEAD_BYTES: usize = 65536;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// No `\r\n\r\n` terminator yet
    Incomplete,
    /// Nothing usable arrived (empty input or no request line)
    InvalidRequest,
    /// Request line is not exactly `<method> <path> <version>`
    InvalidRequestLine,
}

/// Parses a complete request head out of `buf`.
///
/// Returns the request and the number of bytes consumed up to and
/// including the terminator. Header lines are skipped without validation.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let request = parse_request_line(&buf[..headers_end])?;
    Ok((request, headers_end + 4))
}

/// Parses the first line of `buf`, whatever follows it.
///
/// Used directly when the peer hangs up before finishing its headers.
pub fn parse_request_line(buf: &[u8]) -> Result<Request, ParseError> {
    let line_end = buf
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(buf.len());
    let line = String::from_utf8_lossy(&buf[..line_end]);

    if line.trim().is_empty() {
        return Err(ParseError::InvalidRequest);
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let [method, path, version] = parts.as_slice() else {
        return Err(ParseError::InvalidRequestLine);
    };

    Ok(Request::new(Method::from_token(method), *path, *version))
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
