use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::{Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Headers the writer owns; caller-supplied copies are dropped.
const RESERVED_HEADERS: [&str; 2] = ["Content-Length", "Connection"];

/// Renders a status, headers and body into one HTTP/1.1 byte stream.
///
/// `Content-Length` always equals `body.len()` and `Connection: close` is
/// always present, whatever `headers` says.
pub fn encode_response(status: StatusCode, headers: &[(String, String)], body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    let caller_headers = headers
        .iter()
        .filter(|(k, _)| !RESERVED_HEADERS.iter().any(|r| k.eq_ignore_ascii_case(r)));
    for (k, v) in caller_headers {
        push_header(&mut buf, k, v);
    }
    push_header(&mut buf, "Content-Length", &body.len().to_string());
    push_header(&mut buf, "Connection", "close");

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(body);
    buf
}

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    encode_response(resp.status, &resp.headers, &resp.body)
}

fn push_header(buf: &mut Vec<u8>, key: &str, value: &str) {
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// A fully serialized response waiting to go out in a single write.
pub struct ResponseWriter {
    buffer: Vec<u8>,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub async fn write_to_stream<S>(&self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        stream.write_all(&self.buffer).await?;
        stream.flush().await?;
        Ok(())
    }
}
