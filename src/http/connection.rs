use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::ServeError;
use crate::files::{ListingPage, Resolved, ResolvedFile, render_listing, walk_docroot};
use crate::http::mime::content_type_for;
use crate::http::parser::{MAX_HEAD_BYTES, ParseError, parse_http_request, parse_request_line};
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::state::AppState;

const READ_CHUNK: usize = 4096;

/// One accepted client: exactly one request, exactly one response.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    app: Arc<AppState>,
    buffer: BytesMut,
    state: ConnectionState,
}

pub enum ConnectionState {
    AwaitingRequest,
    /// Request line parsed; method and rate limit not yet checked
    Received(Request),
    RateChecked(Request),
    PathResolved(Resolved),
    Serving(ResolvedFile),
    Listing,
    ErrorResponse(ServeError),
    Writing(ResponseWriter, StatusCode),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, app: Arc<AppState>) -> Self {
        Self {
            stream,
            peer,
            app,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::AwaitingRequest,
        }
    }

    /// Drives the connection to `Closed` and shuts the stream down.
    ///
    /// Every request-level failure becomes an error response; only a
    /// failure to deliver that response is returned.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut outcome = Ok(());

        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            self.state = match state {
                ConnectionState::AwaitingRequest => match self.read_request().await {
                    Ok(req) => ConnectionState::Received(req),
                    Err(e) => ConnectionState::ErrorResponse(e),
                },

                ConnectionState::Received(req) => match self.check_admission(&req) {
                    Ok(()) => ConnectionState::RateChecked(req),
                    Err(e) => ConnectionState::ErrorResponse(e),
                },

                ConnectionState::RateChecked(req) => {
                    match self.app.resolver.resolve(&req.path).await {
                        Ok(resolved) => ConnectionState::PathResolved(resolved),
                        Err(e) => ConnectionState::ErrorResponse(e),
                    }
                }

                ConnectionState::PathResolved(Resolved::Listing) => ConnectionState::Listing,
                ConnectionState::PathResolved(Resolved::File(file)) => {
                    ConnectionState::Serving(file)
                }

                ConnectionState::Serving(file) => match self.serve_file(&file).await {
                    Ok(resp) => Self::respond(&resp),
                    Err(e) => ConnectionState::ErrorResponse(e),
                },

                ConnectionState::Listing => match self.render_listing().await {
                    Ok(resp) => Self::respond(&resp),
                    Err(e) => ConnectionState::ErrorResponse(e),
                },

                ConnectionState::ErrorResponse(e) => {
                    self.log_error(&e);
                    Self::respond(&e.into_response())
                }

                ConnectionState::Writing(writer, status) => {
                    if let Err(e) = writer.write_to_stream(&mut self.stream).await {
                        debug!(peer = %self.peer, status = status.as_u16(), error = %e, "write failed");
                        outcome = Err(e);
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        // The peer may already be gone; nothing to do about it here.
        let _ = self.stream.shutdown().await;
        outcome
    }

    fn respond(resp: &Response) -> ConnectionState {
        ConnectionState::Writing(ResponseWriter::new(resp), resp.status)
    }

    async fn read_request(&mut self) -> Result<Request, ServeError> {
        match timeout(self.app.read_timeout, self.read_head()).await {
            Ok(result) => result,
            Err(_) => Err(ServeError::Malformed(
                "timed out waiting for request head".to_string(),
            )),
        }
    }

    /// Reads until the blank line ending the head, EOF, or the byte ceiling.
    async fn read_head(&mut self) -> Result<Request, ServeError> {
        let mut temp = [0u8; READ_CHUNK];

        loop {
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(request);
                }
                Err(ParseError::Incomplete) => {}
                Err(e) => return Err(e.into()),
            }

            let room = MAX_HEAD_BYTES - self.buffer.len();
            if room == 0 {
                return Err(ServeError::Malformed(format!(
                    "no end of head within {} bytes",
                    MAX_HEAD_BYTES
                )));
            }

            let n = self
                .stream
                .read(&mut temp[..room.min(READ_CHUNK)])
                .await
                .map_err(|e| ServeError::Malformed(format!("read failed: {}", e)))?;

            if n == 0 {
                if self.buffer.is_empty() {
                    return Err(ServeError::Malformed(
                        "connection closed before any data".to_string(),
                    ));
                }
                // Peer hung up mid-head; work with the request line we have.
                return Ok(parse_request_line(&self.buffer)?);
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }
    }

    fn check_admission(&self, req: &Request) -> Result<(), ServeError> {
        if !req.is_get() {
            return Err(ServeError::MethodNotAllowed(req.method.as_str().to_string()));
        }

        let limiter = &self.app.limiter;
        let client = self.peer.ip();
        if limiter.admit(client, Instant::now()) {
            return Ok(());
        }

        Err(ServeError::RateLimited {
            client,
            max_requests: limiter.max_requests(),
            window_seconds: limiter.window().as_secs_f64(),
            retry_after: limiter.retry_after_secs(),
        })
    }

    async fn serve_file(&self, file: &ResolvedFile) -> Result<Response, ServeError> {
        let body = tokio::fs::read(&file.path).await?;
        let content_type = content_type_for(&file.path);

        self.app.counters.increment(&file.key);

        info!(
            peer = %self.peer,
            path = %file.key,
            bytes = body.len(),
            "served file"
        );
        Ok(Response::ok(&content_type, body))
    }

    async fn render_listing(&self) -> Result<Response, ServeError> {
        let files = walk_docroot(self.app.resolver.root())
            .await
            .map_err(|e| ServeError::Internal(format!("listing docroot: {}", e)))?;
        let counts = self.app.counters.snapshot();
        let limiter = &self.app.limiter;

        let html = render_listing(&ListingPage {
            files: &files,
            counts: &counts,
            stats: limiter.stats(Instant::now()),
            max_requests: limiter.max_requests(),
            window_seconds: limiter.window().as_secs_f64(),
            mode: self.app.counters.mode(),
        });

        debug!(peer = %self.peer, files = files.len(), "rendered listing");
        Ok(Response::ok("text/html; charset=utf-8", html))
    }

    fn log_error(&self, e: &ServeError) {
        let status = e.status().as_u16();
        match e {
            ServeError::Internal(_) => error!(peer = %self.peer, status, error = %e, "request failed"),
            ServeError::RateLimited { client, .. } => {
                warn!(peer = %self.peer, client = %client, status, "rate limited")
            }
            ServeError::PathEscape => warn!(peer = %self.peer, status, "path escape rejected"),
            _ => debug!(peer = %self.peer, status, error = %e, "request rejected"),
        }
    }
}
