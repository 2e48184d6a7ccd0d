//! Request-local failures and their HTTP rendering.

use std::net::IpAddr;

use crate::http::parser::ParseError;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Everything that can end a request early.
///
/// None of these outlive the connection that produced them.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("path escapes the document root")]
    PathEscape,

    #[error("not found")]
    NotFound,

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("rate limited: {max_requests} requests per {window_seconds}s")]
    RateLimited {
        client: IpAddr,
        max_requests: usize,
        window_seconds: f64,
        retry_after: u64,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::Malformed(_) => StatusCode::BadRequest,
            ServeError::PathEscape => StatusCode::Forbidden,
            ServeError::NotFound => StatusCode::NotFound,
            ServeError::MethodNotAllowed(_) => StatusCode::MethodNotAllowed,
            ServeError::RateLimited { .. } => StatusCode::TooManyRequests,
            ServeError::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Renders the error page. Only 429 and 500 carry a body.
    pub fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ServeError::MethodNotAllowed(_) => {
                ResponseBuilder::new(status).header("Allow", "GET").build()
            }
            ServeError::RateLimited {
                client,
                max_requests,
                window_seconds,
                retry_after,
            } => {
                let body = format!(
                    "<!doctype html><html><head><title>Rate Limited</title></head><body>\n\
                     <h1>429 Too Many Requests</h1>\n\
                     <p>Rate limit exceeded: {max_requests} requests per {window_seconds} second(s)</p>\n\
                     <p>Your IP: {client}</p>\n\
                     <p>Please wait {retry_after} second(s) before trying again.</p>\n\
                     </body></html>"
                );
                ResponseBuilder::new(status)
                    .header("Content-Type", "text/html; charset=utf-8")
                    .header("Retry-After", retry_after.to_string())
                    .body(body.into_bytes())
                    .build()
            }
            ServeError::Internal(msg) => ResponseBuilder::new(status)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(format!("Internal error: {msg}\n").into_bytes())
                .build(),
            ServeError::Malformed(_) | ServeError::PathEscape | ServeError::NotFound => {
                Response::empty(status)
            }
        }
    }
}

impl From<ParseError> for ServeError {
    fn from(e: ParseError) -> Self {
        ServeError::Malformed(format!("{:?}", e))
    }
}

impl From<std::io::Error> for ServeError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => ServeError::NotFound,
            _ => ServeError::Internal(e.to_string()),
        }
    }
}
