//! Docgate - rate-limited static file server
//!
//! Serves a document root over a minimal HTTP/1.1 subset, admitting each
//! client through a sliding-window limiter and counting hits per file.

pub mod config;
pub mod counters;
pub mod error;
pub mod files;
pub mod http;
pub mod limiter;
pub mod server;
pub mod state;
