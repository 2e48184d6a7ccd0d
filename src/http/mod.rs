//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.1 subset: one `GET` per connection, the
//! request line is the only part of the head that matters, and every
//! response carries `Connection: close`.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Finds the end of the head and splits the request line
//! - **`request`**: Parsed request line
//! - **`response`**: Status codes and the response builder
//! - **`writer`**: Serializes responses and writes them in one go
//! - **`mime`**: Content type by file extension
//!
//! # Connection State Machine
//!
//! ```text
//!   AwaitingRequest ── bad/short/slow head ─────────────┐
//!         │ request line                                 │
//!         ▼                                              │
//!      Received ──── not GET (405) / over limit (429) ──┤
//!         │                                              │
//!         ▼                                              ▼
//!    RateChecked ─── escape (403) / missing (404) ──► ErrorResponse
//!         │                                              │
//!         ▼                                              │
//!    PathResolved ──► Serving | Listing ── fault (500) ─┤
//!                          │                             │
//!                          ▼                             ▼
//!                       Writing ◄────────────────────────┘
//!                          │
//!                          ▼
//!                        Closed
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
