mod common;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use common::{RawResponse, app_state, config, docroot, parse_response};
use docgate::counters::CounterMode;
use docgate::http::connection::Connection;
use docgate::state::AppState;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

fn peer(last: u8) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 1, 1, last)), 40000)
}

/// Runs one connection over an in-memory pipe. `input` is written, then
/// the client's write half is closed if `close` is set.
async fn exchange(app: Arc<AppState>, from: SocketAddr, input: &[u8], close: bool) -> RawResponse {
    let (mut client, server): (DuplexStream, DuplexStream) = duplex(1 << 20);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, from, app);
        conn.run().await
    });

    client.write_all(input).await.unwrap();
    if close {
        client.shutdown().await.unwrap();
    }
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    task.await.unwrap().unwrap();
    parse_response(&out)
}

#[tokio::test]
async fn test_serves_file_with_content_type() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    let resp = exchange(app.clone(), peer(1), b"GET /a.txt HTTP/1.1\r\n\r\n", false).await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.reason, "OK");
    assert_eq!(resp.header("Content-Type"), Some("text/plain; charset=utf-8"));
    assert_eq!(resp.header("Content-Length"), Some("6"));
    assert_eq!(resp.header("Connection"), Some("close"));
    assert_eq!(resp.body, b"alpha\n".to_vec());
    assert_eq!(app.counters.get("/a.txt"), 1);
}

#[tokio::test]
async fn test_unknown_extension_is_octet_stream() {
    let dir = docroot();
    std::fs::write(dir.path().join("blob.zzz"), [0u8, 1, 2]).unwrap();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    let resp = exchange(app, peer(1), b"GET /blob.zzz HTTP/1.1\r\n\r\n", false).await;

    assert_eq!(resp.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(resp.body, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_empty_connection_is_bad_request() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    let resp = exchange(app, peer(1), b"", true).await;

    assert_eq!(resp.status, 400);
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_malformed_request_line_is_bad_request() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    for input in [&b"GET /a.txt\r\n\r\n"[..], b"GARBAGE\r\n\r\n", b"GET /a.txt HTTP/1.1 x\r\n\r\n"] {
        let resp = exchange(app.clone(), peer(1), input, false).await;
        assert_eq!(resp.status, 400);
    }
    assert_eq!(app.counters.get("/a.txt"), 0);
}

#[tokio::test]
async fn test_truncated_head_still_served_from_request_line() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    let resp = exchange(app, peer(1), b"GET /b/c.txt HTTP/1.1\r\nHost: x", true).await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"charlie\n".to_vec());
}

#[tokio::test]
async fn test_head_over_ceiling_is_bad_request() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    let mut input = b"GET /a.txt HTTP/1.1\r\nX-Pad: ".to_vec();
    input.resize(70_000, b'a');
    let resp = exchange(app.clone(), peer(1), &input, false).await;

    assert_eq!(resp.status, 400);
    assert_eq!(app.counters.get("/a.txt"), 0);
}

#[tokio::test]
async fn test_slow_peer_times_out_with_bad_request() {
    let dir = docroot();
    let mut cfg = config(dir.path(), 10, CounterMode::Locked);
    cfg.server.read_timeout_ms = 100;
    let app = app_state(&cfg);

    let (mut client, server) = duplex(4096);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, peer(1), app);
        conn.run().await
    });

    client.write_all(b"GET /a.txt HTTP/1.1\r\n").await.unwrap();
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut out))
        .await
        .expect("server never gave up on the slow peer")
        .unwrap();
    task.await.unwrap().unwrap();

    assert_eq!(parse_response(&out).status, 400);
}

#[tokio::test]
async fn test_post_is_method_not_allowed() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    let resp = exchange(
        app.clone(),
        peer(1),
        b"POST /a.txt HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc",
        false,
    )
    .await;

    assert_eq!(resp.status, 405);
    assert_eq!(resp.reason, "Method Not Allowed");
    assert_eq!(resp.header("Allow"), Some("GET"));
    assert_eq!(resp.header("Content-Length"), Some("0"));
    assert!(resp.body.is_empty());
    assert_eq!(app.counters.get("/a.txt"), 0);
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    for input in [
        &b"GET /../../etc/passwd HTTP/1.1\r\n\r\n"[..],
        b"GET /%2e%2e/%2e%2e/etc/passwd HTTP/1.1\r\n\r\n",
    ] {
        let resp = exchange(app.clone(), peer(1), input, false).await;
        assert_eq!(resp.status, 403);
        assert_eq!(resp.reason, "Forbidden");
    }
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    let resp = exchange(app.clone(), peer(1), b"GET /missing.txt HTTP/1.1\r\n\r\n", false).await;
    assert_eq!(resp.status, 404);

    let resp = exchange(app.clone(), peer(1), b"GET /b HTTP/1.1\r\n\r\n", false).await;
    assert_eq!(resp.status, 404);
    assert!(app.counters.snapshot().is_empty());
}

#[tokio::test]
async fn test_rate_limit_applies_per_peer_address() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 2, CounterMode::Locked));
    let request = b"GET /a.txt HTTP/1.1\r\n\r\n";

    assert_eq!(exchange(app.clone(), peer(1), request, false).await.status, 200);
    assert_eq!(exchange(app.clone(), peer(1), request, false).await.status, 200);

    let limited = exchange(app.clone(), peer(1), request, false).await;
    assert_eq!(limited.status, 429);
    assert_eq!(limited.reason, "Too Many Requests");
    assert_eq!(limited.header("Retry-After"), Some("60"));
    assert!(limited.text().contains("10.1.1.1"));

    // Same IP on another port is the same client.
    let other_port = SocketAddr::new(peer(1).ip(), 50000);
    assert_eq!(exchange(app.clone(), other_port, request, false).await.status, 429);

    assert_eq!(exchange(app.clone(), peer(2), request, false).await.status, 200);
    assert_eq!(app.counters.get("/a.txt"), 3);
}

#[tokio::test]
async fn test_rate_limited_request_skips_resolution() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 1, CounterMode::Locked));

    assert_eq!(exchange(app.clone(), peer(1), b"GET /a.txt HTTP/1.1\r\n\r\n", false).await.status, 200);

    // Would be 403 or 404 if the path were looked at.
    let escape = exchange(app.clone(), peer(1), b"GET /../x HTTP/1.1\r\n\r\n", false).await;
    assert_eq!(escape.status, 429);
    let missing = exchange(app.clone(), peer(1), b"GET /missing HTTP/1.1\r\n\r\n", false).await;
    assert_eq!(missing.status, 429);
}

#[tokio::test]
async fn test_listing_shows_files_with_zero_counts() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    let resp = exchange(app, peer(1), b"GET / HTTP/1.1\r\n\r\n", false).await;
    let body = resp.text();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Type"), Some("text/html; charset=utf-8"));
    assert!(body.contains("<a href=\"/a.txt\">/a.txt</a></td><td class=\"count\">0</td>"));
    assert!(body.contains("<a href=\"/b/c.txt\">/b/c.txt</a></td><td class=\"count\">0</td>"));
    assert_eq!(
        resp.header("Content-Length"),
        Some(resp.body.len().to_string().as_str())
    );
}

#[tokio::test]
async fn test_listing_does_not_count_itself() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));

    exchange(app.clone(), peer(1), b"GET / HTTP/1.1\r\n\r\n", false).await;
    assert!(app.counters.snapshot().is_empty());
}

#[tokio::test]
async fn test_vanished_docroot_yields_internal_error_page() {
    let dir = docroot();
    let app = app_state(&config(dir.path(), 10, CounterMode::Locked));
    std::fs::remove_dir_all(dir.path()).unwrap();

    let resp = exchange(app, peer(1), b"GET / HTTP/1.1\r\n\r\n", false).await;

    assert_eq!(resp.status, 500);
    assert_eq!(resp.reason, "Internal Server Error");
    assert_eq!(resp.header("Content-Type"), Some("text/plain; charset=utf-8"));
    let body = resp.text();
    assert!(body.starts_with("Internal error: listing docroot: "), "{}", body);
    assert!(body.ends_with('\n'));
}
