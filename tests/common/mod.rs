#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use docgate::config::Config;
use docgate::counters::CounterMode;
use docgate::server::Server;
use docgate::state::AppState;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A parsed response as seen by a client.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn parse_response(raw: &[u8]) -> RawResponse {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no blank line");
    let head = std::str::from_utf8(&raw[..end]).unwrap();
    let mut lines = head.split("\r\n");

    let status_line = lines.next().unwrap();
    let mut parts = status_line.splitn(3, ' ');
    assert_eq!(parts.next(), Some("HTTP/1.1"));
    let status = parts.next().unwrap().parse().unwrap();
    let reason = parts.next().unwrap_or("").to_string();

    let headers = lines
        .map(|l| {
            let (k, v) = l.split_once(": ").unwrap();
            (k.to_string(), v.to_string())
        })
        .collect();

    RawResponse {
        status,
        reason,
        headers,
        body: raw[end + 4..].to_vec(),
    }
}

/// docroot with `a.txt` and `b/c.txt`.
pub fn docroot() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha\n").unwrap();
    fs::create_dir(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("b/c.txt"), "charlie\n").unwrap();
    dir
}

pub fn config(docroot: &Path, max_requests: usize, mode: CounterMode) -> Config {
    let mut cfg = Config::default();
    cfg.server.listen_addr = "127.0.0.1:0".to_string();
    cfg.docroot = docroot.to_path_buf();
    cfg.rate_limit.max_requests = max_requests;
    cfg.rate_limit.window_seconds = 60.0;
    cfg.counters.mode = mode;
    cfg
}

pub fn app_state(cfg: &Config) -> Arc<AppState> {
    Arc::new(AppState::from_config(cfg).unwrap())
}

/// Binds the server on an ephemeral port and runs it in the background.
pub async fn start(cfg: &Config) -> (SocketAddr, Arc<AppState>) {
    let server = Server::bind(cfg).await.unwrap();
    let addr = server.local_addr().unwrap();
    let state = server.state();
    tokio::spawn(server.run());
    (addr, state)
}

pub async fn send(addr: SocketAddr, raw: &[u8]) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    parse_response(&buf)
}

pub async fn get(addr: SocketAddr, path: &str) -> RawResponse {
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
    send(addr, request.as_bytes()).await
}
