use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::state::AppState;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A bound listener plus the state every connection shares.
pub struct Server {
    listener: TcpListener,
    app: Arc<AppState>,
}

impl Server {
    /// Builds the shared state and binds the listen address. Either
    /// failing is fatal to the process.
    pub async fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let app = AppState::from_config(cfg)?;
        let listener = TcpListener::bind(&cfg.server.listen_addr)
            .await
            .with_context(|| format!("binding {}", cfg.server.listen_addr))?;

        let local = listener.local_addr()?;
        info!(
            addr = %local,
            docroot = %app.resolver.root().display(),
            max_requests = app.limiter.max_requests(),
            window = ?app.limiter.window(),
            mode = %app.counters.mode(),
            "Listening"
        );

        Ok(Self {
            listener,
            app: Arc::new(app),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.app)
    }

    /// Accepts forever, one task per connection. Never waits on a task.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually fd exhaustion or a peer resetting mid-handshake.
                    error!("accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            let app = Arc::clone(&self.app);
            tokio::spawn(async move {
                let mut conn = Connection::new(socket, peer, app);
                if let Err(e) = conn.run().await {
                    tracing::debug!("Connection error from {}: {}", peer, e);
                }
            });
        }
    }
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    Server::bind(cfg).await?.run().await
}
