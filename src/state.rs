use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::Config;
use crate::counters::{self, CounterStore};
use crate::files::PathResolver;
use crate::limiter::RateLimiter;

// Shared by every connection task. Built once at startup.
#[derive(Debug)]
pub struct AppState {
    pub resolver: PathResolver,
    pub limiter: RateLimiter,
    pub counters: Arc<dyn CounterStore>,
    pub read_timeout: Duration,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let resolver = PathResolver::new(&cfg.docroot)
            .with_context(|| format!("docroot {} is not accessible", cfg.docroot.display()))?;

        Ok(Self {
            resolver,
            limiter: RateLimiter::new(cfg.rate_limit.max_requests, cfg.rate_limit.window()),
            counters: counters::build(cfg.counters.mode),
            read_timeout: cfg.server.read_timeout(),
        })
    }
}
