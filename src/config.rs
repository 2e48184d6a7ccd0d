//! Process configuration.
//!
//! Loaded once at startup from an optional YAML file, then frozen. Every
//! field has a default so an empty document is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use serde::Deserialize;
use tracing::Level;

use crate::counters::CounterMode;

/// Env var naming the YAML configuration file.
pub const CONFIG_ENV: &str = "DOCGATE_CONFIG";
/// Env var overriding `server.listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub docroot: PathBuf,
    pub rate_limit: RateLimitConfig,
    pub counters: CountersConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Upper bound on how long a peer may take to send its request head.
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CountersConfig {
    pub mode: CounterMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            docroot: PathBuf::from("./content"),
            rate_limit: RateLimitConfig::default(),
            counters: CountersConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8084".to_string(),
            read_timeout_ms: 2000,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_seconds: 1.0,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_seconds)
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Config {
    /// Loads the configuration named by `DOCGATE_CONFIG` (or the defaults),
    /// then applies the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path))?;
                Self::from_yaml_str(&raw)
                    .with_context(|| format!("parsing config file {}", path))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rate_limit.max_requests == 0 {
            bail!("rate_limit.max_requests must be at least 1");
        }
        let window = self.rate_limit.window_seconds;
        if !window.is_finite() || window <= 0.0 {
            bail!("rate_limit.window_seconds must be a positive number, got {}", window);
        }
        if Duration::try_from_secs_f64(window).is_err() {
            bail!("rate_limit.window_seconds is too large, got {}", window);
        }
        if self.server.read_timeout_ms == 0 {
            bail!("server.read_timeout_ms must be at least 1");
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> anyhow::Result<Level> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| anyhow!("log_level {:?} is not a tracing level", self.log_level))
    }
}
