//! Server configuration.
//!
//! Everything is read from environment variables with sensible defaults, so
//! `cargo run` works with no setup at all.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clock::ClockConfig;
use crate::notify::WebhookConfig;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_TICK_MILLIS: u64 = 1000;

/// Errors in the environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("invalid {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuration for the trip server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub addr: SocketAddr,
    /// Directory holding `trips.json` and `notifications.json`
    pub data_dir: PathBuf,
    /// Notification gateway; `None` means the in-process recording host
    pub webhook: Option<WebhookConfig>,
    /// Progress ticker configuration
    pub clock: ClockConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            webhook: None,
            clock: ClockConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    ///
    /// - `TRIP_SERVER_ADDR` (default `127.0.0.1:3000`)
    /// - `TRIP_DATA_DIR` (default `data`)
    /// - `NOTIFY_WEBHOOK_URL`, `NOTIFY_WEBHOOK_TOKEN`
    /// - `TRIP_TICK_MILLIS` (default `1000`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`, which returns a variable's
    /// value if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let addr_str = get("TRIP_SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_str
            .trim()
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "TRIP_SERVER_ADDR",
                value: addr_str.clone(),
                reason: e.to_string(),
            })?;

        let data_dir = get("TRIP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let webhook = get("NOTIFY_WEBHOOK_URL").map(|url| {
            let config = WebhookConfig::new(url.trim());
            match get("NOTIFY_WEBHOOK_TOKEN") {
                Some(token) => config.with_token(token.trim()),
                None => config,
            }
        });

        let tick_millis = match get("TRIP_TICK_MILLIS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|&ms| ms > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "TRIP_TICK_MILLIS",
                    value: raw.clone(),
                    reason: "expected a positive number of milliseconds".to_string(),
                })?,
            None => DEFAULT_TICK_MILLIS,
        };

        Ok(Self {
            addr,
            data_dir,
            webhook,
            clock: ClockConfig::default().with_tick(Duration::from_millis(tick_millis)),
        })
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Use a webhook notification host.
    pub fn with_webhook(mut self, webhook: WebhookConfig) -> Self {
        self.webhook = Some(webhook);
        self
    }

    pub fn trips_path(&self) -> PathBuf {
        self.data_dir.join("trips.json")
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.data_dir.join("notifications.json")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
