//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development. The store, hub and gateway never
//! read the environment themselves; `main` hands them these values.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use orbit_shared::constants::{
    APP_NAME, DEFAULT_HISTORY_LIMIT, DEFAULT_HTTP_PORT, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_SEARCH_HISTORY_LIMIT,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP + WebSocket server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Human-readable name reported by `/info`.
    /// Env: `INSTANCE_NAME`
    pub instance_name: String,

    /// Size of the history window returned by `GET /api/chat/messages`.
    /// Env: `CHAT_HISTORY_LIMIT`
    /// Default: `50`
    pub chat_history_limit: usize,

    /// Upper bound on retained chat messages (0 = never evict).
    /// Env: `CHAT_MAX_RETAINED`
    /// Default: `0`
    pub max_retained_messages: usize,

    /// Size of the search history window.
    /// Env: `SEARCH_HISTORY_LIMIT`
    /// Default: `20`
    pub search_history_limit: usize,

    /// Maximum accepted HTTP request body.
    /// Env: `MAX_BODY_BYTES`
    /// Default: 1 MiB
    pub max_body_bytes: usize,

    /// How often closed channels are swept from the broadcast hub.
    /// Env: `CHANNEL_SWEEP_SECS`
    /// Default: `60`
    pub channel_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            instance_name: APP_NAME.to_string(),
            chat_history_limit: DEFAULT_HISTORY_LIMIT,
            max_retained_messages: 0,
            search_history_limit: DEFAULT_SEARCH_HISTORY_LIMIT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            channel_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            parse_into(&addr, "HTTP_ADDR", &mut config.http_addr);
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            if !name.trim().is_empty() {
                config.instance_name = name;
            }
        }

        if let Some(val) = lookup("CHAT_HISTORY_LIMIT") {
            parse_into(&val, "CHAT_HISTORY_LIMIT", &mut config.chat_history_limit);
        }

        if let Some(val) = lookup("CHAT_MAX_RETAINED") {
            parse_into(&val, "CHAT_MAX_RETAINED", &mut config.max_retained_messages);
        }

        if let Some(val) = lookup("SEARCH_HISTORY_LIMIT") {
            parse_into(&val, "SEARCH_HISTORY_LIMIT", &mut config.search_history_limit);
        }

        if let Some(val) = lookup("MAX_BODY_BYTES") {
            parse_into(&val, "MAX_BODY_BYTES", &mut config.max_body_bytes);
        }

        if let Some(val) = lookup("CHANNEL_SWEEP_SECS") {
            let mut secs = config.channel_sweep_interval.as_secs();
            parse_into(&val, "CHANNEL_SWEEP_SECS", &mut secs);
            config.channel_sweep_interval = Duration::from_secs(secs.max(1));
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_into<T: FromStr>(raw: &str, key: &str, slot: &mut T) {
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
        }
    }
}
