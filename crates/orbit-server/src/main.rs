//! # orbit-server
//!
//! Backend for the Orbit dashboard.
//!
//! This binary provides:
//! - **Real-time chat** over a WebSocket at `/ws`: inbound chat frames are
//!   stored, then fanned out to every open channel
//! - **REST API** (axum) for chat history and message creation, plus the
//!   search and translation stubs used by the dashboard panels
//! - **Health/info** endpoints for operators
//!
//! All state lives in process memory and is lost on restart.

mod api;
mod config;
mod error;
mod gateway;
mod hub;
mod search;
mod translate;

use std::sync::Arc;

use orbit_store::{MemoryMessageStore, MemorySearchStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orbit_server=debug")),
        )
        .init();

    info!("Starting Orbit server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize stores and shared state
    // -----------------------------------------------------------------------
    let messages = Arc::new(MemoryMessageStore::with_retention(
        config.max_retained_messages,
    ));
    match messages.max_retained() {
        Some(cap) => info!(cap, "Chat retention capped"),
        None => info!("Chat retention unbounded"),
    }
    let searches = Arc::new(MemorySearchStore::new());

    let http_addr = config.http_addr;
    let sweep_interval = config.channel_sweep_interval;
    let app_state = AppState::new(config, messages, searches);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Sweep channels whose socket died before they unregistered
    let hub = app_state.hub.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            hub.prune_closed().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP + WebSocket server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
