//! rendezvousd: signaling relay daemon.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use rendezvous_core::config::RendezvousConfig;
use rendezvous_services::ClientRegistry;

mod daemon;
mod tls;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = RendezvousConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = RendezvousConfig::load().context("failed to load config")?;

    let addr: SocketAddr = format!("{}:{}", config.network.bind_addr, config.network.port)
        .parse()
        .with_context(|| format!("invalid bind address {}", config.network.bind_addr))?;
    tracing::info!(%addr, "rendezvousd starting");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // ── Shutdown signal ──────────────────────────────────────────────────────
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for ctrl-c, running until killed");
                std::future::pending::<()>().await;
            }
        }
    };

    let registry = ClientRegistry::new();
    let result = daemon::run(&config, registry.clone(), listener, shutdown).await;

    tracing::info!(remaining = registry.len(), "rendezvousd stopped");
    result
}
