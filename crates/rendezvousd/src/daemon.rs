//! Server and eviction-sweep tasks, run until a shutdown future resolves.

use std::future::Future;

use anyhow::{anyhow, Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use rendezvous_api::ApiState;
use rendezvous_core::config::{RegistryConfig, RendezvousConfig};
use rendezvous_services::{expiry_loop, ClientRegistry};

use crate::tls;

/// Spawn the stale-entry sweep, or a task that never finishes when
/// eviction is disabled.
pub fn spawn_expiry(config: &RegistryConfig, registry: ClientRegistry) -> JoinHandle<Result<()>> {
    match config.eviction_interval() {
        Some(interval) => {
            let threshold = config.eviction_threshold();
            tracing::info!(
                interval_secs = interval.as_secs(),
                threshold_secs = threshold.as_secs(),
                "idle eviction enabled"
            );
            tokio::spawn(expiry_loop(registry, interval, threshold))
        }
        None => {
            tracing::warn!("idle eviction disabled");
            tokio::spawn(std::future::pending::<Result<()>>())
        }
    }
}

/// Serve the relay on `listener` until `shutdown` resolves.
///
/// Returns once the server has drained. A server or sweep task that exits
/// on its own is an error.
pub async fn run<F>(
    config: &RendezvousConfig,
    registry: ClientRegistry,
    listener: TcpListener,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let state = ApiState::new(registry.clone(), config.registry.outbound_queue);
    let cors = rendezvous_api::cors_layer(&config.cors.allowed_origin)?;
    let app = rendezvous_api::app(state, cors);

    let mut server_task = match config.tls.paths() {
        Some((cert, key)) => {
            let acceptor = tls::load_acceptor(cert, key).context("failed to load TLS material")?;
            tracing::info!(%addr, cert = %cert.display(), "listening (wss)");
            tokio::spawn(rendezvous_api::serve(
                tls::TlsListener::new(listener, acceptor),
                app,
                shutdown,
            ))
        }
        None => {
            tracing::info!(%addr, "listening (ws)");
            tokio::spawn(rendezvous_api::serve(listener, app, shutdown))
        }
    };
    let mut expiry_task = spawn_expiry(&config.registry, registry);

    let result = tokio::select! {
        r = &mut server_task => match r {
            Ok(served) => served.context("server failed"),
            Err(e) => Err(anyhow!(e).context("server task panicked")),
        },
        r = &mut expiry_task => {
            server_task.abort();
            match r {
                Ok(Ok(())) => Err(anyhow!("expiry task exited")),
                Ok(Err(e)) => Err(e.context("expiry task failed")),
                Err(e) => Err(anyhow!(e).context("expiry task panicked")),
            }
        }
    };

    expiry_task.abort();
    result
}
