//! Rendezvous integration test harness.
//!
//! Each test starts its own relay in-process on an ephemeral loopback port
//! and talks to it over real WebSocket and HTTP connections:
//!
//!   cargo test --test integration
//!
//! Registration has no acknowledgement on the wire, so tests wait on the
//! shared registry (or `/get_users`) before relying on a binding.

mod lifecycle;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

use rendezvous_api::ApiState;
use rendezvous_services::ClientRegistry;

// ── Harness ───────────────────────────────────────────────────────────────────

/// How long a test waits for something that should happen.
pub const SETTLE: Duration = Duration::from_secs(5);
/// How long a test listens to conclude that nothing was delivered.
pub const QUIET: Duration = Duration::from_millis(300);

pub type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// A relay running inside the test process.
pub struct Relay {
    pub addr: SocketAddr,
    pub registry: ClientRegistry,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Relay {
    pub async fn start() -> Result<Self> {
        Self::start_with_queue(64).await
    }

    pub async fn start_with_queue(outbound_queue: usize) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind loopback listener")?;
        let addr = listener.local_addr()?;

        let registry = ClientRegistry::new();
        let app = rendezvous_api::app(
            ApiState::new(registry.clone(), outbound_queue),
            rendezvous_api::cors_layer("*")?,
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(rendezvous_api::serve(listener, app, async move {
            let _ = shutdown_rx.await;
        }));

        Ok(Self {
            addr,
            registry,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn connect(&self) -> Result<Client> {
        let (socket, _) = tokio_tungstenite::connect_async(self.ws_url())
            .await
            .context("websocket connect failed")?;
        Ok(Client { socket })
    }

    /// Connect, register as `name`, and wait until the relay has bound it.
    pub async fn register(&self, name: &str) -> Result<Client> {
        let mut client = self.connect().await?;
        client.register(name).await?;
        let registry = self.registry.clone();
        let owned = name.to_string();
        wait_until(move || registry.contains(&owned)).await?;
        Ok(client)
    }

    pub async fn users(&self) -> Result<serde_json::Value> {
        let resp = reqwest::get(self.http_url("/get_users"))
            .await
            .context("GET /get_users failed")?;
        if !resp.status().is_success() {
            bail!("GET /get_users returned {}", resp.status());
        }
        resp.json().await.context("invalid /get_users body")
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// One signaling endpoint.
pub struct Client {
    pub socket: Socket,
}

impl Client {
    pub async fn send_text(&mut self, frame: &str) -> Result<()> {
        self.socket
            .send(Message::Text(frame.to_string().into()))
            .await
            .context("send failed")
    }

    pub async fn register(&mut self, name: &str) -> Result<()> {
        let frame = serde_json::json!({ "type": "register", "name": name }).to_string();
        self.send_text(&frame).await
    }

    /// Next text frame, or `None` if nothing arrives within `wait`.
    pub async fn recv_text(&mut self, wait: Duration) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let next = tokio::time::timeout_at(deadline, self.socket.next()).await;
            match next {
                Err(_) => return Ok(None),
                Ok(Some(Ok(Message::Text(text)))) => return Ok(Some(text.as_str().to_string())),
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) => bail!("connection closed"),
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(e))) => return Err(e).context("receive failed"),
            }
        }
    }

    pub async fn expect_text(&mut self) -> Result<String> {
        self.recv_text(SETTLE)
            .await?
            .context("expected a frame, got nothing")
    }

    /// Assert nothing arrives for a short while.
    pub async fn expect_silence(&mut self) -> Result<()> {
        match self.recv_text(QUIET).await? {
            None => Ok(()),
            Some(frame) => bail!("unexpected frame: {frame}"),
        }
    }

    /// True once the relay has closed this connection.
    pub async fn closed_by_relay(&mut self, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            match tokio::time::timeout_at(deadline, self.socket.next()).await {
                Err(_) => return false,
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await.context("close failed")
    }
}

/// Poll `cond` until it holds or `SETTLE` elapses.
pub async fn wait_until(cond: impl Fn() -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + SETTLE;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("condition not met within {:?}", SETTLE)
}
