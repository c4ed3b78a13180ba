//! Signaling commands: act as a relay client from the terminal.

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tokio_tungstenite::tungstenite::Message;

use super::http::ws_url;

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect_as(base: &str, name: &str) -> Result<Socket> {
    let url = ws_url(base);
    // wss:// needs a process-wide rustls provider. Already installed is fine.
    let _ = tokio_rustls::rustls::crypto::ring::default_provider().install_default();
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to {url}"))?;

    let register = json!({ "type": "register", "name": name }).to_string();
    socket
        .send(Message::Text(register.into()))
        .await
        .context("failed to register")?;
    Ok(socket)
}

/// Build a routable frame from `type`, `to`, and optional extra JSON fields.
pub fn build_frame(kind: &str, to: &str, fields: Option<&str>) -> Result<String> {
    let mut frame = match fields {
        Some(raw) => match serde_json::from_str::<Value>(raw).context("fields must be JSON")? {
            Value::Object(map) => map,
            _ => bail!("fields must be a JSON object"),
        },
        None => Map::new(),
    };
    frame.insert("type".into(), Value::String(kind.to_string()));
    frame.insert("to".into(), Value::String(to.to_string()));
    Ok(Value::Object(frame).to_string())
}

/// Register as `name` and print every frame relayed to it.
pub async fn cmd_listen(base: &str, name: &str) -> Result<()> {
    let mut socket = connect_as(base, name).await?;
    println!("Registered as {name}. Waiting for frames (ctrl-c to stop)...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            msg = socket.next() => match msg {
                Some(Ok(Message::Text(text))) => println!("{}", text.as_str()),
                Some(Ok(Message::Close(_))) | None => {
                    println!("Connection closed by relay.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("connection error"),
            }
        }
    }

    let _ = socket.close(None).await;
    Ok(())
}

/// Register as `name`, send one frame, and disconnect.
pub async fn cmd_send(base: &str, name: &str, to: &str, kind: &str, fields: Option<&str>) -> Result<()> {
    let frame = build_frame(kind, to, fields)?;
    let mut socket = connect_as(base, name).await?;
    socket
        .send(Message::Text(frame.clone().into()))
        .await
        .context("failed to send frame")?;
    let _ = socket.close(None).await;

    println!("✓ Sent as {name}: {frame}");
    Ok(())
}
