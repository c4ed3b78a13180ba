//! WebSocket signaling endpoint with one supervised routing loop per connection.
//!
//! The reader half feeds every inbound frame to the `MessageRouter`. The
//! writer half drains the connection's bounded outbound queue. Either half
//! ending, or the connection's cancellation token firing (eviction, queue
//! overflow), tears the whole connection down and releases its identity.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rendezvous_services::{ConnectionContext, ConnectionId, PeerHandle};

use super::ApiState;

/// GET /: upgrade to a signaling WebSocket.
pub async fn handle_signal(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| supervise(socket, state))
}

/// Drive one connection from accept to close.
pub async fn supervise(socket: WebSocket, state: ApiState) {
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(state.outbound_queue);
    let closer = CancellationToken::new();
    let mut ctx = ConnectionContext::new(PeerHandle::new(
        ConnectionId::next(),
        outbound_tx,
        closer.clone(),
    ));
    tracing::debug!(conn = %ctx.id(), "signaling connection accepted");

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, outbound_rx, closer.clone()));

    loop {
        tokio::select! {
            _ = closer.cancelled() => {
                tracing::debug!(conn = %ctx.id(), "connection reset by relay");
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    state.router.handle(&mut ctx, text.as_str());
                }
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        state.router.handle(&mut ctx, text);
                    }
                    Err(_) => {
                        tracing::warn!(conn = %ctx.id(), len = bytes.len(), "non-UTF-8 binary frame dropped");
                    }
                },
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(conn = %ctx.id(), "peer closed connection");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(conn = %ctx.id(), error = %e, "websocket error");
                    break;
                }
            }
        }
    }

    ctx.close(&state.registry);
    if let Err(e) = writer.await {
        tracing::warn!(error = %e, "writer task failed");
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    closer: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = closer.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(Message::Text(frame.into())).await {
                        tracing::debug!(error = %e, "send to closed transport");
                        break;
                    }
                }
                None => break,
            }
        }
    }
    // Stop the reader too when the transport refused a write.
    closer.cancel();
    let _ = sink.send(Message::Close(None)).await;
}
