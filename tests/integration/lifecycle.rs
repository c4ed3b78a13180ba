use crate::*;

use rendezvous_services::expiry_loop;

/// /get_users lists every registered identity.
#[tokio::test]
async fn test_get_users_lists_registered_identities() -> Result<()> {
    let relay = Relay::start().await?;
    assert_eq!(relay.users().await?, serde_json::json!({ "users": [] }));

    let _tim = relay.register("Tim").await?;
    let _jim = relay.register("Jim").await?;

    assert_eq!(
        relay.users().await?,
        serde_json::json!({ "users": ["Jim", "Tim"] })
    );
    Ok(())
}

/// Connections that never register do not appear in /get_users.
#[tokio::test]
async fn test_unregistered_connection_is_not_listed() -> Result<()> {
    let relay = Relay::start().await?;
    let _anon = relay.connect().await?;
    tokio::time::sleep(QUIET).await;
    assert_eq!(relay.users().await?["users"], serde_json::json!([]));
    Ok(())
}

/// Closing a registered connection removes its identity, and later
/// messages to it are dropped as unknown-recipient.
#[tokio::test]
async fn test_disconnect_removes_identity() -> Result<()> {
    let relay = Relay::start().await?;
    let mut tim = relay.register("Tim").await?;
    let jim = relay.register("Jim").await?;

    jim.close().await?;
    let registry = relay.registry.clone();
    wait_until(move || !registry.contains("Jim")).await?;
    assert_eq!(relay.users().await?["users"], serde_json::json!(["Tim"]));

    tim.send_text(r#"{"type":"offer","to":"Jim","sdp":"late"}"#).await?;
    tim.expect_silence().await?;
    assert!(relay.registry.contains("Tim"));
    Ok(())
}

/// Dropping the TCP connection without a close handshake also cleans up.
#[tokio::test]
async fn test_abrupt_disconnect_removes_identity() -> Result<()> {
    let relay = Relay::start().await?;
    let tim = relay.register("Tim").await?;
    drop(tim);

    let registry = relay.registry.clone();
    wait_until(move || registry.is_empty()).await?;
    Ok(())
}

/// A renamed connection answers to its new name; on close every name it
/// still holds is released.
#[tokio::test]
async fn test_rename_then_disconnect() -> Result<()> {
    let relay = Relay::start().await?;
    let mut tim = relay.register("Tim").await?;
    let mut jim = relay.register("Jim").await?;

    tim.register("Timothy").await?;
    let registry = relay.registry.clone();
    wait_until(move || registry.contains("Timothy")).await?;

    let offer = r#"{"type":"offer","to":"Timothy"}"#;
    jim.send_text(offer).await?;
    assert_eq!(tim.expect_text().await?, offer);

    tim.close().await?;
    let registry = relay.registry.clone();
    wait_until(move || registry.identities() == ["Jim"]).await?;
    assert_eq!(relay.users().await?["users"], serde_json::json!(["Jim"]));

    jim.send_text(r#"{"type":"offer","to":"Tim"}"#).await?;
    jim.expect_silence().await?;
    Ok(())
}

/// An idle registered client is evicted by the sweep and disconnected,
/// while an active one survives.
#[tokio::test]
async fn test_idle_client_is_evicted() -> Result<()> {
    let relay = Relay::start().await?;
    let sweep = tokio::spawn(expiry_loop(
        relay.registry.clone(),
        Duration::from_millis(100),
        Duration::from_millis(600),
    ));

    let mut idle = relay.register("Idle").await?;
    let mut busy = relay.register("Busy").await?;

    let deadline = tokio::time::Instant::now() + Duration::from_millis(1500);
    while tokio::time::Instant::now() < deadline {
        busy.send_text(r#"{"type":"ice-candidate","to":"Nobody"}"#).await?;
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    assert!(!relay.registry.contains("Idle"));
    assert!(relay.registry.contains("Busy"));
    assert_eq!(relay.users().await?["users"], serde_json::json!(["Busy"]));
    assert!(idle.closed_by_relay(SETTLE).await, "evicted client should be disconnected");
    busy.expect_silence().await?;

    sweep.abort();
    Ok(())
}

/// CORS is applied to the HTTP side.
#[tokio::test]
async fn test_get_users_allows_cross_origin() -> Result<()> {
    let relay = Relay::start().await?;
    let resp = reqwest::Client::new()
        .get(relay.http_url("/get_users"))
        .header("Origin", "https://call.example")
        .send()
        .await?;
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    Ok(())
}
