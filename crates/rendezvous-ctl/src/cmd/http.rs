//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result};
use serde::Deserialize;

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to rendezvousd at {}; is it running?", url))?
        .error_for_status()
        .context("request rejected")?
        .json::<T>()
        .await
        .context("failed to parse response")
}

/// ws:// or wss:// URL for the signaling endpoint behind an http(s) base.
pub fn ws_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}/")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}/")
    } else {
        format!("{base}/")
    }
}
