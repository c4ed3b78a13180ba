//! Registered identities.

use anyhow::Result;
use serde::Deserialize;

use super::http::get_json;

#[derive(Deserialize)]
struct UsersResponse {
    users: Vec<String>,
}

pub async fn cmd_users(base: &str) -> Result<()> {
    let resp: UsersResponse = get_json(&format!("{}/get_users", base.trim_end_matches('/'))).await?;

    if resp.users.is_empty() {
        println!("No registered users.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Registered Users ({})", resp.users.len());
    println!("═══════════════════════════════════════");
    for user in &resp.users {
        println!("  {}", user);
    }

    Ok(())
}
