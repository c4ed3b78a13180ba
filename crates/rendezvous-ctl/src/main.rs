//! rendezvous-ctl: command-line client for the rendezvous relay.

use anyhow::{Context, Result};

mod cmd;

const DEFAULT_URL: &str = "http://127.0.0.1:3000";

fn print_usage() {
    println!("Usage: rendezvous-ctl [--url <url>] <command>");
    println!();
    println!("Commands:");
    println!("  users                              List registered identities");
    println!("  listen <name>                      Register as <name> and print relayed frames");
    println!("  send <name> <to> <type> [fields]   Register as <name> and send one frame");
    println!("                                     ([fields] is a JSON object merged into the frame)");
    println!();
    println!("Options:");
    println!("  --url <url>   Relay base URL (default: {}, env RENDEZVOUS_URL)", DEFAULT_URL);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --url option
    let mut url = std::env::var("RENDEZVOUS_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--url" {
            i += 1;
            url = args.get(i).context("--url requires a value")?.clone();
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["users"] | []                       => cmd::users::cmd_users(&url).await,
        ["listen", name]                     => cmd::signal::cmd_listen(&url, name).await,
        ["send", name, to, kind]             => cmd::signal::cmd_send(&url, name, to, kind, None).await,
        ["send", name, to, kind, fields]     => cmd::signal::cmd_send(&url, name, to, kind, Some(*fields)).await,
        ["help"] | ["--help"] | ["-h"]       => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
