//! Deskbot - terminal client for the AI desktop robot chat server.
//!
//! Architecture:
//! - The server owns sessions and messages; this client only reads and writes
//!   them through its HTTP API
//! - A single controller owns the session view model, which keeps the
//!   transcript consistent with the server while calls are in flight
//! - The active session id and the last session list are kept in a local
//!   state file so they survive restarts

mod api;
mod cli;
mod config;
mod models;
mod session;
mod store;
mod view;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing(&config.log_level);
    execute(cli, config).await
}

/// Log to stderr so diagnostics never interleave with the transcript.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!(
            "WARN: DESKBOT_LOG='{level}' is not a valid filter ({e}); falling back to 'warn'"
        );
        EnvFilter::new("warn")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
