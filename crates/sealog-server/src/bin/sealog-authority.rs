//! Standalone trusted-authority server.
//!
//! Serves the `/api/v1/logs/*` endpoints over plain HTTP; TLS termination
//! belongs to the deployment in front of it.

use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sealog_server::{serve, AppState};

/// Trusted authority for forward-secure dual-chain logs.
#[derive(Parser)]
#[command(name = "sealog-authority")]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8443")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    serve(cli.listen, AppState::default()).await
}
