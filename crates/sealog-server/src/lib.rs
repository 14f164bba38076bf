//! # sealog-server
//!
//! HTTP endpoints for a trusted authority:
//!
//! ```text
//! POST /api/v1/logs/register         InitCommitment
//! POST /api/v1/logs/open             OpenMessage
//! POST /api/v1/logs/close            CloseMessage
//! POST /api/v1/logs/{log_id}/verify  record list → {verified, error_message}
//! ```
//!
//! Every endpoint accepts both wire encodings, selected on content type:
//! `application/x-protobuf` / `application/protobuf` bodies are decoded
//! as protobuf, anything else as the native stream encoding.
//!
//! Status mapping: malformed bodies and closures for unknown logs are
//! 400; a negative verification verdict is NOT an HTTP error — it is a
//! 200 carrying `verified = false` and a reason; 500 is reserved for
//! internal failures.

pub mod handlers;

use std::sync::{Arc, RwLock};

use axum::routing::post;
use axum::Router;

use sealog_protocol::TrustedAuthority;

/// Shared server state: the authority behind a reader/writer lock.
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<RwLock<TrustedAuthority>>,
}

impl AppState {
    pub fn new(authority: Arc<RwLock<TrustedAuthority>>) -> Self {
        Self { authority }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(RwLock::new(TrustedAuthority::new())))
    }
}

/// Build the full router. Method routing answers 405 for anything that
/// is not a POST to these paths.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/logs/register", post(handlers::register_log))
        .route("/api/v1/logs/open", post(handlers::open_log))
        .route("/api/v1/logs/close", post(handlers::close_log))
        .route("/api/v1/logs/{log_id}/verify", post(handlers::verify_log))
        .with_state(state)
}

/// Serve the router on `addr` until the process exits.
pub async fn serve(addr: std::net::SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "trusted authority listening");
    axum::serve(listener, build_router(state)).await
}
