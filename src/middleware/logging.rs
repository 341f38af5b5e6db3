//! Request logging middleware.
//!
//! One structured line per request: method, path, status and latency.

use axum::{body::Body, extract::ConnectInfo, http::Request, middleware::Next, response::Response};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, warn, Instrument};

/// 5xx responses log at WARN, everything else at INFO. Client errors also carry
/// the peer address when the server runs with connect info.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_owned();

    // Health probes would drown everything else out.
    if path == "/health" {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string());

    let started = Instant::now();
    let response = next
        .run(request)
        .instrument(tracing::info_span!("request", %method, %path))
        .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status();
    let peer = peer.as_deref().unwrap_or("-");

    if status.is_server_error() {
        warn!(%method, %path, status = status.as_u16(), elapsed_ms, peer, "request errored");
    } else if status.is_client_error() {
        info!(%method, %path, status = status.as_u16(), elapsed_ms, peer, "request rejected");
    } else {
        info!(%method, %path, status = status.as_u16(), elapsed_ms, "request served");
    }

    response
}
