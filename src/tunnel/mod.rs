//! Upgrade tunnel subsystem.
//!
//! # Data Flow
//! ```text
//! Sniffed upgrade request (http::head)
//!     → handshake.rs (rebuild the head for the backend)
//!     → TCP connect to the route's backend
//!     → replay handshake + any preread bytes
//!     → relay.rs (opaque byte splice until either side closes)
//! ```
//!
//! # Design Decisions
//! - The gateway never speaks WebSocket; nothing past the initial head
//!   is validated, frames are relayed as opaque bytes
//! - Tunnel failures never produce an HTTP response; both sockets are
//!   torn down and the client is expected to retry

pub mod handshake;
pub mod relay;

pub use handshake::UpgradeHandshake;
pub use relay::{splice, RelayOutcome};

use std::io;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::http::head::SniffedRequest;
use crate::observability::metrics;
use crate::routing::UpstreamTarget;

/// Errors that end a tunnel attempt.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The backend did not accept a TCP connection.
    #[error("failed to connect to upstream: {0}")]
    Connect(io::Error),

    /// Writing the rebuilt upgrade request upstream failed.
    #[error("failed to send upgrade handshake: {0}")]
    Handshake(io::Error),

    /// The relay ended with an IO error rather than a clean close.
    #[error("tunnel relay failed: {0}")]
    Relay(io::Error),
}

/// Run one upgrade tunnel to completion.
///
/// Connects to the target backend, replays the rebuilt handshake plus
/// any bytes the head sniffer read past the blank line, then splices
/// the two sockets until either side closes.
pub async fn run(
    client: TcpStream,
    sniffed: SniffedRequest,
    route_name: &str,
    target: &UpstreamTarget,
) -> Result<RelayOutcome, TunnelError> {
    let authority = target.authority();
    let rewritten = target.rewrite_target(&sniffed.head.target);

    tracing::debug!(
        route = route_name,
        upstream = %authority,
        target = %rewritten,
        "Opening upgrade tunnel"
    );

    let mut upstream = TcpStream::connect(&authority)
        .await
        .map_err(TunnelError::Connect)?;
    let _ = upstream.set_nodelay(true);
    let _ = client.set_nodelay(true);

    let rebuilt = UpgradeHandshake::new(&sniffed.head, rewritten, authority);
    upstream
        .write_all(&rebuilt.to_bytes())
        .await
        .map_err(TunnelError::Handshake)?;

    // Frames the client pipelined behind the handshake must arrive
    // before anything it sends after the splice starts.
    let preread = sniffed.preread();
    if !preread.is_empty() {
        upstream
            .write_all(preread)
            .await
            .map_err(TunnelError::Handshake)?;
    }
    upstream.flush().await.map_err(TunnelError::Handshake)?;

    metrics::record_tunnel_opened(route_name);

    let mut outcome = relay::splice(client, upstream).await;
    metrics::record_tunnel_closed(route_name, &outcome);

    tracing::debug!(
        route = route_name,
        client_to_upstream = outcome.client_to_upstream,
        upstream_to_client = outcome.upstream_to_client,
        "Tunnel closed"
    );

    if let Some(error) = outcome.error.take() {
        if is_benign_teardown(&error) {
            tracing::debug!(route = route_name, error = %error, "Tunnel ended with reset");
        } else {
            return Err(TunnelError::Relay(error));
        }
    }

    Ok(outcome)
}

/// Abrupt closes that routinely end long-lived tunnels.
fn is_benign_teardown(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}
