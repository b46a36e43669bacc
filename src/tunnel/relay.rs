//! Bidirectional byte relay for tunneled connections.
//!
//! # Responsibilities
//! - Splice raw bytes between the client and upstream sockets
//! - Tear both directions down as soon as either side ends
//! - Report per-direction byte totals for logging and metrics
//!
//! # Design Decisions
//! - No framing: once the upgrade handshake is on the wire the gateway
//!   never inspects another byte
//! - A shared cancellation token links the two copy directions; the
//!   first EOF or error stops both

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Copy buffer per relay direction.
const RELAY_BUF_BYTES: usize = 8 * 1024;

/// What happened over the lifetime of one tunnel relay.
#[derive(Debug, Default)]
pub struct RelayOutcome {
    /// Bytes relayed from the client to the backend.
    pub client_to_upstream: u64,
    /// Bytes relayed from the backend to the client.
    pub upstream_to_client: u64,
    /// First IO error observed, if the tunnel did not end with EOF.
    pub error: Option<io::Error>,
}

/// Splice bytes between two streams until either side closes or fails.
///
/// Both directions run concurrently on the calling task. When one
/// direction ends, the other is cancelled and both write halves are
/// shut down, so each peer sees the close promptly.
pub async fn splice<C, U>(client: C, upstream: U) -> RelayOutcome
where
    C: AsyncRead + AsyncWrite,
    U: AsyncRead + AsyncWrite,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);
    let stop = CancellationToken::new();

    let ((client_to_upstream, client_err), (upstream_to_client, upstream_err)) = tokio::join!(
        copy_until_stopped(client_read, upstream_write, stop.clone()),
        copy_until_stopped(upstream_read, client_write, stop.clone()),
    );

    RelayOutcome {
        client_to_upstream,
        upstream_to_client,
        error: client_err.or(upstream_err),
    }
}

/// One relay direction. Returns bytes fully written plus any error.
async fn copy_until_stopped<R, W>(
    mut reader: R,
    mut writer: W,
    stop: CancellationToken,
) -> (u64, Option<io::Error>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUF_BYTES];
    let mut total = 0u64;
    let mut error = None;

    loop {
        let n = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            result = reader.read(&mut buf) => match result {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    error = Some(e);
                    break;
                }
            },
        };

        let written = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            result = writer.write_all(&buf[..n]) => result,
        };
        if let Err(e) = written {
            error = Some(e);
            break;
        }
        total += n as u64;
    }

    // Whichever direction finishes first takes the whole tunnel down.
    stop.cancel();
    let _ = writer.shutdown().await;
    (total, error)
}
