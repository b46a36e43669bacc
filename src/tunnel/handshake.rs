//! Upgrade handshake reconstruction.
//!
//! A tunneled connection starts with the client's original upgrade
//! request, which the gateway must re-send to the chosen backend with
//! the path rewritten and the `Host` header pointing at the backend.
//! Everything else is forwarded verbatim so WebSocket handshake
//! material (`Sec-WebSocket-Key` and friends) survives untouched.

use crate::http::head::{HeaderLine, RequestHead};

/// A rebuilt HTTP/1.1 upgrade request ready to send upstream.
#[derive(Debug, Clone)]
pub struct UpgradeHandshake {
    /// Request method from the sniffed head.
    method: String,
    /// Rewritten request target (path plus query).
    target: String,
    /// Protocol version token from the sniffed head.
    version: String,
    /// All client headers except `Host`, in original order and casing.
    headers: Vec<HeaderLine>,
    /// Backend authority for the replacement `Host` header.
    authority: String,
}

impl UpgradeHandshake {
    /// Build the upstream handshake from a sniffed head.
    ///
    /// `target` is the rewritten request target for the backend and
    /// `authority` its `host:port`.
    pub fn new(head: &RequestHead, target: String, authority: String) -> Self {
        let headers = head
            .headers
            .iter()
            .filter(|h| !h.is("host"))
            .cloned()
            .collect();

        Self {
            method: head.method.clone(),
            target,
            version: head.version.clone(),
            headers,
            authority,
        }
    }

    /// Serialize the handshake as raw HTTP/1.1 head bytes.
    ///
    /// The replacement `Host` header goes last so the relayed headers
    /// keep their original relative order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(self.method.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.target.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.version.as_bytes());
        out.extend_from_slice(b"\r\n");

        for header in &self.headers {
            out.extend_from_slice(header.name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(header.value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }

        out.extend_from_slice(b"Host: ");
        out.extend_from_slice(self.authority.as_bytes());
        out.extend_from_slice(b"\r\n\r\n");
        out
    }
}
