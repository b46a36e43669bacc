//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → http::head (request head sniffing, tunnel classification)
//!     → rewind.rs (replay sniffed bytes for the HTTP stack)
//!     → Hand off to HTTP layer or tunnel
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - The sniffed head bytes are never lost; plain HTTP connections get
//!   them replayed through [`Rewind`]

pub mod listener;
pub mod rewind;

pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use rewind::Rewind;
