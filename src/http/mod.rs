//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener)
//!     → head.rs (sniff and parse the first request head)
//!     → upgrade request? tunnel subsystem takes the raw socket
//!     → otherwise server.rs (Axum router over the rewound stream)
//!         → routing layer picks the destination
//!         → landing.rs (static page) or forward.rs (streamed proxying)
//!     → Response to client
//! ```

pub mod forward;
pub mod head;
pub mod landing;
pub mod request_id;
pub mod server;

pub use server::HttpServer;
