//! Prefix-routing HTTP gateway library.

pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod tunnel;
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
