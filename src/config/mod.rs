//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → route table compiled once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults reproducing the production route table,
//!   so the gateway runs with no config file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BackendConfig;
pub use schema::GatewayConfig;
pub use schema::HealthProbeConfig;
pub use schema::LandingConfig;
pub use schema::ListenerConfig;
pub use schema::MatchKind;
pub use schema::ObservabilityConfig;
pub use schema::RouteConfig;
