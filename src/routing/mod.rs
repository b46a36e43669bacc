//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → table.rs (ordered lookup)
//!     → Return: matched Route (landing page or upstream) or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[] + BackendConfig[]
//!     → resolve backend references
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path (exact and prefix matching only)
//! - Deterministic: same input always matches the same route
//! - First match wins (declaration order)

pub mod table;

pub use table::{Destination, Route, RouteTable, UpstreamTarget};
