//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Startup probe (probe.rs):
//!     Wait out the startup delay
//!     → GET the configured backend's health endpoint
//!     → Log the outcome
//!     → Optionally repeat on an interval
//! ```
//!
//! # Design Decisions
//! - One probe target: the API gateway backend fronts the rest of the
//!   deployment, so its health stands in for the whole stack
//! - Probe results are logged, never routed on

pub mod probe;

pub use probe::HealthProbe;
