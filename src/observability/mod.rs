//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → structured log events (tracing, initialized in main)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The request id appears on log events for both proxy legs
//! - Metrics are cheap atomic updates behind the facade and optional:
//!   without the exporter installed every record call is a no-op

pub mod metrics;
