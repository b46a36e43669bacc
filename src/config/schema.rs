//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
///
/// The default value reproduces the production wiring: a landing page on `/`
/// and `/index.html`, the chat app under `/chat`, the terminal under
/// `/terminal`, and the API gateway under `/v1/`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Ordered route definitions. The first matching route wins.
    pub routes: Vec<RouteConfig>,

    /// Backend server definitions referenced by routes.
    pub backends: Vec<BackendConfig>,

    /// Landing page settings.
    pub landing: LandingConfig,

    /// Startup health probe settings.
    pub health_probe: HealthProbeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            routes: default_routes(),
            backends: default_backends(),
            landing: LandingConfig::default(),
            health_probe: HealthProbeConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// How a route pattern is compared against the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Match the exact path only.
    Exact,
    /// Match any path beginning with the pattern.
    #[default]
    Prefix,
}

/// Route configuration mapping a path pattern to a destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path pattern to match. Matching is against the path only, the query
    /// string never participates.
    pub pattern: String,

    /// Match kind. Prefix routes match any path starting with `pattern`.
    #[serde(default)]
    pub kind: MatchKind,

    /// Backend name to forward to. `None` serves the landing page.
    #[serde(default)]
    pub backend: Option<String>,

    /// Strip the matched pattern from the forwarded path.
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: bool,

    /// Allow protocol upgrades on this route to be tunneled to the backend.
    #[serde(default)]
    pub upgrade: bool,
}

fn default_strip_prefix() -> bool {
    true
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier, referenced from routes.
    pub name: String,

    /// Backend host name or address.
    pub host: String,

    /// Backend port.
    pub port: u16,
}

/// Landing page configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LandingConfig {
    /// Path to the HTML file served for `/` and `/index.html`.
    pub page_path: String,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            page_path: "ui/index.html".to_string(),
        }
    }
}

/// Startup health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthProbeConfig {
    /// Enable the probe.
    pub enabled: bool,

    /// Name of the backend to probe.
    pub backend: String,

    /// Path to request on the backend.
    pub path: String,

    /// Delay after startup before the first probe, in milliseconds.
    pub startup_delay_ms: u64,

    /// Repeat interval in seconds. `None` probes exactly once.
    pub interval_secs: Option<u64>,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "gateway".to_string(),
            path: "/health".to_string(),
            startup_delay_ms: 1_000,
            interval_secs: None,
            timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            name: "home".to_string(),
            pattern: "/".to_string(),
            kind: MatchKind::Exact,
            backend: None,
            strip_prefix: false,
            upgrade: false,
        },
        RouteConfig {
            name: "index".to_string(),
            pattern: "/index.html".to_string(),
            kind: MatchKind::Exact,
            backend: None,
            strip_prefix: false,
            upgrade: false,
        },
        RouteConfig {
            name: "chat".to_string(),
            pattern: "/chat".to_string(),
            kind: MatchKind::Prefix,
            backend: Some("chat".to_string()),
            strip_prefix: true,
            upgrade: false,
        },
        RouteConfig {
            name: "terminal".to_string(),
            pattern: "/terminal".to_string(),
            kind: MatchKind::Prefix,
            backend: Some("terminal".to_string()),
            strip_prefix: true,
            upgrade: true,
        },
        // The API gateway keeps the full original path, including the
        // /v1/ segment the backend expects.
        RouteConfig {
            name: "gateway".to_string(),
            pattern: "/v1/".to_string(),
            kind: MatchKind::Prefix,
            backend: Some("gateway".to_string()),
            strip_prefix: false,
            upgrade: false,
        },
    ]
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            name: "chat".to_string(),
            host: "localhost".to_string(),
            port: 3000,
        },
        BackendConfig {
            name: "terminal".to_string(),
            host: "localhost".to_string(),
            port: 7681,
        },
        BackendConfig {
            name: "gateway".to_string(),
            host: "localhost".to_string(),
            port: 8001,
        },
    ]
}
