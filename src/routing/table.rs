//! Route table compilation and lookup.
//!
//! # Responsibilities
//! - Compile the configured route list into an immutable table
//! - Resolve backend references to concrete host:port targets
//! - Match request paths in declaration order, first match wins
//! - Rewrite forwarded targets according to the route's strip rule
//!
//! # Design Decisions
//! - Matching is against the path only; the query string rides along
//!   untouched through the rewrite
//! - Prefix matching is plain byte-prefix, so `/chatter` matches `/chat`
//! - A stripped target is never empty: the rewrite falls back to `/`

use crate::config::schema::{GatewayConfig, MatchKind};
use crate::config::validation::ValidationError;

/// A resolved upstream destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Backend host name or address.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// Number of leading bytes stripped from the forwarded target.
    pub strip_prefix_len: usize,
    /// Whether protocol upgrades may be tunneled to this backend.
    pub supports_upgrade: bool,
}

impl UpstreamTarget {
    /// The `host:port` authority for the Host header and connects.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rewrite a request target (path plus optional query) for this backend.
    ///
    /// Strips `strip_prefix_len` bytes and substitutes `/` when nothing is
    /// left. A remainder that begins with the query keeps it behind `/`.
    pub fn rewrite_target(&self, target: &str) -> String {
        let rest = target.get(self.strip_prefix_len..).unwrap_or("");
        if rest.is_empty() {
            "/".to_string()
        } else if rest.starts_with('?') {
            format!("/{}", rest)
        } else {
            rest.to_string()
        }
    }
}

/// Where a matched route sends the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Serve the landing page from disk.
    Landing,
    /// Forward to an upstream backend.
    Upstream(UpstreamTarget),
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Landing => write!(f, "landing page"),
            Destination::Upstream(target) => write!(f, "{}", target.authority()),
        }
    }
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    /// Route identifier for logging/metrics.
    pub name: String,
    /// How the pattern is compared against the path.
    pub kind: MatchKind,
    /// Path pattern.
    pub pattern: String,
    /// Destination for matching requests.
    pub destination: Destination,
}

impl Route {
    /// Returns true if the request path matches this route.
    pub fn matches(&self, path: &str) -> bool {
        match self.kind {
            MatchKind::Exact => path == self.pattern,
            MatchKind::Prefix => path.starts_with(&self.pattern),
        }
    }
}

/// Ordered, immutable route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile the table from configuration, resolving backend references.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ValidationError> {
        let mut routes = Vec::with_capacity(config.routes.len());

        for route in &config.routes {
            let destination = match &route.backend {
                None => Destination::Landing,
                Some(backend_name) => {
                    let backend = config
                        .backends
                        .iter()
                        .find(|b| b.name == *backend_name)
                        .ok_or_else(|| ValidationError::UnknownBackend {
                            route: route.name.clone(),
                            backend: backend_name.clone(),
                        })?;

                    Destination::Upstream(UpstreamTarget {
                        host: backend.host.clone(),
                        port: backend.port,
                        strip_prefix_len: if route.strip_prefix {
                            route.pattern.len()
                        } else {
                            0
                        },
                        supports_upgrade: route.upgrade,
                    })
                }
            };

            tracing::info!(
                route = %route.name,
                pattern = %route.pattern,
                kind = ?route.kind,
                destination = %destination,
                "Route registered"
            );

            routes.push(Route {
                name: route.name.clone(),
                kind: route.kind,
                pattern: route.pattern.clone(),
                destination,
            });
        }

        Ok(Self { routes })
    }

    /// Find the first route matching the given path.
    pub fn lookup(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    /// All compiled routes in evaluation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
