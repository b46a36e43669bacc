//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing backends)
//! - Validate value ranges (ports, connection limits)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over `GatewayConfig`
//! - Runs before config is accepted into the system

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A route has an empty name.
    EmptyRouteName,
    /// Two routes share the same name.
    DuplicateRoute(String),
    /// A route has an empty pattern.
    EmptyPattern(String),
    /// A route pattern does not start with '/'.
    PatternNotRooted(String),
    /// A route references a backend that is not defined.
    UnknownBackend { route: String, backend: String },
    /// A landing route is marked upgrade-capable.
    UpgradeWithoutBackend(String),
    /// Two backends share the same name.
    DuplicateBackend(String),
    /// A backend has an empty host.
    EmptyHost(String),
    /// A backend has port zero.
    InvalidPort(String),
    /// The listener connection limit is zero.
    ZeroMaxConnections,
    /// The health probe references a backend that is not defined.
    UnknownProbeBackend(String),
    /// The landing page path is empty.
    EmptyLandingPage,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyRouteName => write!(f, "route with empty name"),
            ValidationError::DuplicateRoute(name) => write!(f, "duplicate route '{}'", name),
            ValidationError::EmptyPattern(route) => {
                write!(f, "route '{}' has an empty pattern", route)
            }
            ValidationError::PatternNotRooted(route) => {
                write!(f, "route '{}' pattern must start with '/'", route)
            }
            ValidationError::UnknownBackend { route, backend } => {
                write!(f, "route '{}' references unknown backend '{}'", route, backend)
            }
            ValidationError::UpgradeWithoutBackend(route) => {
                write!(f, "route '{}' enables upgrades without a backend", route)
            }
            ValidationError::DuplicateBackend(name) => write!(f, "duplicate backend '{}'", name),
            ValidationError::EmptyHost(backend) => {
                write!(f, "backend '{}' has an empty host", backend)
            }
            ValidationError::InvalidPort(backend) => {
                write!(f, "backend '{}' has port 0", backend)
            }
            ValidationError::ZeroMaxConnections => {
                write!(f, "listener max_connections must be greater than 0")
            }
            ValidationError::UnknownProbeBackend(backend) => {
                write!(f, "health probe references unknown backend '{}'", backend)
            }
            ValidationError::EmptyLandingPage => write!(f, "landing page_path is empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let mut backend_names = Vec::new();
    for backend in &config.backends {
        if backend_names.contains(&backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.name.clone()));
        } else {
            backend_names.push(backend.name.as_str());
        }
        if backend.host.is_empty() {
            errors.push(ValidationError::EmptyHost(backend.name.clone()));
        }
        if backend.port == 0 {
            errors.push(ValidationError::InvalidPort(backend.name.clone()));
        }
    }

    let mut route_names = Vec::new();
    for route in &config.routes {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyRouteName);
        } else if route_names.contains(&route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        } else {
            route_names.push(route.name.as_str());
        }

        if route.pattern.is_empty() {
            errors.push(ValidationError::EmptyPattern(route.name.clone()));
        } else if !route.pattern.starts_with('/') {
            errors.push(ValidationError::PatternNotRooted(route.name.clone()));
        }

        match &route.backend {
            Some(backend) if !backend_names.contains(&backend.as_str()) => {
                errors.push(ValidationError::UnknownBackend {
                    route: route.name.clone(),
                    backend: backend.clone(),
                });
            }
            Some(_) => {}
            None => {
                if route.upgrade {
                    errors.push(ValidationError::UpgradeWithoutBackend(route.name.clone()));
                }
            }
        }
    }

    if config.health_probe.enabled
        && !backend_names.contains(&config.health_probe.backend.as_str())
    {
        errors.push(ValidationError::UnknownProbeBackend(
            config.health_probe.backend.clone(),
        ));
    }

    if config.landing.page_path.is_empty() {
        errors.push(ValidationError::EmptyLandingPage);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
