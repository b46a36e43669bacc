//! Startup health probe.
//!
//! # Responsibilities
//! - Wait out the configured startup delay
//! - Probe the configured backend's health endpoint once
//! - Optionally keep probing on an interval
//!
//! The probe is advisory. Routing never consults its result; a failing
//! backend still receives traffic and surfaces errors per request.

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::{GatewayConfig, HealthProbeConfig};

pub struct HealthProbe {
    config: HealthProbeConfig,
    authority: String,
    client: Client<HttpConnector, Body>,
}

impl HealthProbe {
    /// Build the probe from validated configuration.
    ///
    /// Returns `None` when probing is disabled or the named backend is
    /// not configured.
    pub fn from_config(config: &GatewayConfig) -> Option<Self> {
        if !config.health_probe.enabled {
            tracing::info!("Health probe disabled");
            return None;
        }

        let backend = config
            .backends
            .iter()
            .find(|b| b.name == config.health_probe.backend)?;

        let client = Client::builder(TokioExecutor::new()).build_http();
        Some(Self {
            config: config.health_probe.clone(),
            authority: format!("{}:{}", backend.host, backend.port),
            client,
        })
    }

    /// Run the probe until done or until shutdown.
    ///
    /// Without a configured interval this is a single delayed probe,
    /// matching how the gateway announces backend readiness at startup.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let delay = Duration::from_millis(self.config.startup_delay_ms);
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = shutdown.recv() => return,
        }

        self.probe_once().await;

        let Some(interval_secs) = self.config.interval_secs else {
            return;
        };

        let mut ticker = time::interval(Duration::from_secs(interval_secs));
        // The first tick fires immediately and we just probed.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health probe received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn probe_once(&self) {
        let uri_string = format!("http://{}{}", self.authority, self.config.path);

        let request = match Request::builder()
            .method("GET")
            .uri(uri_string)
            .header("user-agent", "prefix-gateway-health-probe")
            .body(Body::empty())
        {
            Ok(request) => request,
            Err(error) => {
                tracing::error!(error = %error, "Failed to build health probe request");
                return;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => {
                tracing::info!(
                    authority = %self.authority,
                    status = %response.status(),
                    "Backend health probe passed"
                );
            }
            Ok(Ok(response)) => {
                tracing::warn!(
                    authority = %self.authority,
                    status = %response.status(),
                    "Backend health probe returned non-success status"
                );
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    authority = %self.authority,
                    error = %error,
                    "Backend health probe failed: connection error"
                );
            }
            Err(_) => {
                tracing::warn!(
                    authority = %self.authority,
                    "Backend health probe failed: timeout"
                );
            }
        }
    }
}
