//! Landing page delivery.
//!
//! The gateway fronts a small static landing page for `/` and
//! `/index.html`; everything else is proxied. The page is read from
//! disk on every request so edits show up without a restart.

use std::path::PathBuf;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Serves the configured landing page file.
#[derive(Debug, Clone)]
pub struct LandingPage {
    path: PathBuf,
}

impl LandingPage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Render the page, or a 500 if the file cannot be read.
    pub async fn render(&self) -> Response {
        match tokio::fs::read(&self.path).await {
            Ok(contents) => (
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                contents,
            )
                .into_response(),
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %error,
                    "Failed to read landing page"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, "Landing page unavailable").into_response()
            }
        }
    }
}
