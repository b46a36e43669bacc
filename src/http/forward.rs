//! Streaming request forwarder for plain HTTP traffic.
//!
//! # Responsibilities
//! - Rebuild the client request against the matched backend
//! - Stream request and response bodies without buffering
//! - Surface upstream failures for the 502 error contract
//!
//! # Design Decisions
//! - Bodies pass through untouched in both directions; the gateway
//!   never buffers and never retries
//! - All client headers except `Host` are forwarded verbatim,
//!   duplicates included; `Host` is replaced with the backend authority

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::routing::UpstreamTarget;

/// Errors from one forwarding attempt.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The rewritten request could not be constructed.
    #[error("failed to build upstream request: {0}")]
    BuildRequest(#[from] axum::http::Error),

    /// The upstream exchange failed before a response head arrived.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

impl ForwardError {
    /// Innermost cause, exposed to clients in the 502 body.
    pub fn details(&self) -> String {
        let mut source: &dyn std::error::Error = self;
        while let Some(next) = source.source() {
            source = next;
        }
        source.to_string()
    }
}

/// Pooled HTTP/1.1 client used for all unary forwarding.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self { client }
    }

    /// Forward `request` to `target`, rewriting the path per the route.
    ///
    /// Resolves once the upstream response head arrives; both bodies
    /// keep streaming through the returned response.
    pub async fn forward(
        &self,
        request: Request<Body>,
        target: &UpstreamTarget,
    ) -> Result<Response<Body>, ForwardError> {
        let authority = target.authority();
        let original_target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let rewritten = target.rewrite_target(original_target);

        let uri: Uri = format!("http://{}{}", authority, rewritten)
            .parse()
            .map_err(axum::http::Error::from)?;

        let (parts, body) = request.into_parts();
        let mut upstream_request = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)?;

        let headers = upstream_request.headers_mut();
        for (name, value) in parts.headers.iter() {
            if name == header::HOST {
                continue;
            }
            headers.append(name, value.clone());
        }
        let host_value = HeaderValue::from_str(&authority).map_err(axum::http::Error::from)?;
        headers.insert(header::HOST, host_value);

        let response = self.client.request(upstream_request).await?;
        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}
