//! HTTP server setup and connection dispatch.
//!
//! # Responsibilities
//! - Accept connections and classify each one from its first request head
//! - Hand upgrade requests to the tunnel subsystem as raw sockets
//! - Serve plain HTTP through an Axum router over the rewound stream
//! - Dispatch matched requests to the landing page or the forwarder
//! - Wire up middleware (request id, tracing, CORS)
//!
//! # Design Decisions
//! - Classification happens before any HTTP framing: the head sniffer
//!   reads raw bytes off the socket, and plain connections get them
//!   replayed through a rewinding IO wrapper
//! - The router serves each connection directly via hyper so tunneled
//!   connections never enter the HTTP stack at all

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{connect_info::IntoMakeServiceWithConnectInfo, ConnectInfo, State},
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tower::{Service, ServiceExt};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::validation::ValidationError;
use crate::config::GatewayConfig;
use crate::http::forward::Forwarder;
use crate::http::head;
use crate::http::landing::LandingPage;
use crate::http::request_id::MakeRequestUuid;
use crate::lifecycle::Shutdown;
use crate::net::{Listener, Rewind};
use crate::observability::metrics;
use crate::routing::{Destination, RouteTable};
use crate::tunnel;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub forwarder: Forwarder,
    pub landing: Arc<LandingPage>,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    table: Arc<RouteTable>,
}

impl HttpServer {
    /// Build the server from validated configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, ValidationError> {
        let table = Arc::new(RouteTable::from_config(config)?);

        let state = AppState {
            table: table.clone(),
            forwarder: Forwarder::new(),
            landing: Arc::new(LandingPage::new(&config.landing.page_path)),
        };

        let router = Self::build_router(state);
        Ok(Self { router, table })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(cors)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Accept connections until shutdown is triggered.
    ///
    /// Each connection is classified once from its sniffed request
    /// head: upgrade requests become raw byte tunnels, everything else
    /// is served as HTTP/1.1 through the router.
    pub async fn run(self, listener: Listener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let make_service = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let mut stop = shutdown.subscribe();

        loop {
            let accepted = tokio::select! {
                _ = stop.recv() => break,
                accepted = listener.accept() => accepted,
            };

            let (stream, peer, permit) = match accepted {
                Ok(conn) => conn,
                Err(error) => {
                    tracing::warn!(error = %error, "Accept failed");
                    continue;
                }
            };

            let table = self.table.clone();
            let make_service = make_service.clone();
            tokio::spawn(async move {
                let _permit = permit;
                handle_connection(stream, peer, table, make_service).await;
            });
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Classify one accepted connection and drive it to completion.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    table: Arc<RouteTable>,
    mut make_service: IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
) {
    let sniffed = match head::read_request_head(&mut stream).await {
        Ok(sniffed) => sniffed,
        Err(error) => {
            tracing::debug!(peer = %peer, error = %error, "Failed to read request head");
            return;
        }
    };

    if sniffed.head.is_upgrade() {
        let path = sniffed.head.path().to_string();
        match table.lookup(&path) {
            Some(route) => match &route.destination {
                Destination::Upstream(target) if target.supports_upgrade => {
                    if let Err(error) = tunnel::run(stream, sniffed, &route.name, target).await {
                        tracing::warn!(
                            peer = %peer,
                            route = %route.name,
                            error = %error,
                            "Tunnel failed"
                        );
                    }
                }
                _ => {
                    tracing::debug!(
                        peer = %peer,
                        path = %path,
                        route = %route.name,
                        "Upgrade request on a non-upgrade route, closing"
                    );
                }
            },
            None => {
                tracing::debug!(
                    peer = %peer,
                    path = %path,
                    "Upgrade request with no matching route, closing"
                );
            }
        }
        return;
    }

    // Plain HTTP: replay the sniffed bytes in front of the socket and
    // let hyper drive the connection, keep-alive included.
    let service = unwrap_infallible(make_service.call(peer).await);
    let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
        service.clone().oneshot(request)
    });

    let io = TokioIo::new(Rewind::new(Bytes::from(sniffed.buffer), stream));
    if let Err(error) = http1::Builder::new().serve_connection(io, hyper_service).await {
        tracing::debug!(peer = %peer, error = %error, "Connection closed with error");
    }
}

/// Main proxy handler.
/// Looks up the route for the request path and dispatches accordingly.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        peer = %peer,
        method = %method,
        path = %path,
        "Dispatching request"
    );

    let Some(route) = state.table.lookup(&path) else {
        tracing::debug!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request("none", method.as_str(), 404, start_time);
        return (
            StatusCode::NOT_FOUND,
            format!("Not found: {}", request.uri()),
        )
            .into_response();
    };

    match &route.destination {
        Destination::Landing => {
            let response = state.landing.render().await;
            metrics::record_request(
                &route.name,
                method.as_str(),
                response.status().as_u16(),
                start_time,
            );
            response
        }
        Destination::Upstream(target) => {
            match state.forwarder.forward(request, target).await {
                Ok(response) => {
                    tracing::debug!(
                        request_id = %request_id,
                        route = %route.name,
                        status = %response.status(),
                        "Upstream responded"
                    );
                    metrics::record_request(
                        &route.name,
                        method.as_str(),
                        response.status().as_u16(),
                        start_time,
                    );
                    response.into_response()
                }
                Err(error) => {
                    tracing::warn!(
                        request_id = %request_id,
                        route = %route.name,
                        error = %error,
                        "Upstream request failed"
                    );
                    metrics::record_upstream_error(&route.name);
                    metrics::record_request(&route.name, method.as_str(), 502, start_time);
                    let body = serde_json::json!({
                        "error": "upstream request failed",
                        "details": error.details(),
                    });
                    (StatusCode::BAD_GATEWAY, Json(body)).into_response()
                }
            }
        }
    }
}

fn unwrap_infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => match err {},
    }
}
