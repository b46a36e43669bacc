//! Request id generation.
//!
//! Each request entering the gateway gets an `x-request-id` header so
//! log lines and backend traffic can be correlated. Ids set by the
//! set-request-id layer are propagated onto responses by its companion
//! layer; both are wired up in the server's middleware stack.

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Produces a fresh UUIDv4 for every request that lacks an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        let value = HeaderValue::from_str(&id).ok()?;
        Some(RequestId::new(value))
    }
}
