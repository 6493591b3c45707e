//! Responder trait

use async_trait::async_trait;
use http::request::Parts;
use http::Response;

use crate::body::Body;

/// Produces a complete response for a request head.
///
/// Responders never fail: every outcome, including missing files and
/// unsupported methods, is expressed as a status code.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Handle a request
    async fn respond(&self, parts: &Parts) -> Response<Body>;
}

