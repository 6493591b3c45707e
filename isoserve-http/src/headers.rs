//! Cross-origin isolation headers
//!
//! Browsers only expose `SharedArrayBuffer` (and with it threaded WASM) to
//! documents served with COOP `same-origin` and COEP `require-corp`.

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::request::Parts;
use http::Response;
use isoserve_static::{Body, Responder};

/// Appended to every response, in this order
pub const ISOLATION_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("cross-origin-embedder-policy", "require-corp"),
    ("cross-origin-opener-policy", "same-origin"),
];

/// Append the isolation headers to a finished header block
pub fn decorate(headers: &mut HeaderMap) {
    for (name, value) in ISOLATION_HEADERS {
        headers.append(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

/// Wraps a responder and decorates whatever it produces, error pages included.
pub struct IsolationHeaders<R> {
    inner: R,
}

impl<R: Responder> IsolationHeaders<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: Responder> Responder for IsolationHeaders<R> {
    async fn respond(&self, parts: &Parts) -> Response<Body> {
        let mut response = self.inner.respond(parts).await;
        decorate(response.headers_mut());
        response
    }
}
