//! Request dispatch

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::{Request, Response};
use isoserve_static::{Body, Responder};

/// Serve one request and write an access log line.
///
/// The request body is ignored; only the head is needed to serve files.
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    responder: Arc<dyn Responder>,
    peer: SocketAddr,
) -> Result<Response<Body>, Infallible> {
    let (parts, _body) = req.into_parts();
    let response = responder.respond(&parts).await;

    tracing::info!(
        "{} \"{} {} {:?}\" {}",
        peer.ip(),
        parts.method,
        parts.uri,
        parts.version,
        response.status().as_u16()
    );

    Ok(response)
}
