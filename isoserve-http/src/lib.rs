//! Isoserve HTTP Server
//!
//! Accepts HTTP/1.x connections, serves files through
//! [`isoserve_static::FileServer`] and adds the cross-origin isolation
//! headers to every response.

mod handlers;
pub mod headers;
pub mod server;

pub use headers::{decorate, IsolationHeaders, ISOLATION_HEADERS};
pub use server::Server;
