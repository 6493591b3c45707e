//! Isoserve Static File Server Module
//!
//! Static file serving with:
//! - a fixed extension to MIME type table
//! - index files and trailing-slash redirects for directories
//! - `Last-Modified` / `If-Modified-Since` handling

pub mod body;
mod file_server;
pub mod mime;
mod responder;

pub use body::Body;
pub use file_server::{FileServer, FileServerConfig};
pub use mime::guess_mime_type;
pub use responder::Responder;
