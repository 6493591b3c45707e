//! Server configuration
//!
//! Isoserve has no configuration file: the only runtime input is the port
//! taken from the command line. Everything else is a fixed default.

mod types;

pub use types::{default_root, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
