//! Isoserve Core Library
//!
//! Shared building blocks for the isoserve static file server:
//! error handling, server configuration and the lifecycle state machine
//! that coordinates shutdown between signal handling and the accept loop.

pub mod config;
pub mod error;
pub mod lifecycle;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use lifecycle::{Lifecycle, ShutdownHandle};

/// Isoserve version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
