//! Error types for isoserve

use std::net::SocketAddr;
use thiserror::Error;

/// Result type for isoserve operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for isoserve
#[derive(Error, Debug)]
pub enum Error {
    /// The listening socket could not be created or bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
