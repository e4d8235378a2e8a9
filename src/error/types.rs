//! Error types
//!
//! Defines the error taxonomy of the file gateway and of server startup.

use std::io;

use thiserror::Error;

/// Result alias used across the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors produced by filesystem gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Resolved path lies outside the storage root
    #[error("Path escapes root: {0}")]
    PathEscape(String),

    /// Source entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Quota admission denied
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// Malformed or out-of-bounds byte range for a file of `size` bytes
    #[error("Range not satisfiable for {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    /// Missing or invalid request field
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }
}

/// Errors that abort server startup
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage root unavailable: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}
