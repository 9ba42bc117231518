//! Error types for rigcast

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that can occur while encoding or streaming a frame
#[derive(Debug, Error)]
pub enum RigcastError {
    /// Input shape does not match what the calibration profile expects.
    /// Frame-scoped: only the named record field is nulled.
    #[error("Schema mismatch in {field}: {message}")]
    SchemaMismatch { field: String, message: String },

    #[error("Invalid calibration profile: {0}")]
    InvalidProfile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse frame input: {0}")]
    ParseError(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RigcastError {
    pub(crate) fn schema_mismatch(field: &str, message: impl Into<String>) -> Self {
        RigcastError::SchemaMismatch {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Datagram transport errors. None of these are fatal; the frame is dropped.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve destination {0}")]
    Resolve(String),

    #[error("Failed to send datagram to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Datagram of {len} bytes exceeds the {max} byte limit")]
    Oversize { len: usize, max: usize },

    #[error("Transport lock poisoned")]
    Poisoned,
}

/// Result type alias for rigcast operations
pub type Result<T> = std::result::Result<T, RigcastError>;
