//! Error types for ftlite
//!
//! Provides a unified error type for all operations.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using FtError
pub type Result<T> = std::result::Result<T, FtError>;

/// Unified error type for ftlite operations
#[derive(Debug, Error)]
pub enum FtError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Usage Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Usage(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection closed by peer: expected {expected} bytes, received {received}")]
    ConnectionClosed { expected: usize, received: usize },

    #[error("Timed out: {0}")]
    Timeout(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Tag too long: {0} bytes (max 8)")]
    TagTooLong(usize),

    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    #[error("Payload too large: {0} bytes (max 65525)")]
    PayloadTooLarge(usize),

    // -------------------------------------------------------------------------
    // Transfer Errors
    // -------------------------------------------------------------------------
    #[error("File \"{}\" already exists", .0.display())]
    FileExists(PathBuf),

    #[error("{0}")]
    Server(String),
}

impl FtError {
    /// True when the error means the peer went away rather than misbehaved
    pub fn is_disconnect(&self) -> bool {
        match self {
            FtError::ConnectionClosed { .. } => true,
            FtError::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Map socket timeouts onto `Timeout`, leaving other errors untouched
    ///
    /// Unix reports an expired `SO_RCVTIMEO` as `WouldBlock`, Windows as `TimedOut`.
    pub(crate) fn with_timeout_context(self, what: &str) -> Self {
        match self {
            FtError::Io(ref e)
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                FtError::Timeout(what.to_string())
            }
            other => other,
        }
    }
}
