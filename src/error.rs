//! Error types for Spyglass.
//!
//! Uses `thiserror` for ergonomic error definitions. Connection-level
//! failures are classified here but never escape a scan: the probe
//! folds them into a port status so per-port probing stays total.

use thiserror::Error;

/// Classified outcome of a failed connection attempt.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("connection refused")]
    ConnectionRefused,

    #[error("connection timed out")]
    Timeout,

    #[error("host unreachable")]
    HostUnreachable,

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;
