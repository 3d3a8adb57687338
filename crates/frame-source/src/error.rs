//! Frame source error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Capture subsystem unavailable: {0}")]
    Unavailable(String),

    #[error("No monitors found")]
    NoMonitors,

    #[error("Monitor not found: {0}")]
    InvalidMonitor(usize),

    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),

    #[error("Buffer length mismatch: expected {expected} bytes, got {actual}")]
    BufferMismatch { expected: usize, actual: usize },

    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

pub type SourceResult<T> = Result<T, SourceError>;
