//! Session and command error types

use frame_source::SourceError;
use thiserror::Error;

/// Session error
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Monitor not found: {0}")]
    InvalidMonitor(usize),

    #[error("Capture subsystem unavailable: {0}")]
    SourceUnavailable(String),

    #[error("No monitors found")]
    NoMonitors,
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<SourceError> for SessionError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::InvalidMonitor(index) => SessionError::InvalidMonitor(index),
            SourceError::NoMonitors => SessionError::NoMonitors,
            other => SessionError::SourceUnavailable(other.to_string()),
        }
    }
}

/// Error surfaced to command callers
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Monitor not found: {0}")]
    InvalidMonitor(usize),

    #[error("Capture subsystem unavailable: {0}")]
    Source(String),
}

impl From<SessionError> for CommandError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidMonitor(index) => CommandError::InvalidMonitor(index),
            SessionError::SourceUnavailable(msg) => CommandError::Source(msg),
            SessionError::NoMonitors => CommandError::Source("no monitors found".into()),
        }
    }
}

impl serde::Serialize for CommandError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type CommandResult<T> = Result<T, CommandError>;
