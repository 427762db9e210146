use std::io;

use thiserror::Error;

/// Underlying failure of a control-channel connection attempt.
///
/// Carries the OS error classification so the orchestrator can tell a
/// refused connection (broken bridge configuration) from anything else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (kind: {kind:?}, os code: {raw_os_error:?})")]
pub struct ConnectionFailure {
    pub kind: io::ErrorKind,
    pub raw_os_error: Option<i32>,
    pub message: String,
}

impl ConnectionFailure {
    pub fn is_connection_refused(&self) -> bool {
        self.kind == io::ErrorKind::ConnectionRefused
    }
}

impl From<io::Error> for ConnectionFailure {
    fn from(err: io::Error) -> Self {
        Self {
            kind: err.kind(),
            raw_os_error: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

/// Errors raised by the transport lifecycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("no control channel is open")]
    MissingController,

    #[error("control credential unavailable: {0}")]
    MissingCredential(String),

    #[error("control channel authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("control channel connection failed: {0}")]
    ConnectionFailed(ConnectionFailure),

    #[error("transport process did not stop within {0:?}")]
    ShutdownTimedOut(std::time::Duration),

    #[error("transport error: {0}")]
    Unknown(String),
}

impl TransportError {
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, TransportError::ConnectionFailed(f) if f.is_connection_refused())
    }
}

impl From<anyhow::Error> for TransportError {
    fn from(err: anyhow::Error) -> Self {
        TransportError::Unknown(format!("{err:#}"))
    }
}
