//! Error types for the attribution engine.
//!
//! None of these are fatal. Every component that calls the directory maps a
//! `DirectoryError` onto its own "unknown" outcome instead of propagating it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a call into the external directory service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The engine lacks the permission needed for the call.
    #[error("missing permission")]
    PermissionDenied,

    /// The call did not complete within its time bound.
    #[error("directory call timed out")]
    Timeout,

    /// The requested scope or resource does not exist.
    #[error("not found")]
    NotFound,

    /// The directory answered with something the engine cannot use.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Transport-level failure.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    /// Coarse classification, used for reporting and matching.
    pub fn kind(&self) -> DirectoryErrorKind {
        match self {
            Self::PermissionDenied => DirectoryErrorKind::PermissionDenied,
            Self::Timeout => DirectoryErrorKind::Timeout,
            Self::NotFound => DirectoryErrorKind::NotFound,
            Self::MalformedResponse(_) => DirectoryErrorKind::MalformedResponse,
            Self::Unavailable(_) => DirectoryErrorKind::Unavailable,
        }
    }
}

/// Classification of a [`DirectoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryErrorKind {
    PermissionDenied,
    Timeout,
    NotFound,
    MalformedResponse,
    Unavailable,
}

impl std::fmt::Display for DirectoryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "permission_denied"),
            Self::Timeout => write!(f, "timeout"),
            Self::NotFound => write!(f, "not_found"),
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Errors that can occur while delivering a log record.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}
