use crate::codec::CodecError;
use std::fmt;
use thiserror::Error;

/// Why a detection submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    /// The deadline expired before the engine answered.
    Timeout,
    /// The engine answered with a non-empty error string.
    ServerRejected,
    /// The call failed below the application layer.
    TransportFailure,
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionKind::Timeout => "timeout",
            SubmissionKind::ServerRejected => "server rejected",
            SubmissionKind::TransportFailure => "transport failure",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection to {address} failed: {reason}")]
    Connection { address: String, reason: String },

    #[error("Config channel open failed: {0}")]
    ChannelOpen(String),

    #[error("Config sync failed: {0}")]
    ConfigSync(String),

    #[error("Config channel is closed")]
    ChannelClosed,

    #[error("Submission failed ({kind}): {detail}")]
    Submission { kind: SubmissionKind, detail: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ClientError {
    pub(crate) fn submission(kind: SubmissionKind, detail: impl Into<String>) -> Self {
        ClientError::Submission {
            kind,
            detail: detail.into(),
        }
    }

    /// Submission failures abort this run but may succeed on a later one.
    /// Everything else needs an operator or server-side change first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Submission { .. })
    }

    pub fn submission_kind(&self) -> Option<SubmissionKind> {
        match self {
            ClientError::Submission { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
