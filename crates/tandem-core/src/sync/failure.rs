//! Push outcomes reported by a transport

use std::fmt;

use crate::models::OperationKind;

/// Normalised reason the remote rejected one operation.
///
/// Transports map provider-specific status codes into this vocabulary; the
/// engine never looks at raw responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushStatus {
    /// The remote record is gone or never existed
    NotFound,
    /// The remote already holds a conflicting write
    VersionConflict,
    /// The expected version did not match the remote's current version
    PreconditionFailed,
    /// Any other rejection, with the provider's code when known
    TransportError(Option<u16>),
}

impl PushStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::VersionConflict => "version-conflict",
            Self::PreconditionFailed => "precondition-failed",
            Self::TransportError(_) => "transport-error",
        }
    }
}

impl fmt::Display for PushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportError(Some(code)) => write!(f, "transport-error ({code})"),
            other => f.write_str(other.label()),
        }
    }
}

/// One queued operation the remote rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFailure<R> {
    pub kind: OperationKind,
    pub status: PushStatus,
    pub local: R,
    /// Present only when the remote copy could be fetched
    pub remote: Option<R>,
}

impl<R> PushFailure<R> {
    pub const fn new(kind: OperationKind, status: PushStatus, local: R, remote: Option<R>) -> Self {
        Self {
            kind,
            status,
            local,
            remote,
        }
    }
}

/// One queued operation the remote accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPush<R> {
    pub record_id: String,
    /// The remote's copy after the write, carrying the new version
    pub remote: Option<R>,
}

/// Result of submitting the whole queue.
///
/// Both lists follow the order of the submitted operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport<R> {
    pub completed: Vec<CompletedPush<R>>,
    pub failures: Vec<PushFailure<R>>,
}

impl<R> Default for PushReport<R> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_includes_code() {
        assert_eq!(PushStatus::TransportError(Some(503)).to_string(), "transport-error (503)");
        assert_eq!(PushStatus::TransportError(None).to_string(), "transport-error");
        assert_eq!(PushStatus::PreconditionFailed.to_string(), "precondition-failed");
    }
}
