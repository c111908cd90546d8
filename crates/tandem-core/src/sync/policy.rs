//! Per-kind conflict resolution policies
//!
//! Every policy is a pure function of `(status, local, remote)`. The update
//! policy is the only one that can need an outside decision; it hands back a
//! [`DecisionPoint`] instead of calling the gateway itself.

use crate::error::Result;
use crate::models::OperationKind;

use super::classifier::Classification;
use super::failure::PushStatus;
use super::gateway::{ConflictAnswer, ConflictRequest};
use super::record::SyncRecord;
use super::resolution::Resolution;

pub(crate) const UPDATE_WITHOUT_REMOTE: &str = "update conflict without remote record";
pub(crate) const UNEXPECTED_DELETE_STATUS: &str = "unexpected delete-conflict status";

/// Insert failures are re-pushes of inserts the remote already applied in an
/// earlier cycle: ids are client-generated and globally unique, so a
/// collision never means two distinct records.
pub fn insert_policy<R: SyncRecord>(
    _status: PushStatus,
    _local: R,
    _remote: Option<R>,
) -> Classification<R> {
    Classification::Resolved(Resolution::Discard)
}

pub fn update_policy<R: SyncRecord>(
    status: PushStatus,
    local: R,
    remote: Option<R>,
) -> Classification<R> {
    match status {
        // Nothing to adopt and nothing to recreate.
        PushStatus::NotFound => Classification::Resolved(Resolution::Discard),
        PushStatus::VersionConflict
        | PushStatus::PreconditionFailed
        | PushStatus::TransportError(_) => match remote {
            None => Classification::Resolved(Resolution::Fail(UPDATE_WITHOUT_REMOTE.to_string())),
            Some(remote) if local.same_payload(&remote) => {
                Classification::Resolved(Resolution::Discard)
            }
            Some(remote) => Classification::NeedsDecision(DecisionPoint { local, remote }),
        },
    }
}

pub fn delete_policy<R: SyncRecord>(
    status: PushStatus,
    _local: R,
    remote: Option<R>,
) -> Classification<R> {
    let resolution = match (status, remote) {
        // Already absent or already a tombstone remotely.
        (PushStatus::NotFound | PushStatus::VersionConflict, _) => Resolution::Discard,
        (PushStatus::PreconditionFailed, Some(remote)) if remote.is_deleted() => {
            Resolution::Discard
        }
        // The remote holds a live, newer record: converge to it instead of
        // deleting data this client never saw.
        (PushStatus::PreconditionFailed, Some(remote)) => {
            Resolution::ChangeKind(OperationKind::Update, remote)
        }
        (PushStatus::PreconditionFailed, None) | (PushStatus::TransportError(_), _) => {
            Resolution::Fail(UNEXPECTED_DELETE_STATUS.to_string())
        }
    };
    Classification::Resolved(resolution)
}

/// A suspended update conflict waiting for a [`ConflictAnswer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPoint<R> {
    local: R,
    remote: R,
}

impl<R: SyncRecord> DecisionPoint<R> {
    pub const fn local(&self) -> &R {
        &self.local
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Build the request for the gateway
    pub fn request(&self, attempt: u32, rejection: Option<String>) -> Result<ConflictRequest> {
        Ok(ConflictRequest {
            record_id: self.local.record_id().to_string(),
            candidate: self.local.candidate()?,
            attempt,
            rejection,
        })
    }

    /// Resume with an answer.
    ///
    /// Every reapplied record carries the remote version, or the next push
    /// fails the same way. Returns the rejection reason for a structurally
    /// invalid answer.
    pub fn resume(&self, answer: ConflictAnswer) -> std::result::Result<Resolution<R>, String> {
        match answer {
            ConflictAnswer::UseServer => Ok(Resolution::DiscardAndAdopt(self.remote.clone())),
            ConflictAnswer::UseClient => Ok(Resolution::Reapply(
                self.local.clone().with_version_of(&self.remote),
            )),
            // Re-pushed unchanged next cycle.
            ConflictAnswer::Skip => Ok(Resolution::Reapply(self.local.clone())),
            ConflictAnswer::Custom(candidate) => {
                R::from_candidate(candidate, &self.remote).map(Resolution::Reapply)
            }
        }
    }
}
