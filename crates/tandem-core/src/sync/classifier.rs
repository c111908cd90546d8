//! Conflict classification

use crate::models::OperationKind;

use super::failure::PushFailure;
use super::policy::{delete_policy, insert_policy, update_policy, DecisionPoint};
use super::record::SyncRecord;
use super::resolution::Resolution;

/// Disposition of one push failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<R> {
    /// Settled without outside input
    Resolved(Resolution<R>),
    /// Needs an answer from the decision gateway
    NeedsDecision(DecisionPoint<R>),
}

/// Dispatch a failure to the policy for its operation kind
pub fn classify<R: SyncRecord>(failure: PushFailure<R>) -> Classification<R> {
    let PushFailure {
        kind,
        status,
        local,
        remote,
    } = failure;

    match kind {
        OperationKind::Insert => insert_policy(status, local, remote),
        OperationKind::Update => update_policy(status, local, remote),
        OperationKind::Delete => delete_policy(status, local, remote),
    }
}
