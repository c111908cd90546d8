//! Terminal outcomes of handling one push failure

use crate::models::OperationKind;

/// What to do with the queued operation behind one push failure.
///
/// Everything except `Fail` maps to exactly one queue mutation: `Discard` and
/// `DiscardAndAdopt` remove the entry, `Reapply` and `ChangeKind` replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<R> {
    /// Drop the queued change
    Discard,
    /// Drop the queued change and overwrite the local copy with the remote one
    DiscardAndAdopt(R),
    /// Keep the operation queued with an updated snapshot
    Reapply(R),
    /// Keep the queue slot but switch the operation kind
    ChangeKind(OperationKind, R),
    /// Unmodeled situation; the operation stays queued untouched
    Fail(String),
}

impl<R> Resolution<R> {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Discard => "discard",
            Self::DiscardAndAdopt(_) => "adopt",
            Self::Reapply(_) => "reapply",
            Self::ChangeKind(..) => "change-kind",
            Self::Fail(_) => "fail",
        }
    }

    /// Whether applying this resolution removes the queue entry
    pub const fn removes_operation(&self) -> bool {
        matches!(self, Self::Discard | Self::DiscardAndAdopt(_))
    }

    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}
