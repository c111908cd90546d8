//! Queued local mutations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::sync::SyncRecord;

/// Kind of a queued mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    /// Decoding is the only way an arbitrary kind can reach the engine, so an
    /// unknown value is a fatal contract violation rather than a conflict.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::UnhandledOperationKind(other.to_string())),
        }
    }
}

/// One queued local mutation.
///
/// `position` is the queue position; push order is ascending position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation<R> {
    pub kind: OperationKind,
    pub record: R,
    pub position: i64,
}

impl<R: SyncRecord> PendingOperation<R> {
    pub const fn new(kind: OperationKind, record: R, position: i64) -> Self {
        Self {
            kind,
            record,
            position,
        }
    }

    /// Identifier of the record this operation mutates
    pub fn record_id(&self) -> &str {
        self.record.record_id()
    }

    /// Same queue slot, different kind and snapshot
    #[must_use]
    pub fn replaced_with(&self, kind: OperationKind, record: R) -> Self {
        Self::new(kind, record, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoItem;

    #[test]
    fn test_kind_roundtrips_through_str() {
        for kind in [
            OperationKind::Insert,
            OperationKind::Update,
            OperationKind::Delete,
        ] {
            assert_eq!(kind.as_str().parse::<OperationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_is_fatal() {
        let error = "upsert".parse::<OperationKind>().unwrap_err();
        assert!(matches!(error, Error::UnhandledOperationKind(kind) if kind == "upsert"));
    }

    #[test]
    fn test_replaced_with_keeps_position() {
        let op = PendingOperation::new(OperationKind::Delete, TodoItem::new("x"), 7);
        let replaced = op.replaced_with(OperationKind::Update, TodoItem::new("y"));
        assert_eq!(replaced.position, 7);
        assert_eq!(replaced.kind, OperationKind::Update);
    }
}
