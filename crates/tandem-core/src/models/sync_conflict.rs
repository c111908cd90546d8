//! Sync conflict audit model

use serde::{Deserialize, Serialize};

/// A push conflict as handed to the audit log, before it is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    /// Record involved in the conflict
    pub record_id: String,
    /// Operation kind that failed (`insert`, `update`, `delete`)
    pub kind: String,
    /// Normalised push status (`not-found`, `version-conflict`, ...)
    pub status: String,
    /// Resolution label (`discard`, `adopt`, `reapply`, `change-kind`, `fail`)
    pub resolution: String,
}

/// Recorded sync conflict with its resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Record involved in the conflict
    pub record_id: String,
    /// Operation kind that failed
    pub kind: String,
    /// Normalised push status
    pub status: String,
    /// Resolution label
    pub resolution: String,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
}
