//! Sync cycle state.

use serde::Serialize;
use std::fmt;

/// Phase of the push/resolve/pull cycle.
///
/// `Idle → Pushing → ResolvingConflicts → Pulling → Idle`; phases are skipped
/// when there is nothing to do in them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SyncPhase {
    #[default]
    Idle,
    Pushing,
    ResolvingConflicts,
    Pulling,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Pushing => "pushing",
            Self::ResolvingConflicts => "resolving conflicts",
            Self::Pulling => "pulling",
        };
        f.write_str(label)
    }
}
