//! Data models for tandem

mod operation;
mod sync_conflict;
mod todo_item;

pub use operation::{OperationKind, PendingOperation};
pub use sync_conflict::{ConflictEntry, SyncConflict};
pub use todo_item::{ItemId, TodoItem};
