//! tandem-core - Core library for tandem
//!
//! Local todo storage with an offline operation queue, and the sync engine
//! that pushes queued changes, resolves the conflicts the remote reports and
//! pulls remote changes back.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod state;
pub mod sync;
pub mod transport;
pub mod util;

pub use error::{Error, Result};
pub use models::{ItemId, OperationKind, PendingOperation, TodoItem};
pub use state::SyncPhase;
