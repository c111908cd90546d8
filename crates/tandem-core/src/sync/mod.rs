//! Sync engine
//!
//! Pushes queued local mutations, settles every rejection the remote reports
//! and pulls remote changes back:
//!
//! - [`classify`] maps one [`PushFailure`] onto a [`Resolution`] or a
//!   [`DecisionPoint`] that needs outside input
//! - [`DecisionGateway`] supplies that input
//! - [`SyncOrchestrator`] runs the cycle and applies each resolution to the
//!   [`OperationQueue`]

mod classifier;
mod failure;
mod gateway;
mod orchestrator;
mod policy;
mod queue;
mod record;
mod report;
mod resolution;
mod session;

pub use classifier::{classify, Classification};
pub use failure::{CompletedPush, PushFailure, PushReport, PushStatus};
pub use gateway::{
    ConflictAnswer, ConflictRequest, DecisionGateway, FixedAnswerGateway, ScriptedGateway,
};
pub use orchestrator::SyncOrchestrator;
pub use policy::{delete_policy, insert_policy, update_policy, DecisionPoint};
pub use queue::{merge_queued, MemoryQueue, OperationQueue, QueueMerge};
pub use record::{SyncRecord, IDENTITY_FIELDS};
pub use report::{FailedResolution, PushSummary, ReportSink, SyncSummary, TracingReporter};
pub use resolution::Resolution;
pub use session::SyncSession;
