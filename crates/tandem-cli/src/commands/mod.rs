pub mod add;
pub mod common;
pub mod complete;
pub mod completions;
pub mod conflicts;
pub mod delete;
pub mod edit;
pub mod list;
pub mod queue;
pub mod sync;
