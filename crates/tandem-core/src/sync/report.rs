//! Progress reporting and cycle summaries

use serde::Serialize;

/// Receives human-readable progress and summary lines.
///
/// Fire-and-forget: implementations must not block the sync cycle.
pub trait ReportSink {
    fn report(&self, message: &str);
}

/// Forwards reports to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ReportSink for TracingReporter {
    fn report(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// A push failure the engine could not resolve; its operation stays queued
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedResolution {
    pub record_id: String,
    pub reason: String,
}

/// Outcome of one push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushSummary {
    /// Operations the remote accepted
    pub pushed: usize,
    /// Operations the remote rejected
    pub conflicts: usize,
    /// Rejections settled by a resolution other than `Fail`
    pub resolved: usize,
    pub failed: Vec<FailedResolution>,
}

impl PushSummary {
    pub(crate) fn message(&self) -> String {
        if self.conflicts == 0 {
            format!("Push completed ({} operation(s))", self.pushed)
        } else {
            format!(
                "Push completed with {} conflict(s), {} resolved",
                self.conflicts, self.resolved
            )
        }
    }
}

/// Outcome of a push followed by a pull
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub push: PushSummary,
    /// Pulled records written to local storage
    pub pulled: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_mentions_conflicts_only_when_present() {
        let clean = PushSummary {
            pushed: 3,
            ..PushSummary::default()
        };
        assert_eq!(clean.message(), "Push completed (3 operation(s))");

        let conflicted = PushSummary {
            pushed: 1,
            conflicts: 2,
            resolved: 1,
            failed: vec![FailedResolution {
                record_id: "B".into(),
                reason: "unexpected delete-conflict status".into(),
            }],
        };
        assert_eq!(
            conflicted.message(),
            "Push completed with 2 conflict(s), 1 resolved"
        );
    }
}
