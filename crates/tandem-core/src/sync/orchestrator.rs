//! Push / resolve / pull orchestration

use tokio::sync::{watch, Mutex};

use crate::error::Result;
use crate::models::{ConflictEntry, PendingOperation};
use crate::state::SyncPhase;
use crate::transport::{PullQuery, SyncTransport};

use super::classifier::{classify, Classification};
use super::failure::PushFailure;
use super::gateway::DecisionGateway;
use super::policy::DecisionPoint;
use super::queue::OperationQueue;
use super::record::SyncRecord;
use super::report::{FailedResolution, PushSummary, ReportSink, SyncSummary};
use super::resolution::Resolution;
use super::session::SyncSession;

/// Drives sync cycles against one session.
///
/// Only one cycle runs at a time: `push`, `pull` and `refresh` queue up
/// behind each other on an internal lock, in call order. Within a push,
/// failures are resolved in the order the transport reported them and each
/// resolution is committed to the queue before the next one is classified.
pub struct SyncOrchestrator<T, Q, G, S> {
    session: SyncSession<T, Q>,
    gateway: Mutex<G>,
    reporter: S,
    cycle: Mutex<()>,
    phase: watch::Sender<SyncPhase>,
}

impl<T, Q, G, S> SyncOrchestrator<T, Q, G, S>
where
    T: SyncTransport,
    Q: OperationQueue<Record = T::Record>,
    G: DecisionGateway,
    S: ReportSink,
{
    pub fn new(session: SyncSession<T, Q>, gateway: G, reporter: S) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            session,
            gateway: Mutex::new(gateway),
            reporter,
            cycle: Mutex::new(()),
            phase,
        }
    }

    pub const fn session(&self) -> &SyncSession<T, Q> {
        &self.session
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Observe phase transitions
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Push queued operations and resolve every rejection
    pub async fn push(&self) -> Result<PushSummary> {
        let _cycle = self.cycle.lock().await;
        self.session.initialize().await?;
        let outcome = self.push_locked().await;
        self.set_phase(SyncPhase::Idle);
        outcome
    }

    /// Merge remote records matching `query` into local storage.
    ///
    /// Prefer [`refresh`](Self::refresh): pulling before pushing can bring
    /// back a record this client just deleted.
    pub async fn pull(&self, query: &PullQuery) -> Result<usize> {
        let _cycle = self.cycle.lock().await;
        self.session.initialize().await?;
        let outcome = self.pull_locked(query).await;
        self.set_phase(SyncPhase::Idle);
        outcome
    }

    /// Push, then pull, as one cycle
    pub async fn refresh(&self, query: &PullQuery) -> Result<SyncSummary> {
        let _cycle = self.cycle.lock().await;
        self.session.initialize().await?;

        let outcome = match self.push_locked().await {
            Ok(push) => self
                .pull_locked(query)
                .await
                .map(|pulled| SyncSummary { push, pulled }),
            Err(error) => Err(error),
        };
        self.set_phase(SyncPhase::Idle);
        outcome
    }

    fn set_phase(&self, phase: SyncPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            tracing::debug!("Sync phase {previous} -> {phase}");
        }
    }

    async fn push_locked(&self) -> Result<PushSummary> {
        self.set_phase(SyncPhase::Pushing);
        let queue = self.session.queue();

        let operations = queue.enumerate_pending().await?;
        if operations.is_empty() {
            tracing::debug!("Nothing to push");
            return Ok(PushSummary::default());
        }
        tracing::info!("Pushing {} pending operation(s)", operations.len());

        let report = match self.session.transport().push(&operations).await {
            Ok(report) => report,
            Err(error) => {
                self.reporter.report(&format!("Push failed. Error: {error}"));
                return Err(error.into());
            }
        };

        for completed in &report.completed {
            queue
                .remove(&completed.record_id, completed.remote.as_ref())
                .await?;
        }

        let mut summary = PushSummary {
            pushed: report.completed.len(),
            conflicts: report.failures.len(),
            ..PushSummary::default()
        };

        if !report.failures.is_empty() {
            self.set_phase(SyncPhase::ResolvingConflicts);
            for failure in report.failures {
                self.resolve_failure(&operations, failure, &mut summary)
                    .await?;
            }
        }

        self.reporter.report(&summary.message());
        Ok(summary)
    }

    async fn resolve_failure(
        &self,
        operations: &[PendingOperation<T::Record>],
        failure: PushFailure<T::Record>,
        summary: &mut PushSummary,
    ) -> Result<()> {
        let record_id = failure.local.record_id().to_string();
        let kind = failure.kind;
        let status = failure.status;

        let Some(slot) = operations
            .iter()
            .find(|operation| operation.record_id() == record_id)
        else {
            tracing::error!("Transport reported a failure for {record_id}, which was not pushed");
            summary.failed.push(FailedResolution {
                record_id,
                reason: "failure for an operation that was not pushed".to_string(),
            });
            return Ok(());
        };

        let resolution = match classify(failure) {
            Classification::Resolved(resolution) => resolution,
            Classification::NeedsDecision(point) => self.decide(&point).await?,
        };
        tracing::debug!(
            "Resolved {kind} {record_id} ({status}) with {}",
            resolution.label()
        );

        let label = resolution.label();
        let failed = resolution.is_fail();
        let queue = self.session.queue();
        match resolution {
            Resolution::Discard => queue.remove(&record_id, None).await?,
            Resolution::DiscardAndAdopt(remote) => queue.remove(&record_id, Some(&remote)).await?,
            Resolution::Reapply(record) => {
                queue
                    .replace(&record_id, slot.replaced_with(slot.kind, record))
                    .await?;
            }
            Resolution::ChangeKind(new_kind, record) => {
                queue
                    .replace(&record_id, slot.replaced_with(new_kind, record))
                    .await?;
            }
            Resolution::Fail(reason) => {
                tracing::error!(
                    "Unhandled {kind} conflict on {record_id} ({status}): {reason}; operation left queued"
                );
                summary.failed.push(FailedResolution {
                    record_id: record_id.clone(),
                    reason,
                });
            }
        }
        if !failed {
            summary.resolved += 1;
        }

        queue
            .record_resolution(&ConflictEntry {
                record_id,
                kind: kind.to_string(),
                status: status.label().to_string(),
                resolution: label.to_string(),
            })
            .await
    }

    /// Ask the gateway until it gives a structurally valid answer
    async fn decide(&self, point: &DecisionPoint<T::Record>) -> Result<Resolution<T::Record>> {
        let mut gateway = self.gateway.lock().await;
        let mut attempt = 1;
        let mut rejection = None;

        loop {
            let request = point.request(attempt, rejection.take())?;
            let answer = gateway.request_decision(&request).await?;
            match point.resume(answer) {
                Ok(resolution) => return Ok(resolution),
                Err(reason) => {
                    tracing::warn!(
                        "Rejected decision for {} (attempt {attempt}): {reason}",
                        request.record_id
                    );
                    rejection = Some(reason);
                    attempt += 1;
                }
            }
        }
    }

    async fn pull_locked(&self, query: &PullQuery) -> Result<usize> {
        self.set_phase(SyncPhase::Pulling);

        let records = match self.session.transport().pull(query).await {
            Ok(records) => records,
            Err(error) => {
                self.reporter.report(&format!("Pull failed. Error: {error}"));
                return Err(error.into());
            }
        };

        let fetched = records.len();
        let merged = self.session.queue().merge_pulled(records).await?;
        tracing::info!("Pulled {fetched} record(s), merged {merged}");
        Ok(merged)
    }
}
