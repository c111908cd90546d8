//! Local operation queue contract

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::models::{ConflictEntry, OperationKind, PendingOperation};

use super::record::SyncRecord;

/// Persistent FIFO of local mutations plus the local copies they refer to.
///
/// `remove` and `replace` must each be atomic: an operation is either fully
/// applied or not touched at all.
#[allow(async_fn_in_trait)]
pub trait OperationQueue {
    type Record: SyncRecord;

    /// One-time setup, run once per session
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// All queued operations in push order
    async fn enumerate_pending(&self) -> Result<Vec<PendingOperation<Self::Record>>>;

    /// Drop the entry for `record_id`. With `adopt`, overwrite the local copy
    /// in the same step.
    async fn remove(&self, record_id: &str, adopt: Option<&Self::Record>) -> Result<()>;

    /// Swap the entry for `record_id` in place, keeping its queue position.
    /// The local copy is updated to the new snapshot.
    async fn replace(&self, record_id: &str, operation: PendingOperation<Self::Record>)
        -> Result<()>;

    /// Merge pulled records into local storage, skipping records that still
    /// have a queued local change. Returns how many were written.
    async fn merge_pulled(&self, records: Vec<Self::Record>) -> Result<usize>;

    /// Audit hook for every handled push failure
    async fn record_resolution(&self, _entry: &ConflictEntry) -> Result<()> {
        Ok(())
    }
}

impl<Q: OperationQueue> OperationQueue for Arc<Q> {
    type Record = Q::Record;

    async fn initialize(&self) -> Result<()> {
        (**self).initialize().await
    }

    async fn enumerate_pending(&self) -> Result<Vec<PendingOperation<Self::Record>>> {
        (**self).enumerate_pending().await
    }

    async fn remove(&self, record_id: &str, adopt: Option<&Self::Record>) -> Result<()> {
        (**self).remove(record_id, adopt).await
    }

    async fn replace(
        &self,
        record_id: &str,
        operation: PendingOperation<Self::Record>,
    ) -> Result<()> {
        (**self).replace(record_id, operation).await
    }

    async fn merge_pulled(&self, records: Vec<Self::Record>) -> Result<usize> {
        (**self).merge_pulled(records).await
    }

    async fn record_resolution(&self, entry: &ConflictEntry) -> Result<()> {
        (**self).record_resolution(entry).await
    }
}

/// How a new local mutation combines with the entry already queued for the
/// same record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMerge {
    /// Nothing queued yet: append at the tail
    Append(OperationKind),
    /// Overwrite the existing entry in place with this kind
    Collapse(OperationKind),
    /// The mutations cancel out: drop the existing entry
    Cancel,
}

/// Combine an incoming mutation with the queued one, so a record never has
/// two queue entries.
pub fn merge_queued(existing: Option<OperationKind>, incoming: OperationKind) -> Result<QueueMerge> {
    use OperationKind::{Delete, Insert, Update};

    match (existing, incoming) {
        (None, kind) => Ok(QueueMerge::Append(kind)),
        (Some(Insert), Update) => Ok(QueueMerge::Collapse(Insert)),
        (Some(Insert), Delete) => Ok(QueueMerge::Cancel),
        (Some(Update), Update) => Ok(QueueMerge::Collapse(Update)),
        (Some(Update), Delete) => Ok(QueueMerge::Collapse(Delete)),
        (Some(queued @ (Insert | Update)), Insert) | (Some(queued @ Delete), _) => {
            Err(Error::InvalidInput(format!(
                "cannot queue {incoming} after pending {queued}"
            )))
        }
    }
}

#[derive(Debug)]
struct MemoryState<R> {
    operations: Vec<PendingOperation<R>>,
    records: BTreeMap<String, R>,
    conflicts: Vec<ConflictEntry>,
    next_position: i64,
}

/// In-process queue and record store
#[derive(Debug)]
pub struct MemoryQueue<R> {
    state: Mutex<MemoryState<R>>,
}

impl<R: SyncRecord> Default for MemoryQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SyncRecord> MemoryQueue<R> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                operations: Vec::new(),
                records: BTreeMap::new(),
                conflicts: Vec::new(),
                next_position: 1,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState<R>>> {
        self.state
            .lock()
            .map_err(|_| Error::Database("memory queue lock poisoned".to_string()))
    }

    /// Record a local mutation and queue it for push
    pub fn enqueue(&self, kind: OperationKind, record: R) -> Result<()> {
        let mut state = self.lock()?;
        let id = record.record_id().to_string();
        let existing = state
            .operations
            .iter()
            .position(|operation| operation.record_id() == id);

        match merge_queued(existing.map(|index| state.operations[index].kind), kind)? {
            QueueMerge::Append(kind) => {
                let position = state.next_position;
                state.next_position += 1;
                state
                    .operations
                    .push(PendingOperation::new(kind, record.clone(), position));
            }
            QueueMerge::Collapse(kind) => {
                if let Some(index) = existing {
                    let slot = &mut state.operations[index];
                    *slot = slot.replaced_with(kind, record.clone());
                }
            }
            QueueMerge::Cancel => {
                if let Some(index) = existing {
                    state.operations.remove(index);
                }
            }
        }

        if kind == OperationKind::Delete {
            state.records.remove(&id);
        } else {
            state.records.insert(id, record);
        }
        Ok(())
    }

    /// Local copy of a record
    pub fn local(&self, record_id: &str) -> Option<R> {
        self.lock()
            .ok()
            .and_then(|state| state.records.get(record_id).cloned())
    }

    pub fn pending(&self) -> Vec<PendingOperation<R>> {
        self.lock()
            .map(|state| state.operations.clone())
            .unwrap_or_default()
    }

    pub fn conflicts(&self) -> Vec<ConflictEntry> {
        self.lock()
            .map(|state| state.conflicts.clone())
            .unwrap_or_default()
    }

    fn store_local(state: &mut MemoryState<R>, record: R) {
        let id = record.record_id().to_string();
        if record.is_deleted() {
            state.records.remove(&id);
        } else {
            state.records.insert(id, record);
        }
    }
}

impl<R: SyncRecord> OperationQueue for MemoryQueue<R> {
    type Record = R;

    async fn enumerate_pending(&self) -> Result<Vec<PendingOperation<R>>> {
        let mut operations = self.lock()?.operations.clone();
        operations.sort_by_key(|operation| operation.position);
        Ok(operations)
    }

    async fn remove(&self, record_id: &str, adopt: Option<&R>) -> Result<()> {
        let mut state = self.lock()?;
        state
            .operations
            .retain(|operation| operation.record_id() != record_id);
        if let Some(record) = adopt {
            Self::store_local(&mut state, record.clone());
        }
        Ok(())
    }

    async fn replace(&self, record_id: &str, operation: PendingOperation<R>) -> Result<()> {
        let mut state = self.lock()?;
        let slot = state
            .operations
            .iter_mut()
            .find(|queued| queued.record_id() == record_id)
            .ok_or_else(|| Error::NotFound(record_id.to_string()))?;
        *slot = slot.replaced_with(operation.kind, operation.record.clone());

        if operation.kind == OperationKind::Delete {
            state.records.remove(record_id);
        } else {
            Self::store_local(&mut state, operation.record);
        }
        Ok(())
    }

    async fn merge_pulled(&self, records: Vec<R>) -> Result<usize> {
        let mut state = self.lock()?;
        let mut merged = 0;
        for record in records {
            let has_pending = state
                .operations
                .iter()
                .any(|operation| operation.record_id() == record.record_id());
            if has_pending {
                continue;
            }
            Self::store_local(&mut state, record);
            merged += 1;
        }
        Ok(merged)
    }

    async fn record_resolution(&self, entry: &ConflictEntry) -> Result<()> {
        self.lock()?.conflicts.push(entry.clone());
        Ok(())
    }
}
