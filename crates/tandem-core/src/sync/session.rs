//! Explicit sync session

use tokio::sync::OnceCell;

use crate::error::Result;
use crate::transport::SyncTransport;

use super::queue::OperationQueue;

/// The transport and local queue one orchestrator works against.
///
/// Constructed once by the caller and owned by the orchestrator. Setup runs
/// on the first [`initialize`](Self::initialize) call; later calls are no-ops.
pub struct SyncSession<T, Q> {
    transport: T,
    queue: Q,
    initialized: OnceCell<()>,
}

impl<T, Q> SyncSession<T, Q>
where
    T: SyncTransport,
    Q: OperationQueue<Record = T::Record>,
{
    pub fn new(transport: T, queue: Q) -> Self {
        Self {
            transport,
            queue,
            initialized: OnceCell::new(),
        }
    }

    pub async fn initialize(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                self.queue.initialize().await?;
                tracing::debug!("Sync session initialized");
                Ok::<(), crate::Error>(())
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub const fn queue(&self) -> &Q {
        &self.queue
    }
}
