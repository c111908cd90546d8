//! Remote transport contract
//!
//! A transport submits queued operations and fetches remote records. It
//! normalises provider status codes into [`PushStatus`](crate::sync::PushStatus)
//! and reports per-operation rejections as push failures. An `Err` means the
//! whole push or pull could not be attempted.

mod http;

pub use http::{normalize_status, HttpTransport};

use thiserror::Error;

use crate::models::PendingOperation;
use crate::sync::{PushReport, SyncRecord};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

/// Which remote records a pull fetches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullQuery {
    /// Provider filter expression; `None` pulls everything
    pub filter: Option<String>,
}

impl PullQuery {
    pub const fn all() -> Self {
        Self { filter: None }
    }

    pub fn filtered(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    type Record: SyncRecord;

    /// Submit operations in order and report what the remote accepted and
    /// rejected, in the same order.
    async fn push(
        &self,
        operations: &[PendingOperation<Self::Record>],
    ) -> Result<PushReport<Self::Record>, TransportError>;

    /// Fetch remote records matching `query`, tombstones included
    async fn pull(&self, query: &PullQuery) -> Result<Vec<Self::Record>, TransportError>;
}
