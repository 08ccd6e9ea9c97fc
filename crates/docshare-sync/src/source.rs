//! Remote catalog source seam.

use async_trait::async_trait;
use docshare_shared::CatalogRecord;
use thiserror::Error;

/// Fetches the complete, authoritative catalog in one call.
///
/// Implementations return raw faults; turning them into a
/// [`SyncError`](docshare_shared::SyncError) is the classifier's job.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_all(&self) -> anyhow::Result<Vec<CatalogRecord>>;
}

/// The remote answered, but not with a 2xx status.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("HTTP status {code}")]
pub struct HttpStatusError {
    pub code: u16,
}

impl HttpStatusError {
    pub fn new(code: u16) -> Self {
        Self { code }
    }
}
