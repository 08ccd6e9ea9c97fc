//! Remote document store seam.
//!
//! The structured store holding catalog documents, moderation reports and
//! dashboard collections. Its one non-trivial primitive is [`commit`], which
//! must apply every write of a [`WriteBatch`] or none of them.
//!
//! [`commit`]: DocumentStore::commit

use async_trait::async_trait;
use docshare_shared::{CatalogRecord, ModerationReport, ReportStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Documents,
    Reports,
    Users,
    Requests,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Documents => "documents",
            Collection::Reports => "reports",
            Collection::Users => "users",
            Collection::Requests => "requests",
        }
    }
}

/// A single write inside an atomic batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Write {
    #[serde(rename_all = "camelCase")]
    DeleteDocument { document_id: String },
    #[serde(rename_all = "camelCase")]
    SetReportStatus {
        report_id: String,
        status: ReportStatus,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteBatch {
    pub writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_document(mut self, document_id: impl Into<String>) -> Self {
        self.writes.push(Write::DeleteDocument {
            document_id: document_id.into(),
        });
        self
    }

    pub fn set_report_status(mut self, report_id: impl Into<String>, status: ReportStatus) -> Self {
        self.writes.push(Write::SetReportStatus {
            report_id: report_id.into(),
            status,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the document does not exist.
    async fn get_document(&self, id: &str) -> anyhow::Result<Option<CatalogRecord>>;

    async fn fetch_all_documents(&self) -> anyhow::Result<Vec<CatalogRecord>>;

    async fn fetch_pending_reports(&self) -> anyhow::Result<Vec<ModerationReport>>;

    /// Apply every write in `batch`, or none. Deleting a missing document or
    /// re-setting a status is a no-op, not an error.
    async fn commit(&self, batch: WriteBatch) -> anyhow::Result<()>;

    /// Single-field, non-transactional status update.
    async fn set_report_status(&self, report_id: &str, status: ReportStatus) -> anyhow::Result<()>;

    async fn create_report(&self, report: &ModerationReport) -> anyhow::Result<()>;

    async fn count(&self, collection: Collection) -> anyhow::Result<u64>;
}
