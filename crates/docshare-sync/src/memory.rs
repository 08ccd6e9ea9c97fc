//! In-process remote.
//!
//! [`MemoryRemote`] implements the catalog source, document store and blob
//! storage seams against in-memory state. Batches are validated and applied
//! on a copy that is swapped in only when every write succeeded, so commits
//! are all-or-nothing. Connectivity loss and rejected commits can be switched
//! on to exercise failure paths.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use docshare_shared::{CatalogRecord, ModerationReport, ReportStatus};
use reqwest::Url;

use crate::blobs::BlobStorage;
use crate::documents::{Collection, DocumentStore, Write, WriteBatch};
use crate::source::CatalogSource;

#[derive(Debug, Default, Clone)]
struct State {
    documents: Vec<CatalogRecord>,
    reports: Vec<ModerationReport>,
    blobs: HashSet<String>,
    counts: HashMap<Collection, u64>,
}

impl State {
    fn apply(&mut self, write: &Write) -> anyhow::Result<()> {
        match write {
            Write::DeleteDocument { document_id } => {
                self.documents.retain(|d| &d.id != document_id);
                Ok(())
            }
            Write::SetReportStatus { report_id, status } => {
                let report = self
                    .reports
                    .iter_mut()
                    .find(|r| &r.id == report_id)
                    .ok_or_else(|| anyhow!("report {report_id} not found"))?;
                report.status = *status;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
    offline: AtomicBool,
    reject_commits: AtomicBool,
    fetches: AtomicUsize,
    commits: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<CatalogRecord>) -> Self {
        let remote = Self::new();
        remote.lock().documents = documents;
        remote
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State stays consistent even if a holder panicked: writes are swapped in whole.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(ErrorKind::ConnectionRefused, "remote unreachable").into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Seeding and inspection
    // ------------------------------------------------------------------

    pub fn upsert_document(&self, record: CatalogRecord) {
        let mut state = self.lock();
        match state.documents.iter_mut().find(|d| d.id == record.id) {
            Some(existing) => *existing = record,
            None => state.documents.push(record),
        }
    }

    pub fn insert_report(&self, report: ModerationReport) {
        self.lock().reports.push(report);
    }

    pub fn insert_blob(&self, url: &str) {
        self.lock().blobs.insert(url.to_string());
    }

    pub fn set_count(&self, collection: Collection, count: u64) {
        self.lock().counts.insert(collection, count);
    }

    pub fn document(&self, id: &str) -> Option<CatalogRecord> {
        self.lock().documents.iter().find(|d| d.id == id).cloned()
    }

    pub fn report(&self, id: &str) -> Option<ModerationReport> {
        self.lock().reports.iter().find(|r| r.id == id).cloned()
    }

    pub fn has_blob(&self, url: &str) -> bool {
        self.lock().blobs.contains(url)
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn reject_commits(&self, reject: bool) {
        self.reject_commits.store(reject, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for MemoryRemote {
    async fn fetch_all(&self) -> anyhow::Result<Vec<CatalogRecord>> {
        self.fetch_all_documents().await
    }
}

#[async_trait]
impl DocumentStore for MemoryRemote {
    async fn get_document(&self, id: &str) -> anyhow::Result<Option<CatalogRecord>> {
        self.check_online()?;
        Ok(self.document(id))
    }

    async fn fetch_all_documents(&self) -> anyhow::Result<Vec<CatalogRecord>> {
        self.check_online()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().documents.clone())
    }

    async fn fetch_pending_reports(&self) -> anyhow::Result<Vec<ModerationReport>> {
        self.check_online()?;
        Ok(self
            .lock()
            .reports
            .iter()
            .filter(|r| r.status == ReportStatus::Pending)
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> anyhow::Result<()> {
        self.check_online()?;
        if self.reject_commits.load(Ordering::SeqCst) {
            bail!("commit rejected by remote");
        }

        let mut state = self.lock();
        let mut staged = state.clone();
        for write in &batch.writes {
            staged.apply(write)?;
        }
        *state = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_report_status(&self, report_id: &str, status: ReportStatus) -> anyhow::Result<()> {
        self.check_online()?;
        self.lock().apply(&Write::SetReportStatus {
            report_id: report_id.to_string(),
            status,
        })
    }

    async fn create_report(&self, report: &ModerationReport) -> anyhow::Result<()> {
        self.check_online()?;
        self.insert_report(report.clone());
        Ok(())
    }

    async fn count(&self, collection: Collection) -> anyhow::Result<u64> {
        self.check_online()?;
        let state = self.lock();
        Ok(match collection {
            Collection::Documents => state.documents.len() as u64,
            Collection::Reports => state.reports.len() as u64,
            other => state.counts.get(&other).copied().unwrap_or(0),
        })
    }
}

#[async_trait]
impl BlobStorage for MemoryRemote {
    async fn delete_by_reference(&self, url: &Url) -> anyhow::Result<()> {
        self.check_online()?;
        if !self.lock().blobs.remove(url.as_str()) {
            bail!("blob {url} does not exist");
        }
        Ok(())
    }
}
