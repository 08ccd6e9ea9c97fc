//! Cross-store moderation.
//!
//! A takedown touches three stores. Blob removal comes first and is
//! best-effort; the consistency boundary is the single atomic batch that
//! deletes the catalog document and resolves its report together. Blob
//! deletions are never rolled back: the worst case is a surviving document
//! row pointing at a missing blob, never a deleted row leaking a live blob.
//!
//! Retrying a failed takedown is safe. Missing blobs are tolerated and the
//! batch is idempotent at the store.

use std::sync::Arc;

use docshare_shared::{ModerationError, ModerationReport, ReportStatus};
use docshare_store::LocalCache;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::blobs::{cleanup_blobs, BlobStorage, CleanupSummary};
use crate::documents::{DocumentStore, WriteBatch};
use crate::staleness::StalenessPolicy;

pub struct ModerationTransaction {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStorage>,
    cache: Arc<LocalCache>,
    policy: Arc<StalenessPolicy>,
    pending: watch::Sender<Vec<ModerationReport>>,
}

impl ModerationTransaction {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStorage>,
        cache: Arc<LocalCache>,
        policy: Arc<StalenessPolicy>,
    ) -> Self {
        let (pending, _) = watch::channel(Vec::new());
        Self {
            store,
            blobs,
            cache,
            policy,
            pending,
        }
    }

    /// Fetch pending reports from the remote and publish them to watchers.
    pub async fn pending_reports(&self) -> Result<Vec<ModerationReport>, ModerationError> {
        let reports = self.store.fetch_pending_reports().await.map_err(|e| {
            warn!(error = %e, "failed to fetch pending reports");
            ModerationError::Fetch(e.to_string())
        })?;
        self.pending.send_replace(reports.clone());
        Ok(reports)
    }

    /// Last fetched pending list, kept current across takedowns and dismissals.
    pub fn watch_pending_reports(&self) -> watch::Receiver<Vec<ModerationReport>> {
        self.pending.subscribe()
    }

    /// Remove `document_id` everywhere and resolve `report_id`, as one action.
    pub async fn takedown(
        &self,
        document_id: &str,
        report_id: &str,
    ) -> Result<CleanupSummary, ModerationError> {
        // 1. Blob references: the cache first, the remote as a fallback.
        let record = match self.cache.get(document_id) {
            Some(record) => Some(record),
            None => match self.store.get_document(document_id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(document_id, error = %e, "could not load document for blob cleanup");
                    None
                }
            },
        };

        // 2. Advisory blob cleanup.
        let summary = match &record {
            Some(record) => cleanup_blobs(self.blobs.as_ref(), record.blob_refs()).await,
            None => CleanupSummary::default(),
        };

        // 3. The consistency boundary.
        let batch = WriteBatch::new()
            .delete_document(document_id)
            .set_report_status(report_id, ReportStatus::Resolved);
        if let Err(e) = self.store.commit(batch).await {
            error!(document_id, report_id, error = %e, "takedown commit failed");
            return Err(ModerationError::Commit(e.to_string()));
        }

        // 4. Reflect the removal locally without waiting for the next sync.
        if let Err(e) = self.cache.delete_by_id(document_id) {
            // Remote is already consistent; the invalidated refresh repairs the cache.
            error!(document_id, error = %e, "failed to drop taken-down record from cache");
        }
        self.policy.invalidate();
        self.forget_report(report_id);

        info!(
            document_id,
            report_id,
            blobs_deleted = summary.deleted,
            blobs_failed = summary.failed,
            "document taken down"
        );
        Ok(summary)
    }

    /// Close a report without touching the document.
    pub async fn dismiss(&self, report_id: &str) -> Result<(), ModerationError> {
        self.store
            .set_report_status(report_id, ReportStatus::Dismissed)
            .await
            .map_err(|e| {
                warn!(report_id, error = %e, "failed to dismiss report");
                ModerationError::Update(e.to_string())
            })?;
        self.forget_report(report_id);
        info!(report_id, "report dismissed");
        Ok(())
    }

    fn forget_report(&self, report_id: &str) {
        self.pending.send_modify(|reports| reports.retain(|r| r.id != report_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshare_shared::CatalogRecord;
    use docshare_store::MemoryKv;

    use crate::memory::MemoryRemote;
    use crate::staleness::ManualClock;

    const COVER: &str = "https://cdn.example.com/covers/d1.png";
    const FILE: &str = "https://cdn.example.com/files/d1.pdf";

    struct Fixture {
        remote: Arc<MemoryRemote>,
        cache: Arc<LocalCache>,
        policy: Arc<StalenessPolicy>,
        tx: ModerationTransaction,
    }

    fn document(id: &str, cover: &str, file: &str) -> CatalogRecord {
        CatalogRecord {
            id: id.to_string(),
            title: "Mạng máy tính".to_string(),
            doc_type: "slides".to_string(),
            cover_image_ref: cover.to_string(),
            file_ref: file.to_string(),
            ..Default::default()
        }
    }

    fn report(id: &str, document_id: &str) -> ModerationReport {
        ModerationReport {
            id: id.to_string(),
            document_id: document_id.to_string(),
            reason: "copyright".to_string(),
            reporter_id: "u2".to_string(),
            created_at: 1,
            status: ReportStatus::Pending,
        }
    }

    fn fixture(docs: Vec<CatalogRecord>) -> Fixture {
        let remote = Arc::new(MemoryRemote::with_documents(docs.clone()));
        remote.insert_report(report("r1", "d1"));
        remote.insert_blob(COVER);
        remote.insert_blob(FILE);

        let cache = Arc::new(LocalCache::in_memory().unwrap());
        cache.replace_all(&docs).unwrap();

        let clock = Arc::new(ManualClock::new(1_000_000));
        let policy = Arc::new(StalenessPolicy::load(Arc::new(MemoryKv::new()), clock));
        policy.mark_refreshed(1_000_000).unwrap();

        let tx = ModerationTransaction::new(
            remote.clone(),
            remote.clone(),
            cache.clone(),
            policy.clone(),
        );
        Fixture {
            remote,
            cache,
            policy,
            tx,
        }
    }

    #[tokio::test]
    async fn takedown_removes_document_and_resolves_report() {
        let f = fixture(vec![document("d1", COVER, FILE), document("d2", "", "")]);
        f.tx.pending_reports().await.unwrap();

        let summary = f.tx.takedown("d1", "r1").await.unwrap();

        assert_eq!(summary.deleted, 2);
        assert!(f.remote.document("d1").is_none());
        assert_eq!(f.remote.report("r1").unwrap().status, ReportStatus::Resolved);
        assert!(!f.remote.has_blob(COVER));
        assert!(!f.remote.has_blob(FILE));
        assert!(f.cache.get("d1").is_none());
        assert!(f.cache.get("d2").is_some());
        assert!(f.policy.is_stale_default());
        assert!(f.tx.watch_pending_reports().borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_commit_leaves_document_and_report_untouched() {
        let f = fixture(vec![document("d1", COVER, FILE)]);
        f.remote.reject_commits(true);

        let result = f.tx.takedown("d1", "r1").await;

        assert!(matches!(result, Err(ModerationError::Commit(_))));
        assert!(f.remote.document("d1").is_some());
        assert_eq!(f.remote.report("r1").unwrap().status, ReportStatus::Pending);
        assert!(f.cache.get("d1").is_some());
        assert!(!f.policy.is_stale_default());
        // Blob cleanup already ran and is not undone.
        assert!(!f.remote.has_blob(FILE));
    }

    #[tokio::test]
    async fn retry_after_failure_succeeds() {
        let f = fixture(vec![document("d1", COVER, FILE)]);
        f.remote.reject_commits(true);
        assert!(f.tx.takedown("d1", "r1").await.is_err());

        f.remote.reject_commits(false);
        let summary = f.tx.takedown("d1", "r1").await.unwrap();

        // Both blobs were removed by the first attempt.
        assert_eq!(summary.failed, 2);
        assert!(f.remote.document("d1").is_none());
        assert_eq!(f.remote.report("r1").unwrap().status, ReportStatus::Resolved);
    }

    #[tokio::test]
    async fn empty_or_placeholder_refs_do_not_fail_takedown() {
        let f = fixture(vec![document("d1", "default_cover", "")]);

        let summary = f.tx.takedown("d1", "r1").await.unwrap();

        assert_eq!(summary.skipped, 2);
        assert!(f.remote.document("d1").is_none());
    }

    #[tokio::test]
    async fn uncached_document_is_cleaned_via_remote_lookup() {
        let f = fixture(vec![]);
        f.remote.upsert_document(document("d1", COVER, FILE));

        f.tx.takedown("d1", "r1").await.unwrap();

        assert!(!f.remote.has_blob(COVER));
        assert!(f.remote.document("d1").is_none());
    }

    #[tokio::test]
    async fn dismiss_only_touches_the_report() {
        let f = fixture(vec![document("d1", COVER, FILE)]);
        let revision = f.cache.revision();

        f.tx.dismiss("r1").await.unwrap();

        assert_eq!(f.remote.report("r1").unwrap().status, ReportStatus::Dismissed);
        assert!(f.remote.document("d1").is_some());
        assert!(f.remote.has_blob(FILE));
        assert_eq!(f.cache.revision(), revision);
        assert_eq!(f.remote.commit_count(), 0);
    }

    #[tokio::test]
    async fn offline_dismiss_reports_failure() {
        let f = fixture(vec![]);
        f.remote.set_offline(true);
        assert!(matches!(
            f.tx.dismiss("r1").await,
            Err(ModerationError::Update(_))
        ));
    }
}
