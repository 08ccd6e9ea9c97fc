//! Catalog read/refresh surface used by screens.
//!
//! Reads always come from the local cache as live [`CacheView`]s; the
//! network is only touched through the sync coordinator.

use std::sync::Arc;

use docshare_shared::constants::{DOC_TYPE_EXAM, NEW_DOCUMENTS_LIMIT};
use docshare_shared::time::now_millis;
use docshare_shared::{CatalogRecord, ModerationError, ModerationReport, ReportStatus, SyncError};
use docshare_store::{CacheView, LocalCache};
use docshare_sync::{DocumentStore, RefreshResult, SyncCoordinator, SyncState};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::ActorContext;

#[derive(Clone)]
pub struct DocumentRepository {
    cache: Arc<LocalCache>,
    coordinator: SyncCoordinator,
    store: Arc<dyn DocumentStore>,
    actor: Arc<dyn ActorContext>,
}

impl DocumentRepository {
    pub fn new(
        cache: Arc<LocalCache>,
        coordinator: SyncCoordinator,
        store: Arc<dyn DocumentStore>,
        actor: Arc<dyn ActorContext>,
    ) -> Self {
        Self {
            cache,
            coordinator,
            store,
            actor,
        }
    }

    pub fn get_all_documents(&self) -> CacheView<Vec<CatalogRecord>> {
        self.cache.query_all()
    }

    pub fn get_document_by_id(&self, id: &str) -> CacheView<Option<CatalogRecord>> {
        self.cache.query_by_id(id)
    }

    pub fn get_new_documents(&self) -> CacheView<Vec<CatalogRecord>> {
        self.cache.query_newest(NEW_DOCUMENTS_LIMIT)
    }

    pub fn get_exam_documents(&self) -> CacheView<Vec<CatalogRecord>> {
        self.cache.query_by_type(DOC_TYPE_EXAM)
    }

    pub fn search_documents(&self, query: &str) -> Vec<CatalogRecord> {
        self.cache.search_by_title_or_type(query)
    }

    pub async fn refresh_documents_if_stale(&self) -> RefreshResult {
        self.coordinator.refresh_if_stale().await
    }

    /// Pull-to-refresh: fetch even when the cache is fresh.
    pub async fn refresh_now(&self) -> RefreshResult {
        self.coordinator.refresh_now().await
    }

    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.coordinator.state()
    }

    pub fn last_sync_error(&self) -> watch::Receiver<Option<SyncError>> {
        self.coordinator.last_error()
    }

    /// File a pending report against `document_id` as the signed-in user.
    pub async fn report_document(
        &self,
        document_id: &str,
        reason: &str,
    ) -> Result<ModerationReport, ModerationError> {
        let actor = self
            .actor
            .current_actor()
            .ok_or(ModerationError::NotSignedIn)?;

        let report = ModerationReport {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            reason: reason.trim().to_string(),
            reporter_id: actor.id,
            created_at: now_millis(),
            status: ReportStatus::Pending,
        };

        self.store.create_report(&report).await.map_err(|e| {
            warn!(document_id, error = %e, "failed to file report");
            ModerationError::Update(e.to_string())
        })?;

        info!(report_id = %report.id, document_id, "report filed");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use docshare_shared::constants::{DEFAULT_FETCH_TIMEOUT, DEFAULT_STALENESS_THRESHOLD};
    use docshare_store::MemoryKv;
    use docshare_sync::{ManualClock, MemoryRemote, RefreshOutcome, StalenessPolicy};

    use crate::auth::StaticActor;

    fn record(id: &str, doc_type: &str, created_at: i64) -> CatalogRecord {
        CatalogRecord {
            id: id.to_string(),
            title: format!("Tài liệu {id}"),
            doc_type: doc_type.to_string(),
            created_at,
            ..Default::default()
        }
    }

    struct Fixture {
        remote: Arc<MemoryRemote>,
        clock: Arc<ManualClock>,
        repo: DocumentRepository,
    }

    fn fixture(actor: StaticActor) -> Fixture {
        let remote = Arc::new(MemoryRemote::new());
        let cache = Arc::new(LocalCache::in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(1_000_000_000));
        let policy = Arc::new(StalenessPolicy::load(
            Arc::new(MemoryKv::new()),
            clock.clone(),
        ));
        let coordinator = SyncCoordinator::with_timeouts(
            remote.clone(),
            cache.clone(),
            policy,
            DEFAULT_STALENESS_THRESHOLD,
            DEFAULT_FETCH_TIMEOUT,
        );
        let repo = DocumentRepository::new(cache, coordinator, remote.clone(), Arc::new(actor));
        Fixture {
            remote,
            clock,
            repo,
        }
    }

    fn ids(records: &[CatalogRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn refresh_replaces_what_views_show() {
        let f = fixture(StaticActor::anonymous());
        f.remote.upsert_document(record("1", "slides", 1));
        let mut all = f.repo.get_all_documents();
        assert!(all.next().await.unwrap().is_empty());

        f.repo.refresh_documents_if_stale().await.unwrap();
        assert_eq!(ids(&all.next().await.unwrap()), vec!["1"]);

        // The remote now only has record 2.
        f.remote
            .commit(docshare_sync::WriteBatch::new().delete_document("1"))
            .await
            .unwrap();
        f.remote.upsert_document(record("2", "slides", 2));
        f.clock.advance(DEFAULT_STALENESS_THRESHOLD + Duration::from_secs(1));

        f.repo.refresh_documents_if_stale().await.unwrap();
        assert_eq!(ids(&all.next().await.unwrap()), vec!["2"]);
    }

    #[tokio::test]
    async fn fresh_cache_skips_network_until_forced() {
        let f = fixture(StaticActor::anonymous());
        f.repo.refresh_documents_if_stale().await.unwrap();

        assert_eq!(
            f.repo.refresh_documents_if_stale().await,
            Ok(RefreshOutcome::Fresh)
        );
        assert_eq!(f.remote.fetch_count(), 1);

        f.repo.refresh_now().await.unwrap();
        assert_eq!(f.remote.fetch_count(), 2);
    }

    #[tokio::test]
    async fn offline_refresh_keeps_cached_rows() {
        let f = fixture(StaticActor::anonymous());
        f.remote.upsert_document(record("1", "slides", 1));
        f.repo.refresh_documents_if_stale().await.unwrap();

        f.remote.set_offline(true);
        assert_eq!(f.repo.refresh_now().await, Err(SyncError::Network));
        assert_eq!(ids(&f.repo.get_all_documents().current()), vec!["1"]);
        assert_eq!(*f.repo.last_sync_error().borrow(), Some(SyncError::Network));
    }

    #[tokio::test]
    async fn subsets_follow_the_cache() {
        let f = fixture(StaticActor::anonymous());
        for i in 0..12 {
            let doc_type = if i % 4 == 0 { DOC_TYPE_EXAM } else { "slides" };
            f.remote.upsert_document(record(&format!("d{i}"), doc_type, 100 + i));
        }
        f.repo.refresh_documents_if_stale().await.unwrap();

        let newest = f.repo.get_new_documents().current();
        assert_eq!(newest.len(), NEW_DOCUMENTS_LIMIT);
        assert_eq!(newest[0].id, "d11");

        assert_eq!(ids(&f.repo.get_exam_documents().current()), vec!["d0", "d4", "d8"]);
        assert_eq!(f.repo.search_documents("EXAM").len(), 3);
        assert_eq!(
            f.repo.get_document_by_id("d4").current().map(|r| r.doc_type),
            Some(DOC_TYPE_EXAM.to_string())
        );
    }

    #[tokio::test]
    async fn report_is_filed_as_current_actor() {
        let f = fixture(StaticActor::new("u7", "Minh"));

        let report = f.repo.report_document("d1", "  spam ").await.unwrap();

        let stored = f.remote.report(&report.id).unwrap();
        assert_eq!(stored.reporter_id, "u7");
        assert_eq!(stored.reason, "spam");
        assert_eq!(stored.status, ReportStatus::Pending);
        assert!(stored.created_at > 0);
    }

    #[tokio::test]
    async fn anonymous_user_cannot_report() {
        let f = fixture(StaticActor::anonymous());
        assert_eq!(
            f.repo.report_document("d1", "spam").await,
            Err(ModerationError::NotSignedIn)
        );
    }
}
