//! Home screen state.
//!
//! The home feed combines the catalog cache with the sync coordinator's
//! status so a screen renders one immutable [`HomeSnapshot`] instead of
//! stitching four streams together.

use std::time::Duration;

use docshare_shared::constants::{DOC_TYPE_EXAM, NEW_DOCUMENTS_LIMIT};
use docshare_shared::{CatalogRecord, SyncError};
use docshare_store::LocalCache;
use docshare_sync::{AggregatorBuilder, ReactiveAggregator, SyncCoordinator, SyncState};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HomeSnapshot {
    pub new_documents: Vec<CatalogRecord>,
    pub exam_documents: Vec<CatalogRecord>,
    pub is_loading: bool,
    pub error: Option<SyncError>,
}

pub fn home_feed(
    cache: &LocalCache,
    coordinator: &SyncCoordinator,
    grace: Duration,
) -> ReactiveAggregator<HomeSnapshot> {
    let newest = cache.query_newest(NEW_DOCUMENTS_LIMIT);
    let exams = cache.query_by_type(DOC_TYPE_EXAM);
    let state = coordinator.state();
    let error = coordinator.last_error();

    AggregatorBuilder::new("home")
        .grace(grace)
        .input(newest.changes())
        .input(state.clone())
        .input(error.clone())
        .build(move || HomeSnapshot {
            new_documents: newest.current(),
            exam_documents: exams.current(),
            is_loading: *state.borrow() == SyncState::Refreshing,
            error: error.borrow().clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use docshare_shared::constants::{DEFAULT_FETCH_TIMEOUT, DEFAULT_STALENESS_THRESHOLD};
    use docshare_store::MemoryKv;
    use docshare_sync::{ManualClock, MemoryRemote, StalenessPolicy};

    const GRACE: Duration = Duration::from_millis(5000);

    fn setup() -> (Arc<MemoryRemote>, SyncCoordinator, ReactiveAggregator<HomeSnapshot>) {
        let remote = Arc::new(MemoryRemote::with_documents(vec![
            CatalogRecord {
                id: "e1".into(),
                doc_type: DOC_TYPE_EXAM.into(),
                created_at: 5,
                ..Default::default()
            },
            CatalogRecord {
                id: "s1".into(),
                doc_type: "slides".into(),
                created_at: 9,
                ..Default::default()
            },
        ]));
        let cache = Arc::new(LocalCache::in_memory().unwrap());
        let policy = Arc::new(StalenessPolicy::load(
            Arc::new(MemoryKv::new()),
            Arc::new(ManualClock::new(1_000_000_000)),
        ));
        let coordinator = SyncCoordinator::with_timeouts(
            remote.clone(),
            cache.clone(),
            policy,
            DEFAULT_STALENESS_THRESHOLD,
            DEFAULT_FETCH_TIMEOUT,
        );
        let feed = home_feed(&cache, &coordinator, GRACE);
        (remote, coordinator, feed)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_cache_gives_empty_snapshot() {
        let (_remote, _coordinator, feed) = setup();
        let sub = feed.subscribe();
        assert_eq!(sub.current().as_deref(), Some(&HomeSnapshot::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_fills_both_sections() {
        let (_remote, coordinator, feed) = setup();
        let mut sub = feed.subscribe();

        coordinator.refresh_if_stale().await.unwrap();
        let snapshot = loop {
            let snapshot = sub.next().await.unwrap();
            if !snapshot.is_loading && !snapshot.new_documents.is_empty() {
                break snapshot;
            }
        };

        let newest: Vec<_> = snapshot.new_documents.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(newest, vec!["s1", "e1"]);
        assert_eq!(snapshot.exam_documents.len(), 1);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_surfaces_error() {
        let (remote, coordinator, feed) = setup();
        let mut sub = feed.subscribe();
        remote.set_offline(true);

        let _ = coordinator.refresh_now().await;
        let snapshot = loop {
            let snapshot = sub.next().await.unwrap();
            if snapshot.error.is_some() {
                break snapshot;
            }
        };

        assert_eq!(snapshot.error, Some(SyncError::Network));
        assert!(snapshot.new_documents.is_empty());
    }
}
