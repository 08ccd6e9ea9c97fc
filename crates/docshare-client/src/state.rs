//! Application state shared by every screen and by the sync agent.
//!
//! [`AppState`] wires the local cache, the refresh bookkeeping, the remote
//! adapter and the repositories together once at startup. Everything inside
//! is cheap to clone or already behind an `Arc`.

use std::sync::Arc;

use anyhow::Context;
use docshare_shared::constants::DEFAULT_STALENESS_THRESHOLD;
use docshare_store::{Database, KeyValueStore, LocalCache, SettingsStore};
use docshare_sync::{
    BlobStorage, CatalogSource, Clock, DocumentStore, ModerationTransaction, ReactiveAggregator,
    RemoteClient, StalenessPolicy, SyncCoordinator, SystemClock,
};
use tracing::info;

use crate::admin::AdminRepository;
use crate::auth::{ActorContext, StaticActor};
use crate::config::ClientConfig;
use crate::home::{home_feed, HomeSnapshot};
use crate::repository::DocumentRepository;

/// Central application state.
pub struct AppState {
    pub config: ClientConfig,

    /// Local catalog; the only thing screens read from.
    pub cache: Arc<LocalCache>,

    pub coordinator: SyncCoordinator,

    pub documents: DocumentRepository,

    pub admin: AdminRepository,

    /// Lazily started home screen state.
    pub home: ReactiveAggregator<HomeSnapshot>,
}

impl AppState {
    /// Open the on-disk cache and connect to the configured API.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: ClientConfig) -> anyhow::Result<Self> {
        let path = match &config.db_path {
            Some(path) => path.clone(),
            None => Database::default_path().context("no data directory for the catalog cache")?,
        };
        info!(path = %path.display(), "opening catalog cache");

        let cache = Arc::new(LocalCache::open(Database::open_at(&path)?)?);
        let kv = Arc::new(SettingsStore::open_at(&path)?);
        let remote = Arc::new(RemoteClient::new(
            &config.api_url,
            config.api_token.clone(),
            config.fetch_timeout,
        )?);
        let actor = actor_from_config(&config);

        Ok(Self::assemble(config, cache, kv, Arc::new(SystemClock), remote, actor))
    }

    /// Wire the state from already constructed parts.
    pub fn assemble<R>(
        config: ClientConfig,
        cache: Arc<LocalCache>,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        remote: Arc<R>,
        actor: Arc<dyn ActorContext>,
    ) -> Self
    where
        R: CatalogSource + DocumentStore + BlobStorage + 'static,
    {
        let policy = Arc::new(StalenessPolicy::load(kv, clock));
        let coordinator = SyncCoordinator::with_timeouts(
            remote.clone(),
            cache.clone(),
            policy.clone(),
            DEFAULT_STALENESS_THRESHOLD,
            config.fetch_timeout,
        );

        let moderation = Arc::new(ModerationTransaction::new(
            remote.clone(),
            remote.clone(),
            cache.clone(),
            policy,
        ));

        let documents =
            DocumentRepository::new(cache.clone(), coordinator.clone(), remote.clone(), actor);
        let admin = AdminRepository::new(remote, moderation);
        let home = home_feed(&cache, &coordinator, config.aggregator_grace);

        Self {
            config,
            cache,
            coordinator,
            documents,
            admin,
            home,
        }
    }
}

fn actor_from_config(config: &ClientConfig) -> Arc<dyn ActorContext> {
    match &config.actor_id {
        Some(id) => Arc::new(StaticActor::new(id.clone(), config.actor_name.clone())),
        None => Arc::new(StaticActor::anonymous()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshare_shared::CatalogRecord;
    use docshare_store::MemoryKv;
    use docshare_sync::{ManualClock, MemoryRemote, RefreshOutcome};

    #[tokio::test]
    async fn assembled_state_syncs_and_moderates() {
        let remote = Arc::new(MemoryRemote::with_documents(vec![CatalogRecord {
            id: "d1".into(),
            ..Default::default()
        }]));
        let state = AppState::assemble(
            ClientConfig::default(),
            Arc::new(LocalCache::in_memory().unwrap()),
            Arc::new(MemoryKv::new()),
            Arc::new(ManualClock::new(1_000_000_000)),
            remote.clone(),
            Arc::new(StaticActor::new("u1", "An")),
        );

        assert_eq!(
            state.documents.refresh_documents_if_stale().await,
            Ok(RefreshOutcome::Refreshed { records: 1 })
        );
        assert_eq!(state.cache.len(), 1);

        let report = state.documents.report_document("d1", "spam").await.unwrap();
        state
            .admin
            .delete_document_and_resolve_report("d1", &report.id)
            .await
            .unwrap();

        assert!(state.cache.is_empty());
        assert!(state.coordinator.policy().is_stale_default());
    }

    #[tokio::test]
    async fn refresh_time_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            db_path: Some(dir.path().join("docshare.db")),
            api_url: "http://127.0.0.1:9/api".to_string(),
            ..ClientConfig::default()
        };

        {
            let state = AppState::open(config.clone()).unwrap();
            state.coordinator.policy().mark_refreshed(42).unwrap();
        }

        let state = AppState::open(config).unwrap();
        assert_eq!(state.coordinator.policy().last_refresh_at(), 42);
    }
}
