//! Catalog refresh orchestration.
//!
//! [`SyncCoordinator`] is a two-state machine (`Idle` / `Refreshing`) that
//! guarantees at most one refresh in flight. Callers that ask for a refresh
//! while one is running join it and receive the same result; only one network
//! call is made however many callers ask.
//!
//! The refresh itself runs as its own task, so a caller that goes away does
//! not abort a half-applied refresh. A failed refresh never touches the cache.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use docshare_shared::constants::{DEFAULT_FETCH_TIMEOUT, DEFAULT_STALENESS_THRESHOLD};
use docshare_shared::SyncError;
use docshare_store::LocalCache;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::source::CatalogSource;
use crate::staleness::StalenessPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache was fresh enough; nothing was fetched.
    Fresh,
    /// The cache now holds `records` rows from a new fetch.
    Refreshed { records: usize },
}

pub type RefreshResult = Result<RefreshOutcome, SyncError>;

type InFlight = watch::Receiver<Option<RefreshResult>>;

#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn CatalogSource>,
    cache: Arc<LocalCache>,
    policy: Arc<StalenessPolicy>,
    threshold: Duration,
    fetch_timeout: Duration,
    /// `Some` while a refresh runs. Never held across an await.
    in_flight: Mutex<Option<InFlight>>,
    state: watch::Sender<SyncState>,
    last_error: watch::Sender<Option<SyncError>>,
}

impl SyncCoordinator {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        cache: Arc<LocalCache>,
        policy: Arc<StalenessPolicy>,
    ) -> Self {
        Self::with_timeouts(
            source,
            cache,
            policy,
            DEFAULT_STALENESS_THRESHOLD,
            DEFAULT_FETCH_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        source: Arc<dyn CatalogSource>,
        cache: Arc<LocalCache>,
        policy: Arc<StalenessPolicy>,
        threshold: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        let (last_error, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                source,
                cache,
                policy,
                threshold,
                fetch_timeout,
                in_flight: Mutex::new(None),
                state,
                last_error,
            }),
        }
    }

    /// Refresh the catalog if it is older than the staleness threshold.
    ///
    /// Returns `Ok(Fresh)` without any I/O in the common case. Fails only
    /// when a fetch was actually attempted and failed.
    pub async fn refresh_if_stale(&self) -> RefreshResult {
        if !self.inner.policy.is_stale(self.inner.threshold) {
            return Ok(RefreshOutcome::Fresh);
        }
        self.join_or_start(true).await
    }

    /// Refresh regardless of staleness, still coalescing with a running one.
    pub async fn refresh_now(&self) -> RefreshResult {
        self.join_or_start(false).await
    }

    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        *self.inner.state.borrow() == SyncState::Refreshing
    }

    /// Error of the most recent attempt; cleared by the next success.
    pub fn last_error(&self) -> watch::Receiver<Option<SyncError>> {
        self.inner.last_error.subscribe()
    }

    pub fn policy(&self) -> &Arc<StalenessPolicy> {
        &self.inner.policy
    }

    async fn join_or_start(&self, only_if_stale: bool) -> RefreshResult {
        let mut rx = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .map_err(|_| SyncError::Unknown("refresh gate poisoned".to_string()))?;

            match in_flight.as_ref() {
                Some(rx) => {
                    debug!("joining in-flight refresh");
                    rx.clone()
                }
                None => {
                    // A refresh may have finished between the caller's check and now.
                    if only_if_stale && !self.inner.policy.is_stale(self.inner.threshold) {
                        return Ok(RefreshOutcome::Fresh);
                    }
                    let (tx, rx) = watch::channel(None);
                    *in_flight = Some(rx.clone());
                    self.inner.state.send_replace(SyncState::Refreshing);
                    tokio::spawn(self.inner.clone().run(tx));
                    rx
                }
            }
        };

        // Clone out of the watch guard before `rx` goes out of scope.
        let finished = rx.wait_for(Option::is_some).await.map(|result| result.clone());
        match finished {
            Ok(result) => result
                .unwrap_or_else(|| Err(SyncError::Unknown("refresh produced no result".into()))),
            Err(_) => Err(SyncError::Unknown("refresh task ended abnormally".into())),
        }
    }
}

impl Inner {
    async fn run(self: Arc<Self>, tx: watch::Sender<Option<RefreshResult>>) {
        let result = self.refresh_once().await;

        match &result {
            Ok(_) => self.last_error.send_replace(None),
            Err(e) => self.last_error.send_replace(Some(e.clone())),
        };

        if let Ok(mut in_flight) = self.in_flight.lock() {
            *in_flight = None;
        }
        self.state.send_replace(SyncState::Idle);
        tx.send_replace(Some(result));
    }

    async fn refresh_once(&self) -> RefreshResult {
        let ticket = self.cache.begin_replace().map_err(|e| {
            error!(error = %e, "catalog cache unavailable");
            SyncError::Unknown(e.to_string())
        })?;

        info!("fetching catalog");
        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.fetch_all()).await;
        if !matches!(fetched, Ok(Ok(_))) {
            if let Err(e) = self.cache.abandon_replace(ticket) {
                warn!(error = %e, "could not release replace ticket");
            }
        }
        let records = match fetched {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                let classified = classify(&e);
                warn!(error = %e, %classified, "catalog fetch failed, keeping cached rows");
                return Err(classified);
            }
            Err(elapsed) => {
                let classified = classify(&anyhow::Error::new(elapsed));
                warn!(
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "catalog fetch timed out, keeping cached rows"
                );
                return Err(classified);
            }
        };

        let written = self.cache.replace_all_since(ticket, &records).map_err(|e| {
            error!(error = %e, "failed to replace catalog cache");
            SyncError::Unknown(e.to_string())
        })?;

        // Not reached on process death: the next check sees stale and refetches.
        if let Err(e) = self.policy.mark_refreshed(self.policy.now_millis()) {
            warn!(error = %e, "catalog replaced but refresh time not recorded");
        }

        info!(records = written, "catalog refreshed");
        Ok(RefreshOutcome::Refreshed { records: written })
    }
}
