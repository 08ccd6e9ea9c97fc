//! Refresh bookkeeping.
//!
//! [`StalenessPolicy`] owns the "last successful refresh" timestamp. It is
//! constructed explicitly from a durable [`KeyValueStore`] at startup (0 when
//! nothing was persisted) and handed to the sync coordinator; there is no
//! process-global state.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docshare_shared::constants::{DEFAULT_STALENESS_THRESHOLD, KEY_LAST_REFRESH_AT};
use docshare_shared::time::now_millis;
use docshare_store::{KeyValueStore, StoreError};
use tracing::{debug, warn};

/// Source of wall-clock time in epoch millis.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        now_millis()
    }
}

/// Manually advanced clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub struct StalenessPolicy {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    last_refresh_at: AtomicI64,
}

impl StalenessPolicy {
    /// Load the persisted refresh time. An unreadable value counts as "never
    /// refreshed", which only costs one extra fetch.
    pub fn load(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let persisted = match kv.get_i64(KEY_LAST_REFRESH_AT) {
            Ok(value) => value.unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "unreadable refresh state, treating catalog as stale");
                0
            }
        };
        debug!(last_refresh_at = persisted, "refresh state loaded");

        Self {
            kv,
            clock,
            last_refresh_at: AtomicI64::new(persisted),
        }
    }

    pub fn last_refresh_at(&self) -> i64 {
        self.last_refresh_at.load(Ordering::SeqCst)
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// `now - last_refresh_at > threshold`.
    pub fn is_stale(&self, threshold: Duration) -> bool {
        let age = self.clock.now_millis() - self.last_refresh_at();
        age > threshold.as_millis() as i64
    }

    pub fn is_stale_default(&self) -> bool {
        self.is_stale(DEFAULT_STALENESS_THRESHOLD)
    }

    /// Persist `at`, then publish it in memory. If the write fails the
    /// in-memory value is left alone, so the catalog stays stale.
    pub fn mark_refreshed(&self, at: i64) -> Result<(), StoreError> {
        self.kv.set_i64(KEY_LAST_REFRESH_AT, at)?;
        self.last_refresh_at.store(at, Ordering::SeqCst);
        Ok(())
    }

    /// Force the next staleness check to report stale.
    pub fn invalidate(&self) {
        self.last_refresh_at.store(0, Ordering::SeqCst);
        if let Err(e) = self.kv.set_i64(KEY_LAST_REFRESH_AT, 0) {
            // In-memory value is already reset; a restart may skip one refresh.
            warn!(error = %e, "failed to persist refresh invalidation");
        }
    }
}
