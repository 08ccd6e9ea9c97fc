//! Reactive local catalog cache.
//!
//! [`LocalCache`] is the single source of truth for UI reads. Every committed
//! write re-reads the table and publishes it as one immutable snapshot on a
//! `tokio::sync::watch` channel, so readers never take the database lock and
//! never observe a half-applied write.
//!
//! Writes serialize on one mutex. Bulk replacement is reserved for the sync
//! coordinator; single-row deletion is used by moderation. A deletion that
//! commits while a refresh fetch is in flight is tombstoned, and the replace
//! that follows drops the tombstoned ids instead of resurrecting them.
//! Tombstones live only as long as the open replace ticket.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use docshare_shared::time::now_millis;
use docshare_shared::CatalogRecord;
use futures::Stream;
use tokio::sync::watch;

use crate::database::Database;
use crate::error::{Result, StoreError};

type Snapshot = Arc<Vec<CatalogRecord>>;
type Projection<T> = Arc<dyn Fn(&[CatalogRecord]) -> T + Send + Sync>;

struct Writer {
    db: Database,
    /// Last ticket number handed out.
    epoch: u64,
    /// Ticket of the replace currently waiting on a fetch, if any.
    open_ticket: Option<u64>,
    /// Ids deleted since `open_ticket` was issued. Empty when no ticket is open.
    tombstones: HashSet<String>,
}

impl Writer {
    fn close_ticket(&mut self) {
        self.open_ticket = None;
        self.tombstones.clear();
    }
}

/// Proof that a replace was planned at a given point in the write history.
///
/// Obtain one with [`LocalCache::begin_replace`] *before* fetching, then hand
/// it to [`LocalCache::replace_all_since`] with the fetched records, or to
/// [`LocalCache::abandon_replace`] if the fetch failed. Only the most recently
/// issued ticket is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceTicket {
    epoch: u64,
}

pub struct LocalCache {
    writer: Mutex<Writer>,
    snapshot: watch::Sender<Snapshot>,
    revision: AtomicU64,
}

impl LocalCache {
    /// Wrap an open database, loading its current rows as the first snapshot.
    pub fn open(db: Database) -> Result<Self> {
        let rows = db.list_documents()?;
        tracing::debug!(rows = rows.len(), "catalog cache loaded");

        let (snapshot, _) = watch::channel(Arc::new(rows));
        Ok(Self {
            writer: Mutex::new(Writer {
                db,
                epoch: 0,
                open_ticket: None,
                tombstones: HashSet::new(),
            }),
            snapshot,
            revision: AtomicU64::new(0),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(Database::open_in_memory()?)
    }

    // ------------------------------------------------------------------
    // Reactive reads
    // ------------------------------------------------------------------

    /// Every record, in insertion order.
    pub fn query_all(&self) -> CacheView<Vec<CatalogRecord>> {
        self.view(|rows| rows.to_vec())
    }

    /// The record with `id`, or `None` while it is absent.
    pub fn query_by_id(&self, id: impl Into<String>) -> CacheView<Option<CatalogRecord>> {
        let id = id.into();
        self.view(move |rows| rows.iter().find(|r| r.id == id).cloned())
    }

    /// Records whose category tag equals `doc_type`.
    pub fn query_by_type(&self, doc_type: impl Into<String>) -> CacheView<Vec<CatalogRecord>> {
        let doc_type = doc_type.into();
        self.view(move |rows| {
            rows.iter()
                .filter(|r| r.doc_type == doc_type)
                .cloned()
                .collect()
        })
    }

    /// The `limit` most recently created records, newest first.
    pub fn query_newest(&self, limit: usize) -> CacheView<Vec<CatalogRecord>> {
        self.view(move |rows| {
            let mut newest = rows.to_vec();
            newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            newest.truncate(limit);
            newest
        })
    }

    /// Build a live view with a custom projection over the snapshot.
    pub fn view<T, F>(&self, project: F) -> CacheView<T>
    where
        F: Fn(&[CatalogRecord]) -> T + Send + Sync + 'static,
    {
        CacheView {
            rx: self.snapshot.subscribe(),
            project: Arc::new(project),
            last: None,
        }
    }

    // ------------------------------------------------------------------
    // One-shot reads
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> Arc<Vec<CatalogRecord>> {
        self.snapshot.borrow().clone()
    }

    pub fn get(&self, id: &str) -> Option<CatalogRecord> {
        self.snapshot.borrow().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive substring match over title and category tag.
    pub fn search_by_title_or_type(&self, query: &str) -> Vec<CatalogRecord> {
        // to_lowercase rather than SQL LOWER(): titles are not ASCII.
        let needle = query.to_lowercase();
        self.snapshot
            .borrow()
            .iter()
            .filter(|r| {
                r.title.to_lowercase().contains(&needle)
                    || r.doc_type.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Number of committed writes since the cache was opened.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Atomically replace the whole catalog with `records`.
    pub fn replace_all(&self, records: &[CatalogRecord]) -> Result<usize> {
        let ticket = self.begin_replace()?;
        self.replace_all_since(ticket, records)
    }

    pub fn begin_replace(&self) -> Result<ReplaceTicket> {
        let mut writer = self.lock()?;
        if let Some(stale) = writer.open_ticket {
            tracing::debug!(stale, "superseding unfinished replace");
        }
        writer.epoch += 1;
        writer.open_ticket = Some(writer.epoch);
        writer.tombstones.clear();
        Ok(ReplaceTicket {
            epoch: writer.epoch,
        })
    }

    /// Atomically replace the catalog with `records`, minus anything deleted
    /// after `ticket` was issued.
    ///
    /// Fails with [`StoreError::StaleTicket`] if a newer ticket has been
    /// issued since; that replace owns the catalog now.
    pub fn replace_all_since(
        &self,
        ticket: ReplaceTicket,
        records: &[CatalogRecord],
    ) -> Result<usize> {
        let mut writer = self.lock()?;
        if writer.open_ticket != Some(ticket.epoch) {
            return Err(StoreError::StaleTicket);
        }

        let kept: Vec<CatalogRecord> = records
            .iter()
            .filter(|r| !writer.tombstones.contains(&r.id))
            .cloned()
            .collect();
        let dropped = records.len() - kept.len();

        let written = writer.db.replace_documents(&kept, now_millis())?;
        writer.close_ticket();

        self.publish(&writer)?;
        tracing::info!(written, dropped, "catalog replaced");
        Ok(written)
    }

    /// Give up on a replace whose fetch failed, releasing its tombstones.
    pub fn abandon_replace(&self, ticket: ReplaceTicket) -> Result<()> {
        let mut writer = self.lock()?;
        if writer.open_ticket == Some(ticket.epoch) {
            writer.close_ticket();
        }
        Ok(())
    }

    /// Delete one record. Returns `true` if a row existed.
    pub fn delete_by_id(&self, id: &str) -> Result<bool> {
        let mut writer = self.lock()?;
        let existed = writer.db.delete_document(id)?;

        // Recorded even when the row was absent: the pending fetch may add it.
        if writer.open_ticket.is_some() {
            writer.tombstones.insert(id.to_string());
        }
        if existed {
            self.publish(&writer)?;
        }
        tracing::debug!(id, existed, "catalog record deleted");
        Ok(existed)
    }

    #[cfg(test)]
    fn tombstone_count(&self) -> usize {
        self.lock().map(|w| w.tombstones.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Writer>> {
        self.writer.lock().map_err(|_| StoreError::Poisoned)
    }

    // Must run under the writer lock so snapshots go out in commit order.
    fn publish(&self, writer: &Writer) -> Result<()> {
        let rows = writer.db.list_documents()?;
        self.snapshot.send_replace(Arc::new(rows));
        self.revision.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CacheView
// ---------------------------------------------------------------------------

/// A live projection of the cache.
///
/// The first [`next`](CacheView::next) yields the current value; later calls
/// wait until a committed write changes the projected value.
pub struct CacheView<T> {
    rx: watch::Receiver<Snapshot>,
    project: Projection<T>,
    last: Option<T>,
}

impl<T> Clone for CacheView<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            project: self.project.clone(),
            last: self.last.clone(),
        }
    }
}

impl<T> CacheView<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn current(&self) -> T {
        (self.project)(&self.rx.borrow())
    }

    /// Next distinct value, or `None` once the cache has been dropped.
    pub async fn next(&mut self) -> Option<T> {
        if self.last.is_none() {
            let value = (self.project)(&self.rx.borrow_and_update());
            self.last = Some(value.clone());
            return Some(value);
        }

        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let value = (self.project)(&self.rx.borrow_and_update());
            if self.last.as_ref() != Some(&value) {
                self.last = Some(value.clone());
                return Some(value);
            }
        }
    }

    /// Raw snapshot channel, for fan-in by an aggregator.
    pub fn changes(&self) -> watch::Receiver<Arc<Vec<CatalogRecord>>> {
        self.rx.clone()
    }

    pub fn into_stream(self) -> impl Stream<Item = T> {
        futures::stream::unfold(self, |mut view| async move {
            view.next().await.map(|value| (value, view))
        })
    }
}
