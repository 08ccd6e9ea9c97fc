//! # docshare-sync
//!
//! Keeps the local catalog consistent with the remote document service:
//! coalesced, staleness-driven refreshes, failure classification, the
//! cross-store moderation transaction and the reactive aggregator used to
//! derive screen state from several live inputs.
//!
//! The remote is reached through three seams ([`CatalogSource`],
//! [`DocumentStore`], [`BlobStorage`]). [`RemoteClient`] implements them
//! over HTTP and [`MemoryRemote`] in process.

pub mod aggregator;
pub mod blobs;
pub mod classify;
pub mod coordinator;
pub mod documents;
pub mod memory;
pub mod moderation;
pub mod remote;
pub mod source;
pub mod staleness;

pub use aggregator::{AggregatorBuilder, ReactiveAggregator, Subscription};
pub use blobs::{cleanup_blobs, BlobStorage, CleanupSummary};
pub use classify::classify;
pub use coordinator::{RefreshOutcome, RefreshResult, SyncCoordinator, SyncState};
pub use documents::{Collection, DocumentStore, Write, WriteBatch};
pub use memory::MemoryRemote;
pub use moderation::ModerationTransaction;
pub use remote::RemoteClient;
pub use source::{CatalogSource, HttpStatusError};
pub use staleness::{Clock, ManualClock, StalenessPolicy, SystemClock};
