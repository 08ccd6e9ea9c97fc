//! # docshare-store
//!
//! Durable local storage for the docshare client, backed by SQLite.
//!
//! [`Database`] wraps a `rusqlite::Connection` with typed helpers for the
//! catalog and the settings table. [`LocalCache`] layers a reactive,
//! snapshot-publishing view on top of it, and [`KeyValueStore`] is the
//! durable key-value seam used for refresh bookkeeping.

pub mod cache;
pub mod database;
pub mod documents;
pub mod kv;
pub mod migrations;
pub mod settings;

mod error;

pub use cache::{CacheView, LocalCache, ReplaceTicket};
pub use database::Database;
pub use error::{Result, StoreError};
pub use kv::{KeyValueStore, MemoryKv, SettingsStore};
