//! Durable key-value seam.
//!
//! [`KeyValueStore`] is what the refresh bookkeeping persists through. The
//! production implementation is [`SettingsStore`], which keeps its own
//! connection to the catalog database file; [`MemoryKv`] backs ephemeral
//! sessions and tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::database::Database;
use crate::error::{Result, StoreError};

pub trait KeyValueStore: Send + Sync {
    fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Must be durable by the time it returns.
    fn set_i64(&self, key: &str, value: i64) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SQLite-backed
// ---------------------------------------------------------------------------

pub struct SettingsStore {
    db: Mutex<Database>,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }
}

impl KeyValueStore for SettingsStore {
    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        match db.get_setting(key)? {
            None => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| StoreError::CorruptValue {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        db.set_setting(key, &value.to_string())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, i64>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).copied())
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
