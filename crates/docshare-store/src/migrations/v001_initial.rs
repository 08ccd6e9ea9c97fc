//! v001 -- Initial schema creation.
//!
//! Creates the `documents` catalog table and the `settings` key-value table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Documents (catalog cache, insertion order = rowid order)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS documents (
    id              TEXT PRIMARY KEY NOT NULL,  -- assigned by the remote
    title           TEXT NOT NULL,
    doc_type        TEXT NOT NULL,
    cover_image_ref TEXT NOT NULL DEFAULT '',
    file_ref        TEXT NOT NULL DEFAULT '',   -- '' = no downloadable file
    download_count  INTEGER NOT NULL DEFAULT 0,
    rating          REAL NOT NULL DEFAULT 0,
    author_name     TEXT NOT NULL DEFAULT '',
    author_id       TEXT,                       -- nullable, legacy records
    course_code     TEXT NOT NULL DEFAULT '',
    created_at      INTEGER NOT NULL            -- epoch millis
);

-- ----------------------------------------------------------------
-- Settings (durable key-value entries)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
