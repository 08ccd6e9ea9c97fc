//! CRUD operations for [`CatalogRecord`] rows.

use docshare_shared::CatalogRecord;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

const SELECT_COLUMNS: &str = "SELECT id, title, doc_type, cover_image_ref, file_ref, download_count,
            rating, author_name, author_id, course_code, created_at
     FROM documents";

const UPSERT_SQL: &str = "INSERT OR REPLACE INTO documents
        (id, title, doc_type, cover_image_ref, file_ref, download_count,
         rating, author_name, author_id, course_code, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Replace the whole table with `records` in one transaction.
    ///
    /// Either every prior row is gone and every new row is present, or the
    /// transaction rolls back and the table is untouched. A repeated id keeps
    /// the last record carrying it. Returns the number of rows now stored.
    pub fn replace_documents(&mut self, records: &[CatalogRecord], now: i64) -> Result<usize> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM documents", [])?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for record in records {
                if record.id.is_empty() {
                    tracing::warn!(title = %record.title, "skipping catalog record without id");
                    continue;
                }
                insert_record(&mut stmt, record, now)?;
            }
        }
        let stored: i64 = tx.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        tx.commit()?;

        let stored = stored.max(0) as usize;
        if stored != records.len() {
            tracing::warn!(received = records.len(), stored, "catalog had duplicate or empty ids");
        }
        Ok(stored)
    }

    /// Delete a record by id.  Returns `true` if a row was deleted.
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// All records in insertion order.
    pub fn list_documents(&self) -> Result<Vec<CatalogRecord>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY rowid ASC"))?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn get_document(&self, id: &str) -> Result<Option<CatalogRecord>> {
        let record = self
            .conn()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_record(
    stmt: &mut rusqlite::Statement<'_>,
    record: &CatalogRecord,
    now: i64,
) -> rusqlite::Result<usize> {
    let created_at = if record.created_at > 0 {
        record.created_at
    } else {
        now
    };
    stmt.execute(params![
        record.id,
        record.title,
        record.doc_type,
        record.cover_image_ref,
        record.file_ref,
        i64::try_from(record.download_count).unwrap_or(i64::MAX),
        record.rating,
        record.author_name,
        record.author_id,
        record.course_code,
        created_at,
    ])
}

/// Map a `rusqlite::Row` to a [`CatalogRecord`].
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogRecord> {
    let download_count: i64 = row.get(5)?;

    Ok(CatalogRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        doc_type: row.get(2)?,
        cover_image_ref: row.get(3)?,
        file_ref: row.get(4)?,
        download_count: download_count.max(0) as u64,
        rating: row.get(6)?,
        author_name: row.get(7)?,
        author_id: row.get(8)?,
        course_code: row.get(9)?,
        created_at: row.get(10)?,
    })
}
