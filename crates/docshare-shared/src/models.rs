//! Domain model structs shared by the cache, the remote adapters and the UI.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase keys so
//! it can be exchanged with the remote document service as-is.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog record
// ---------------------------------------------------------------------------

/// Shareable metadata of one document in the catalog.
///
/// `id` is assigned by the remote and never changes once cached. Writing a
/// record with an existing `id` replaces the whole row. Every other field is
/// optional on the wire; a payload without `id` is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Category tag, e.g. `exam` or `slides`.
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub cover_image_ref: String,
    /// Download URL; empty when the record has no downloadable file.
    #[serde(default)]
    pub file_ref: String,
    #[serde(default)]
    pub download_count: u64,
    /// Average rating in `0.0..=5.0`.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub author_name: String,
    /// Absent for legacy or anonymous records.
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub course_code: String,
    /// Epoch millis. `0` means the source did not supply one; the cache
    /// stamps the insert time instead.
    #[serde(default)]
    pub created_at: i64,
}

impl CatalogRecord {
    /// Blob references owned by this record (cover image first, then file).
    pub fn blob_refs(&self) -> [&str; 2] {
        [self.cover_image_ref.as_str(), self.file_ref.as_str()]
    }
}

// ---------------------------------------------------------------------------
// Moderation report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-filed complaint against a catalog record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModerationReport {
    pub id: String,
    /// May point at a record that no longer exists.
    pub document_id: String,
    pub reason: String,
    pub reporter_id: String,
    pub created_at: i64,
    #[serde(default)]
    pub status: ReportStatus,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Admin dashboard counters. Zeroed when the remote cannot be reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub user_count: u64,
    pub document_count: u64,
    pub request_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_remote_field_names() {
        let json = r#"{
            "id": "1",
            "title": "Mạng máy tính",
            "type": "exam",
            "fileRef": "https://cdn.example.com/f.pdf",
            "downloadCount": 12,
            "rating": 4.5,
            "authorId": null,
            "courseCode": "IT4060"
        }"#;
        let record: CatalogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.doc_type, "exam");
        assert_eq!(record.download_count, 12);
        assert_eq!(record.author_id, None);
        assert_eq!(record.created_at, 0);
        assert_eq!(record.file_ref, "https://cdn.example.com/f.pdf");
        assert_eq!(record.cover_image_ref, "");
    }

    #[test]
    fn record_without_id_is_rejected() {
        let json = r#"[{"id": "1", "title": "A"}, {"title": "B", "type": "exam"}]"#;
        let err = serde_json::from_str::<Vec<CatalogRecord>>(json).unwrap_err();
        assert!(err.to_string().contains("missing field `id`"));
    }

    #[test]
    fn report_status_defaults_to_pending() {
        let json = r#"{"id":"r1","documentId":"1","reason":"spam","reporterId":"u1","createdAt":5}"#;
        let report: ModerationReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(
            serde_json::to_value(ReportStatus::Dismissed).unwrap(),
            serde_json::json!("dismissed")
        );
    }
}
