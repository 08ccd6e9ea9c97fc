//! Blob storage seam and the non-critical cleanup helper.
//!
//! Blob removal during moderation is advisory: a blob that is already gone,
//! or a reference that was never a real blob URL, must not block the
//! record/report commit. [`cleanup_blobs`] encodes that policy; it has no
//! error path and reports what happened only through logs and its summary.

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, warn};

#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn delete_by_reference(&self, url: &Url) -> anyhow::Result<()>;
}

/// Parse `reference` as a deletable blob URL. Empty strings, placeholders
/// and non-http(s) schemes yield `None`.
pub fn blob_url(reference: &str) -> Option<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    let url = Url::parse(reference).ok()?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Some(url),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSummary {
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Best-effort deletion of every well-formed blob in `references`.
///
/// Each deletion is attempted independently; failures are logged and
/// swallowed.
pub async fn cleanup_blobs<'a, I>(storage: &dyn BlobStorage, references: I) -> CleanupSummary
where
    I: IntoIterator<Item = &'a str>,
{
    let mut summary = CleanupSummary::default();

    for reference in references {
        let Some(url) = blob_url(reference) else {
            if !reference.is_empty() {
                debug!(reference, "not a blob url, skipping");
            }
            summary.skipped += 1;
            continue;
        };

        match storage.delete_by_reference(&url).await {
            Ok(()) => {
                debug!(%url, "blob deleted");
                summary.deleted += 1;
            }
            Err(e) => {
                warn!(%url, error = %e, "blob deletion failed, continuing");
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStorage {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStorage for RecordingStorage {
        async fn delete_by_reference(&self, url: &Url) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(url.to_string());
            if url.path().contains("missing") {
                anyhow::bail!("object not found");
            }
            Ok(())
        }
    }

    #[test]
    fn only_http_urls_are_blobs() {
        assert!(blob_url("https://cdn.example.com/a.pdf").is_some());
        assert!(blob_url("http://cdn.example.com/a.png").is_some());
        assert!(blob_url("").is_none());
        assert!(blob_url("   ").is_none());
        assert!(blob_url("placeholder_cover").is_none());
        assert!(blob_url("gs://bucket/a.pdf").is_none());
        assert!(blob_url("file:///tmp/a.pdf").is_none());
    }

    #[tokio::test]
    async fn failures_do_not_stop_remaining_deletions() {
        let storage = RecordingStorage::default();
        let summary = cleanup_blobs(
            &storage,
            [
                "https://cdn.example.com/missing.png",
                "",
                "https://cdn.example.com/file.pdf",
            ],
        )
        .await;

        assert_eq!(
            summary,
            CleanupSummary {
                deleted: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert_eq!(storage.seen.lock().unwrap().len(), 2);
    }
}
