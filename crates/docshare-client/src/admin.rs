//! Moderation and dashboard surface for administrators.

use std::sync::Arc;

use docshare_shared::{ModerationError, ModerationReport, SystemStats};
use docshare_sync::{Collection, DocumentStore, ModerationTransaction};
use tokio::sync::watch;
use tracing::warn;

#[derive(Clone)]
pub struct AdminRepository {
    store: Arc<dyn DocumentStore>,
    moderation: Arc<ModerationTransaction>,
}

impl AdminRepository {
    pub fn new(store: Arc<dyn DocumentStore>, moderation: Arc<ModerationTransaction>) -> Self {
        Self { store, moderation }
    }

    pub async fn get_pending_reports(&self) -> Result<Vec<ModerationReport>, ModerationError> {
        self.moderation.pending_reports().await
    }

    pub fn watch_pending_reports(&self) -> watch::Receiver<Vec<ModerationReport>> {
        self.moderation.watch_pending_reports()
    }

    pub async fn delete_document_and_resolve_report(
        &self,
        document_id: &str,
        report_id: &str,
    ) -> Result<(), ModerationError> {
        self.moderation.takedown(document_id, report_id).await?;
        Ok(())
    }

    pub async fn dismiss_report(&self, report_id: &str) -> Result<(), ModerationError> {
        self.moderation.dismiss(report_id).await
    }

    /// Dashboard counters. Any failure yields all zeros.
    pub async fn get_system_stats(&self) -> SystemStats {
        let (users, documents, requests) = tokio::join!(
            self.store.count(Collection::Users),
            self.store.count(Collection::Documents),
            self.store.count(Collection::Requests),
        );

        match (users, documents, requests) {
            (Ok(user_count), Ok(document_count), Ok(request_count)) => SystemStats {
                user_count,
                document_count,
                request_count,
            },
            (users, documents, requests) => {
                let error = [users.err(), documents.err(), requests.err()]
                    .into_iter()
                    .flatten()
                    .next()
                    .map(|e| e.to_string());
                warn!(error = ?error, "failed to load system stats");
                SystemStats::default()
            }
        }
    }
}
