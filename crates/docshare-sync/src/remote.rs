//! HTTP adapter for the remote document service.
//!
//! One [`RemoteClient`] speaks JSON to the document API and implements all
//! three remote seams: the catalog source, the document store and blob
//! deletion. Non-2xx answers become [`HttpStatusError`]; everything else is
//! returned as the raw `reqwest` / `serde_json` error with request context.

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use docshare_shared::{CatalogRecord, ModerationReport, ReportStatus};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blobs::BlobStorage;
use crate::documents::{Collection, DocumentStore, WriteBatch};
use crate::source::{CatalogSource, HttpStatusError};

#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

#[derive(Serialize)]
struct StatusPatch {
    status: ReportStatus,
}

#[derive(Deserialize)]
struct CountBody {
    count: u64,
}

impl RemoteClient {
    /// `base_url` is the API root, e.g. `https://api.example.com/v1`.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid API url '{base_url}'"))?;
        if base.cannot_be_a_base() {
            bail!("API url '{base_url}' cannot carry a path");
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("docshare/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, base, token })
    }

    /// Append `segments` to the base path, each percent-encoded as exactly
    /// one segment so ids cannot add path levels or a query.
    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| anyhow!("API url '{}' cannot carry a path", self.base))?;
            path.pop_if_empty();
            for segment in segments {
                if matches!(*segment, "" | "." | "..") {
                    bail!("invalid path segment '{segment}'");
                }
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn pending_reports_url(&self) -> anyhow::Result<Url> {
        let mut url = self.endpoint(&["reports"])?;
        url.query_pairs_mut()
            .append_pair("status", ReportStatus::Pending.as_str());
        Ok(url)
    }

    /// Whether `url` points at the API server itself.
    fn is_api_origin(&self, url: &Url) -> bool {
        url.scheme() == self.base.scheme()
            && url.host_str() == self.base.host_str()
            && url.port_or_known_default() == self.base.port_or_known_default()
    }

    /// Request to the API, with the bearer token when one is configured.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> anyhow::Result<Response> {
        let resp = builder
            .send()
            .await
            .with_context(|| format!("{what}: request failed"))?;
        let status = resp.status();
        debug!(request = what, status = status.as_u16(), "remote response");
        if !status.is_success() {
            return Err(HttpStatusError::new(status.as_u16())).context(what.to_string());
        }
        Ok(resp)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> anyhow::Result<T> {
        let what = format!("GET {}", url.path());
        let resp = self.send(self.request(Method::GET, url), &what).await?;
        resp.json::<T>()
            .await
            .with_context(|| format!("{what}: malformed body"))
    }
}

#[async_trait]
impl CatalogSource for RemoteClient {
    async fn fetch_all(&self) -> anyhow::Result<Vec<CatalogRecord>> {
        self.get_json(self.endpoint(&["documents"])?).await
    }
}

#[async_trait]
impl DocumentStore for RemoteClient {
    async fn get_document(&self, id: &str) -> anyhow::Result<Option<CatalogRecord>> {
        let url = self.endpoint(&["documents", id])?;
        let resp = self
            .request(Method::GET, url)
            .send()
            .await
            .context("GET document: request failed")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(HttpStatusError::new(resp.status().as_u16())).context("GET document");
        }
        let record = resp
            .json::<CatalogRecord>()
            .await
            .context("GET document: malformed body")?;
        Ok(Some(record))
    }

    async fn fetch_all_documents(&self) -> anyhow::Result<Vec<CatalogRecord>> {
        self.get_json(self.endpoint(&["documents"])?).await
    }

    async fn fetch_pending_reports(&self) -> anyhow::Result<Vec<ModerationReport>> {
        self.get_json(self.pending_reports_url()?).await
    }

    async fn commit(&self, batch: WriteBatch) -> anyhow::Result<()> {
        let url = self.endpoint(&["commit"])?;
        self.send(self.request(Method::POST, url).json(&batch), "POST commit")
            .await?;
        Ok(())
    }

    async fn set_report_status(&self, report_id: &str, status: ReportStatus) -> anyhow::Result<()> {
        let url = self.endpoint(&["reports", report_id])?;
        self.send(
            self.request(Method::PATCH, url).json(&StatusPatch { status }),
            "PATCH report",
        )
        .await?;
        Ok(())
    }

    async fn create_report(&self, report: &ModerationReport) -> anyhow::Result<()> {
        let url = self.endpoint(&["reports"])?;
        self.send(self.request(Method::POST, url).json(report), "POST report")
            .await?;
        Ok(())
    }

    async fn count(&self, collection: Collection) -> anyhow::Result<u64> {
        let url = self.endpoint(&[collection.as_str(), "count"])?;
        let body: CountBody = self.get_json(url).await?;
        Ok(body.count)
    }
}

#[async_trait]
impl BlobStorage for RemoteClient {
    async fn delete_by_reference(&self, url: &Url) -> anyhow::Result<()> {
        // Blob urls come from uploaded records; API credentials stay on the API host.
        let builder = if self.is_api_origin(url) {
            self.request(Method::DELETE, url.clone())
        } else {
            self.http.request(Method::DELETE, url.clone())
        };
        let resp = builder
            .send()
            .await
            .with_context(|| format!("DELETE {url}: request failed"))?;
        // Already gone counts as deleted.
        if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(HttpStatusError::new(resp.status().as_u16())).with_context(|| format!("DELETE {url}"))
    }
}
