//! Fetch strategy engine.
//!
//! Static assets and uncategorized requests are served cache-first: once a
//! response is in its partition the network is never consulted again for it.
//! API calls are served network-first and degrade through the dynamic
//! partition and then the canned fallback payloads.
//!
//! Whatever fails on the way, the page gets a response: a cached one, a
//! canned one, or a synthetic 503. Cache write failures only mean the
//! response was not cached.

use std::sync::Arc;

use ruralcare_core::{CacheDb, CacheNames, Error, Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::{Classifier, Label};
use crate::fallback;
use crate::origin::Origin;

/// Pages tried, in order, as the offline document for failed navigations.
const OFFLINE_PAGES: &[&str] = &["/index.html", "/"];

/// Body of the synthetic response for sub-resources that cannot be served.
pub const OFFLINE_BODY: &str = "Offline - Content not available";

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    /// Fresh from the origin.
    Network,
    /// From the request's partition.
    Cache,
    /// The cached app shell, served for a failed navigation.
    OfflinePage,
    /// A canned API payload.
    Fallback,
    /// The plain-text 503.
    Synthetic,
}

/// A response together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    pub label: Label,
}

/// Plain-text 503 returned when nothing else can answer.
pub fn offline_response() -> Response {
    Response::new(503, "Service Unavailable", OFFLINE_BODY).with_header("content-type", "text/plain")
}

/// Routes intercepted requests through the cache and the origin.
pub struct FetchEngine {
    db: CacheDb,
    names: CacheNames,
    classifier: Classifier,
    origin: Arc<dyn Origin>,
    offline_pages: Vec<Request>,
}

impl FetchEngine {
    pub fn new(
        db: CacheDb, names: CacheNames, classifier: Classifier, origin: Arc<dyn Origin>, app_origin: &Url,
    ) -> Result<Self, Error> {
        let offline_pages = OFFLINE_PAGES
            .iter()
            .map(|page| Request::get(page, app_origin))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { db, names, classifier, origin, offline_pages })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Serve an intercepted request.
    ///
    /// Returns `None` for anything but GET: such requests go straight to the
    /// network without touching any partition.
    pub async fn handle(&self, request: &Request) -> Option<Served> {
        if !request.is_get() {
            tracing::debug!(method = request.method(), url = %request.url(), "passing through non-GET request");
            return None;
        }

        let label = self.classifier.classify(request.url().as_str());
        tracing::debug!(url = %request.url(), %label, "intercepted request");

        let served = match label {
            Label::StaticAsset => self.cache_first(request, self.names.static_name(), label).await,
            Label::ApiCall => self.network_first(request).await,
            Label::Other => self.cache_first(request, self.names.dynamic_name(), label).await,
        };
        Some(served)
    }

    async fn cache_first(&self, request: &Request, partition: &str, label: Label) -> Served {
        if let Some(cached) = self.lookup(partition, request).await {
            tracing::debug!(url = %request.url(), partition, "serving from cache");
            return Served { response: cached, source: ResponseSource::Cache, label };
        }

        match self.origin.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(partition, request, &response).await;
                }
                Served { response, source: ResponseSource::Network, label }
            }
            Err(e) => {
                tracing::warn!(url = %request.url(), "network failed for cache-first request: {}", e);
                if request.is_navigation()
                    && let Some(page) = self.offline_page().await
                {
                    return Served { response: page, source: ResponseSource::OfflinePage, label };
                }
                Served { response: offline_response(), source: ResponseSource::Synthetic, label }
            }
        }
    }

    async fn network_first(&self, request: &Request) -> Served {
        let label = Label::ApiCall;
        let partition = self.names.dynamic_name();

        match self.origin.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(partition, request, &response).await;
                }
                return Served { response, source: ResponseSource::Network, label };
            }
            Err(e) => tracing::info!(url = %request.url(), "network failed, trying cache: {}", e),
        }

        if let Some(cached) = self.lookup(partition, request).await {
            return Served { response: cached, source: ResponseSource::Cache, label };
        }

        Served { response: fallback::provide(request), source: ResponseSource::Fallback, label }
    }

    /// Partition lookup; read errors count as a miss.
    async fn lookup(&self, partition: &str, request: &Request) -> Option<Response> {
        let result = match self.db.open_partition(partition).await {
            Ok(handle) => handle.match_request(request).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(url = %request.url(), partition, "cache lookup failed: {}", e);
            None
        })
    }

    /// Store a clone of a fresh response; failures only skip caching.
    async fn store(&self, partition: &str, request: &Request, response: &Response) {
        let result = match self.db.open_partition(partition).await {
            Ok(handle) => handle.put(request, response).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(url = %request.url(), partition, "caching skipped: {}", e);
        }
    }

    async fn offline_page(&self) -> Option<Response> {
        for page in &self.offline_pages {
            match self.db.match_any(page).await {
                Ok(Some(response)) => return Some(response),
                Ok(None) => {}
                Err(e) => tracing::warn!(url = %page.url(), "offline page lookup failed: {}", e),
            }
        }
        None
    }
}
