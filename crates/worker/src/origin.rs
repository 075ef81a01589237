//! Origin fetch boundary.
//!
//! The worker only ever issues GET requests toward the origin and receives
//! `(status, headers, body)` back. Transport failures surface as
//! `Error::NetworkFailure`; HTTP error statuses are ordinary responses.

use async_trait::async_trait;
use reqwest::{Client, header};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ruralcare_core::{AppConfig, Error, Request, Response};

/// Something that can answer a GET request.
#[async_trait]
pub trait Origin: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP origin.
#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// User agent string (default: "ruralcare-sw/0.1")
    pub user_agent: String,

    /// Request timeout (default: none; a hung origin delays the page)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self { user_agent: "ruralcare-sw/0.1".to_string(), timeout: None, max_redirects: 5 }
    }
}

impl From<&AppConfig> for OriginConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), max_redirects: config.max_redirects }
    }
}

/// reqwest-backed origin.
pub struct HttpOrigin {
    http: Client,
    config: OriginConfig,
}

impl HttpOrigin {
    /// Create a new HTTP origin with the given configuration.
    pub fn new(config: OriginConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::NetworkFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &OriginConfig {
        &self.config
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("origin only serves GET, got {}", request.method())));
        }

        let start = Instant::now();
        let response = self
            .http
            .get(request.url().as_str())
            .send()
            .await
            .map_err(|e| Error::NetworkFailure(format!("{}: {}", request.url(), e)))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect::<Vec<_>>();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkFailure(format!("failed to read response: {}", e)))?;

        tracing::debug!(
            url = %request.url(),
            status = status.as_u16(),
            content_type = headers.iter().find(|(k, _)| k == header::CONTENT_TYPE.as_str()).map(|(_, v)| v.as_str()),
            "fetched from origin in {}ms ({} bytes)",
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: body.to_vec(),
        })
    }
}

/// In-memory origin used by tests and offline replays.
///
/// Unknown URLs answer 404. Switching it offline makes every fetch fail with
/// `NetworkFailure`, as does marking a single URL as failing.
#[derive(Default)]
pub struct MemoryOrigin {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<HashMap<String, usize>>,
}

impl MemoryOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for the absolute `url`.
    pub fn with_route(self, url: &str, response: Response) -> Self {
        self.set_route(url, response);
        self
    }

    pub fn set_route(&self, url: &str, response: Response) {
        lock(&self.routes).insert(url.to_string(), response);
    }

    /// Fail every fetch of `url` with a network error.
    pub fn fail(&self, url: &str) {
        lock(&self.failing).insert(url.to_string());
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Number of fetches attempted for `url`.
    pub fn calls(&self, url: &str) -> usize {
        lock(&self.calls).get(url).copied().unwrap_or(0)
    }

    /// Number of fetches attempted for any URL.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }
}

#[async_trait]
impl Origin for MemoryOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("origin only serves GET, got {}", request.method())));
        }

        let url = request.url().as_str();
        *lock(&self.calls).entry(url.to_string()).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) || lock(&self.failing).contains(url) {
            return Err(Error::NetworkFailure(format!("{url}: connection refused")));
        }

        Ok(lock(&self.routes)
            .get(url)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found", "not found").with_header("content-type", "text/plain")))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
