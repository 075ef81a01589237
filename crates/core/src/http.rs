//! Request and response values exchanged between pages, the cache, and the
//! origin.

use ::url::Url;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::url::canonicalize;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    /// Script, style, image, XHR, and everything else.
    #[default]
    Subresource,
}

/// An intercepted request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: Url,
    mode: RequestMode,
}

impl Request {
    /// Build a request, canonicalizing `url` against the app origin.
    pub fn new(method: &str, url: &str, mode: RequestMode, origin: &Url) -> Result<Self, Error> {
        let method = method.trim().to_ascii_uppercase();
        if method.is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()));
        }
        let url = canonicalize(url, origin)?;
        Ok(Self { method, url, mode })
    }

    /// Shorthand for a sub-resource GET.
    pub fn get(url: &str, origin: &Url) -> Result<Self, Error> {
        Self::new("GET", url, RequestMode::Subresource, origin)
    }

    /// Shorthand for a navigation GET.
    pub fn navigate(url: &str, origin: &Url) -> Result<Self, Error> {
        Self::new("GET", url, RequestMode::Navigate, origin)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// A response as served to the page or stored in a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    /// Header pairs in arrival order; names are stored lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, status_text: status_text.into(), headers: Vec::new(), body: body.into() }
    }

    /// Append a header, lowercasing the name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// JSON body with `Content-Type: application/json`.
    pub fn json<T: Serialize>(status: u16, status_text: &str, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value).map_err(|e| Error::InvalidInput(format!("unserializable body: {e}")))?;
        Ok(Self::new(status, status_text, body).with_header("content-type", "application/json"))
    }

    /// True for any 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn parse_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
