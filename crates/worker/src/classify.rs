//! Request classification.
//!
//! Labels a request URL by string patterns alone. The static check runs
//! first, so a script served from under the API prefix is still treated as
//! a static asset.

use std::collections::HashSet;

use ruralcare_core::url::{canonicalize, path_of};
use serde::{Deserialize, Serialize};
use url::Url;

/// File extensions served from the static partition.
pub const STATIC_EXTENSIONS: &[&str] =
    &[".css", ".js", ".html", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".woff", ".woff2", ".ttf"];

/// Path keywords of the backend data endpoints.
pub const API_KEYWORDS: &[&str] = &["pharmacy", "health-records", "symptoms", "consultation"];

/// Routing label of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    StaticAsset,
    ApiCall,
    Other,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::StaticAsset => write!(f, "static-asset"),
            Label::ApiCall => write!(f, "api-call"),
            Label::Other => write!(f, "other"),
        }
    }
}

/// Deterministic URL classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    manifest: HashSet<String>,
    api_prefix: String,
}

impl Classifier {
    /// Build a classifier from the static manifest.
    ///
    /// Each manifest entry matches both as written and resolved against
    /// `origin`, so `/app.js` and `http://host/app.js` are both members.
    pub fn new<S: AsRef<str>>(manifest: &[S], api_prefix: &str, origin: &Url) -> Self {
        let mut entries = HashSet::new();
        for entry in manifest {
            let entry = entry.as_ref();
            entries.insert(entry.to_string());
            match canonicalize(entry, origin) {
                Ok(url) => {
                    entries.insert(url.to_string());
                }
                Err(e) => tracing::warn!(entry, "manifest entry does not resolve: {}", e),
            }
        }
        Self { manifest: entries, api_prefix: api_prefix.to_string() }
    }

    pub fn classify(&self, url: &str) -> Label {
        if self.is_static(url) {
            Label::StaticAsset
        } else if self.is_api(url) {
            Label::ApiCall
        } else {
            Label::Other
        }
    }

    /// Manifest member, or a path ending in a static extension.
    pub fn is_static(&self, url: &str) -> bool {
        if self.manifest.contains(url) {
            return true;
        }
        let path = path_of(url).to_ascii_lowercase();
        STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    /// Contains the API prefix or one of the domain keywords.
    pub fn is_api(&self, url: &str) -> bool {
        url.contains(&self.api_prefix) || API_KEYWORDS.iter().any(|keyword| url.contains(keyword))
    }
}
