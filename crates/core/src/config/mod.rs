//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (RURALCARE_*)
//! 2. TOML config file (if RURALCARE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (RURALCARE_*)
/// 2. TOML config file (if RURALCARE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via RURALCARE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the app is served from; relative URLs resolve against it.
    ///
    /// Set via RURALCARE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix of the partition names.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment version baked into the partition names. Bump it whenever
    /// the static manifest changes.
    ///
    /// Set via RURALCARE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// App shell URLs pre-fetched at install time.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Path prefix identifying backend API calls.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// User-Agent string for origin requests.
    ///
    /// Set via RURALCARE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Origin request timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via RURALCARE_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Cap on stored body bytes across all partitions. Unset means unlimited.
    ///
    /// Set via RURALCARE_STORAGE_QUOTA_BYTES environment variable.
    #[serde(default)]
    pub storage_quota_bytes: Option<u64>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./ruralcare-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_cache_prefix() -> String {
    "ruralcare".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_static_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/styles.css",
        "/app.js",
        "/translations.js",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css",
        "https://fonts.googleapis.com/css2?family=Poppins:wght@300;400;500;600;700&display=swap",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_user_agent() -> String {
    "ruralcare-sw/0.1".into()
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            static_manifest: default_static_manifest(),
            api_prefix: default_api_prefix(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            max_redirects: default_max_redirects(),
            storage_quota_bytes: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Current partition names derived from prefix and version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.cache_prefix, &self.cache_version)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<::url::Url, ConfigError> {
        let url = ::url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `RURALCARE_`
    /// 2. TOML file from `RURALCARE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("RURALCARE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("RURALCARE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
