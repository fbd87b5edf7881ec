//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PRECIOS_*)
//! 2. TOML config file (if PRECIOS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::PartitionSet;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PRECIOS_*)
/// 2. TOML config file (if PRECIOS_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// Asset paths in `static_assets` are resolved against `origin` + `scope`, so
/// the same manifest serves a root deployment and a subdirectory one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, used for the reported version string.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Deployment version; partition names are derived from it.
    ///
    /// Set via PRECIOS_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin the page is served from.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix the worker is scoped to.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// App-shell manifest cached at install time.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Cross-origin hosts whose requests are still intercepted.
    #[serde(default = "default_cdn_allowlist")]
    pub cdn_allowlist: Vec<String>,

    /// Path prefix treated as static assets besides the manifest. Route
    /// paths here and below are relative to the scope.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Path prefix of the API routes.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Product search endpoint path.
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    /// Change history endpoint path.
    #[serde(default = "default_history_endpoint")]
    pub history_endpoint: String,

    /// Bundled product dataset, relative to the scope.
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Document served to offline navigations.
    #[serde(default = "default_root_document")]
    pub root_document: String,

    /// Search through the remote endpoint instead of the local catalog.
    ///
    /// Set via PRECIOS_REMOTE_SEARCH environment variable.
    #[serde(default)]
    pub remote_search: bool,

    /// Path to the SQLite partition store.
    ///
    /// Set via PRECIOS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Maximum total bytes held across all partitions.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via PRECIOS_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Characters typed before suggestions are requested (2-4).
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Query cache entry lifetime in milliseconds.
    #[serde(default = "default_query_cache_ttl_ms")]
    pub query_cache_ttl_ms: u64,

    /// Maximum number of cached queries.
    #[serde(default = "default_query_cache_capacity")]
    pub query_cache_capacity: usize,

    /// Cap on full search results.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Cap on suggestion lists.
    #[serde(default = "default_suggest_limit")]
    pub suggest_limit: usize,
}

fn default_app_name() -> String {
    "precios-app".into()
}

fn default_version() -> String {
    "1.0.3".into()
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_scope() -> String {
    "/".into()
}

fn default_static_assets() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./seleccion.html",
        "./historial.html",
        "./manifest.json",
        "./static/css/style.css",
        "./static/js/main-static.js",
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css",
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_cdn_allowlist() -> Vec<String> {
    vec!["cdn.jsdelivr.net".into()]
}

fn default_static_prefix() -> String {
    "/static/".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_search_endpoint() -> String {
    "/api/productos/buscar".into()
}

fn default_history_endpoint() -> String {
    "/api/historial".into()
}

fn default_dataset_path() -> String {
    "./data/productos.json".into()
}

fn default_root_document() -> String {
    "./index.html".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./precios-cache.sqlite")
}

fn default_quota_bytes() -> u64 {
    52_428_800 // 50MB
}

fn default_user_agent() -> String {
    "precios/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_min_query_len() -> usize {
    2
}

fn default_query_cache_ttl_ms() -> u64 {
    300_000
}

fn default_query_cache_capacity() -> usize {
    50
}

fn default_search_limit() -> usize {
    50
}

fn default_suggest_limit() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            version: default_version(),
            origin: default_origin(),
            scope: default_scope(),
            static_assets: default_static_assets(),
            cdn_allowlist: default_cdn_allowlist(),
            static_prefix: default_static_prefix(),
            api_prefix: default_api_prefix(),
            search_endpoint: default_search_endpoint(),
            history_endpoint: default_history_endpoint(),
            dataset_path: default_dataset_path(),
            root_document: default_root_document(),
            remote_search: false,
            db_path: default_db_path(),
            quota_bytes: default_quota_bytes(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            min_query_len: default_min_query_len(),
            query_cache_ttl_ms: default_query_cache_ttl_ms(),
            query_cache_capacity: default_query_cache_capacity(),
            search_limit: default_search_limit(),
            suggest_limit: default_suggest_limit(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn query_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.query_cache_ttl_ms)
    }

    /// Version string reported to clients, e.g. `precios-app-v1.0.3`.
    pub fn version_tag(&self) -> String {
        format!("{}-v{}", self.app_name, self.version)
    }

    /// The current version's partition names.
    pub fn partitions(&self) -> PartitionSet {
        PartitionSet::new(&self.version)
    }

    /// The URL every relative asset path is resolved against.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        let mut scope = self.scope.clone();
        if !scope.ends_with('/') {
            scope.push('/');
        }
        Url::parse(&self.origin)
            .and_then(|origin| origin.join(&scope))
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Resolve a manifest entry (relative or absolute) to a full URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.scope_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "static_assets".into(), reason: format!("{path}: {e}") })
    }

    /// Resolve a route path such as `/static/` or `/api/historial` under the
    /// scope. A leading `/` is relative to the scope, not the origin root.
    pub fn resolve_scoped(&self, path: &str) -> Result<Url, ConfigError> {
        self.resolve(path.trim_start_matches('/'))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PRECIOS_`
    /// 2. TOML file from `PRECIOS_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("PRECIOS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PRECIOS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version, "1.0.3");
        assert_eq!(config.db_path, PathBuf::from("./precios-cache.sqlite"));
        assert_eq!(config.query_cache_ttl_ms, 300_000);
        assert_eq!(config.query_cache_capacity, 50);
        assert_eq!(config.search_limit, 50);
        assert_eq!(config.suggest_limit, 10);
        assert_eq!(config.min_query_len, 2);
        assert!(!config.remote_search);
        assert_eq!(config.static_assets.len(), 9);
    }

    #[test]
    fn test_version_tag() {
        let config = AppConfig::default();
        assert_eq!(config.version_tag(), "precios-app-v1.0.3");
    }

    #[test]
    fn test_resolve_root_scope() {
        let config = AppConfig::default();
        let url = config.resolve("./static/css/style.css").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/static/css/style.css");
        assert_eq!(config.resolve("./").unwrap().path(), "/");
    }

    #[test]
    fn test_resolve_subdirectory_scope() {
        let config = AppConfig { scope: "/precios".into(), ..Default::default() };
        let url = config.resolve("./index.html").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/precios/index.html");
    }

    #[test]
    fn test_resolve_scoped_route_paths() {
        let root = AppConfig::default();
        assert_eq!(root.resolve_scoped("/static/").unwrap().path(), "/static/");

        let sub = AppConfig { scope: "/repo/".into(), ..Default::default() };
        assert_eq!(sub.resolve_scoped("/static/").unwrap().path(), "/repo/static/");
        assert_eq!(
            sub.resolve_scoped("/api/productos/buscar").unwrap().as_str(),
            "http://localhost:8000/repo/api/productos/buscar"
        );
    }

    #[test]
    fn test_resolve_absolute_asset() {
        let config = AppConfig::default();
        let url = config
            .resolve("https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css")
            .unwrap();
        assert_eq!(url.host_str(), Some("cdn.jsdelivr.net"));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.query_cache_ttl(), Duration::from_millis(300_000));
    }
}
