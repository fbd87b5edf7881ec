//! The resolved asset manifest and path layout for one deployment.

use url::Url;

use precios_core::{AppConfig, Error};

/// Absolute URLs and path rules derived from `AppConfig`.
///
/// Relative manifest entries (`./index.html`) resolve against the scope, so
/// the same manifest serves a root deployment and a sub-path one.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub scope: Url,
    pub assets: Vec<Url>,
    pub cdn_allowlist: Vec<String>,
    pub static_prefix: String,
    pub api_prefix: String,
    pub dataset: Url,
    pub search_endpoint: Url,
    pub root_document: Url,
}

impl Manifest {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let invalid = |e: precios_core::ConfigError| Error::InvalidUrl(e.to_string());

        let assets = config
            .static_assets
            .iter()
            .map(|asset| config.resolve(asset).map(without_fragment))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        Ok(Self {
            scope: config.scope_url().map_err(invalid)?,
            assets,
            cdn_allowlist: config.cdn_allowlist.iter().map(|h| h.to_lowercase()).collect(),
            static_prefix: scoped_path(config, &config.static_prefix).map_err(invalid)?,
            api_prefix: scoped_path(config, &config.api_prefix).map_err(invalid)?,
            dataset: config.resolve(&config.dataset_path).map_err(invalid)?,
            search_endpoint: config.resolve_scoped(&config.search_endpoint).map_err(invalid)?,
            root_document: config.resolve(&config.root_document).map_err(invalid)?,
        })
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.scope.origin()
    }

    /// Cross-origin host the worker is allowed to cache.
    pub fn is_allowed_cdn(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.cdn_allowlist.iter().any(|allowed| host == allowed))
    }

    pub fn contains(&self, url: &Url) -> bool {
        let url = without_fragment(url.clone());
        self.assets.contains(&url)
    }

    /// File name of the bundled dataset, e.g. `productos.json`.
    pub fn dataset_file(&self) -> &str {
        self.dataset
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
    }

    pub fn is_dataset(&self, url: &Url) -> bool {
        let file = self.dataset_file();
        !file.is_empty() && url.path().ends_with(file)
    }

    pub fn is_api(&self, url: &Url) -> bool {
        self.is_same_origin(url) && url.path().starts_with(&self.api_prefix)
    }

    pub fn is_search_endpoint(&self, url: &Url) -> bool {
        self.is_same_origin(url) && url.path() == self.search_endpoint.path()
    }

    /// Paths worth keeping in the static partition when fetched on demand.
    pub fn is_static_like(&self, url: &Url) -> bool {
        let path = url.path();
        path.contains(&self.static_prefix) || path.ends_with(".html") || path.ends_with("manifest.json")
    }
}

/// Absolute path of a route prefix under the scope, e.g. `/repo/static/`.
fn scoped_path(config: &AppConfig, prefix: &str) -> Result<String, precios_core::ConfigError> {
    config.resolve_scoped(prefix).map(|url| url.path().to_string())
}

fn without_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest::from_config(&AppConfig::default()).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_assets_resolved_against_scope() {
        let m = manifest();
        assert_eq!(m.assets.len(), 9);
        assert!(m.contains(&url("http://localhost:8000/")));
        assert!(m.contains(&url("http://localhost:8000/index.html#main")));
        assert!(m.contains(&url("https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css")));
    }

    #[test]
    fn test_sub_path_scope() {
        let config = AppConfig {
            origin: "https://user.github.io".into(),
            scope: "/precios/".into(),
            ..Default::default()
        };
        let m = Manifest::from_config(&config).unwrap();
        assert!(m.contains(&url("https://user.github.io/precios/seleccion.html")));
        assert_eq!(m.dataset.as_str(), "https://user.github.io/precios/data/productos.json");
    }

    #[test]
    fn test_sub_path_scope_prefixes() {
        let config = AppConfig { scope: "/repo/".into(), ..Default::default() };
        let m = Manifest::from_config(&config).unwrap();
        assert_eq!(m.static_prefix, "/repo/static/");
        assert_eq!(m.api_prefix, "/repo/api/");
        assert!(m.is_api(&url("http://localhost:8000/repo/api/historial")));
        assert!(!m.is_api(&url("http://localhost:8000/api/historial")));
        assert!(m.is_search_endpoint(&url("http://localhost:8000/repo/api/productos/buscar?q=ron")));
        assert!(m.is_static_like(&url("http://localhost:8000/repo/static/x.css")));
    }

    #[test]
    fn test_dataset_file() {
        let m = manifest();
        assert_eq!(m.dataset_file(), "productos.json");
        assert!(m.is_dataset(&url("http://localhost:8000/data/productos.json")));
        assert!(!m.is_dataset(&url("http://localhost:8000/data/otros.json")));
    }

    #[test]
    fn test_api_paths() {
        let m = manifest();
        assert!(m.is_api(&url("http://localhost:8000/api/historial")));
        assert!(!m.is_api(&url("http://other.host/api/historial")));
        assert!(m.is_search_endpoint(&url("http://localhost:8000/api/productos/buscar?q=vino")));
        assert!(!m.is_search_endpoint(&url("http://localhost:8000/api/historial")));
    }

    #[test]
    fn test_cdn_allowlist() {
        let m = manifest();
        assert!(m.is_allowed_cdn(&url("https://cdn.jsdelivr.net/x.js")));
        assert!(!m.is_allowed_cdn(&url("https://evil.example/x.js")));
    }

    #[test]
    fn test_static_like() {
        let m = manifest();
        assert!(m.is_static_like(&url("http://localhost:8000/static/img/logo.png")));
        assert!(m.is_static_like(&url("http://localhost:8000/acerca.html")));
        assert!(m.is_static_like(&url("http://localhost:8000/manifest.json")));
        assert!(!m.is_static_like(&url("http://localhost:8000/data/productos.json")));
    }
}
