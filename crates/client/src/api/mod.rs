//! Client for the product price server.
//!
//! ### Endpoints
//!
//! - `GET /api/productos/buscar?q=<string>&limite=<int>` returns
//!   `{productos: [{Producto, USD, CUP}]}`.
//! - `GET /api/historial` returns `{historial: [string]}`.
//!
//! While offline the worker answers the search endpoint with
//! `{productos: [], offline: true, mensaje}`; that flag is preserved so the
//! session can fall back to its query cache.
//!
//! ### Errors
//!
//! - Transport failures and non-2xx statuses: `Error::NetworkFailure`
//! - Bodies that are not the expected JSON: `Error::UpstreamMalformed`

pub mod request;

pub use request::ProductQuery;

use std::sync::Arc;

use url::Url;

use precios_core::{AppConfig, Error, HistoryResponse, Network, Request, Response, SearchResponse};

/// Product API bound to one origin.
#[derive(Clone)]
pub struct ProductApi {
    network: Arc<dyn Network>,
    search_url: Url,
    history_url: Url,
}

impl std::fmt::Debug for ProductApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductApi")
            .field("search_url", &self.search_url.as_str())
            .field("history_url", &self.history_url.as_str())
            .finish()
    }
}

impl ProductApi {
    pub fn new(network: Arc<dyn Network>, search_url: Url, history_url: Url) -> Self {
        Self { network, search_url, history_url }
    }

    /// Build from the configured endpoints.
    pub fn from_config(network: Arc<dyn Network>, config: &AppConfig) -> Result<Self, Error> {
        let search_url = config
            .resolve_scoped(&config.search_endpoint)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let history_url = config
            .resolve_scoped(&config.history_endpoint)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(network, search_url, history_url))
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    pub fn history_url(&self) -> &Url {
        &self.history_url
    }

    /// Search products by name.
    pub async fn search(&self, query: &ProductQuery) -> Result<SearchResponse, Error> {
        query.validate()?;

        let url = query.to_url(&self.search_url);
        let response = self.get(url).await?;
        let parsed: SearchResponse = serde_json::from_slice(&response.body)?;

        tracing::debug!(
            query = %query.q,
            results = parsed.productos.len(),
            offline = parsed.offline,
            "product search completed"
        );

        Ok(parsed)
    }

    /// Recent searches recorded by the server.
    pub async fn history(&self) -> Result<Vec<String>, Error> {
        let response = self.get(self.history_url.clone()).await?;
        let parsed: HistoryResponse = serde_json::from_slice(&response.body)?;
        Ok(parsed.historial)
    }

    async fn get(&self, url: Url) -> Result<Response, Error> {
        let request = Request::get(url.as_str())?.with_header("accept", "application/json");
        let response = self.network.fetch(&request).await?;

        if !response.is_ok() {
            return Err(Error::NetworkFailure(format!("{} returned HTTP {}", url, response.status)));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precios_core::Product;
    use precios_core::testing::MockNetwork;
    use serde_json::json;

    fn api(network: Arc<MockNetwork>) -> ProductApi {
        ProductApi::from_config(network, &AppConfig::default()).unwrap()
    }

    fn search_url(q: &str, limite: Option<usize>) -> String {
        let mut query = ProductQuery::new(q);
        query.limite = limite;
        query
            .to_url(&Url::parse("http://localhost:8000/api/productos/buscar").unwrap())
            .to_string()
    }

    #[test]
    fn test_from_config_urls() {
        let api = api(Arc::new(MockNetwork::new()));
        assert_eq!(api.search_url().as_str(), "http://localhost:8000/api/productos/buscar");
        assert_eq!(api.history_url().as_str(), "http://localhost:8000/api/historial");
    }

    #[tokio::test]
    async fn test_search_parses_productos() {
        let network = Arc::new(MockNetwork::new());
        network.respond(
            &search_url("vino", Some(10)),
            Response::json(&json!({"productos": [{"Producto": "VINO TINTO RESERVA", "USD": 15.99, "CUP": 380.0}]})),
        );

        let result = api(network.clone())
            .search(&ProductQuery::new("vino").with_limit(10))
            .await
            .unwrap();
        assert_eq!(result.productos, vec![Product::new("VINO TINTO RESERVA", 15.99, 380.0)]);
        assert!(!result.offline);
        assert_eq!(network.call_count(&search_url("vino", Some(10))), 1);
    }

    #[tokio::test]
    async fn test_search_keeps_offline_flag() {
        let network = Arc::new(MockNetwork::new());
        network.respond(
            &search_url("ron", None),
            Response::json(&json!({"productos": [], "offline": true, "mensaje": "Modo offline - usando datos cacheados"})),
        );

        let result = api(network).search(&ProductQuery::new("ron")).await.unwrap();
        assert!(result.offline);
        assert!(result.productos.is_empty());
    }

    #[tokio::test]
    async fn test_search_transport_failure() {
        let network = Arc::new(MockNetwork::new());
        network.set_offline(true);
        let result = api(network).search(&ProductQuery::new("ron")).await;
        assert!(matches!(result, Err(Error::NetworkFailure(_))));
    }

    #[tokio::test]
    async fn test_search_http_error_status() {
        let network = Arc::new(MockNetwork::new());
        network.respond(&search_url("ron", None), Response::new(500, "boom"));
        let result = api(network).search(&ProductQuery::new("ron")).await;
        assert!(matches!(result, Err(Error::NetworkFailure(_))));
    }

    #[tokio::test]
    async fn test_search_malformed_body() {
        let network = Arc::new(MockNetwork::new());
        network.respond(&search_url("ron", None), Response::new(200, "<html></html>"));
        let result = api(network).search(&ProductQuery::new("ron")).await;
        assert!(matches!(result, Err(Error::UpstreamMalformed(_))));
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query_without_fetch() {
        let network = Arc::new(MockNetwork::new());
        let result = api(network.clone()).search(&ProductQuery::new(" ")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_history() {
        let network = Arc::new(MockNetwork::new());
        network.respond(
            "http://localhost:8000/api/historial",
            Response::json(&json!({"historial": ["vino", "ron"]})),
        );
        let history = api(network).history().await.unwrap();
        assert_eq!(history, vec!["vino", "ron"]);
    }
}
