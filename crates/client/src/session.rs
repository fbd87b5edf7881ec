//! Page session: the explicit context for one page lifetime.
//!
//! A session owns the catalog, the query cache, the connectivity flag and
//! the optional channel to the worker. It is created by `Session::start` and
//! torn down by `Session::end`; nothing outlives it.
//!
//! ### Search routing
//!
//! - Local mode (`remote_search = false`): substring search over the catalog.
//! - Remote mode, online: the product API. Non-empty results are cached; an
//!   offline payload or a transport failure falls back to the query cache.
//! - Remote mode, offline: the query cache only.

use std::sync::Arc;

use serde::Serialize;

use crate::api::{ProductApi, ProductQuery};
use precios_core::search::{search_limited, suggest_limited};
use precios_core::{
    AppConfig, Catalog, CatalogSource, Clock, Error, Network, Product, QueryCache, Request, SystemClock,
    WorkerChannel, WorkerMessage, WorkerReply,
};

/// Shown when the search API answers with something other than the
/// expected JSON.
const MALFORMED_MESSAGE: &str = "could not search";

/// Shown when the search API is unreachable and nothing is cached.
const CONNECTION_MESSAGE: &str = "connection error";

/// Where a result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// The remote product API (live or via the query cache).
    Api,
    /// The bundled dataset.
    Bundled,
    /// The built-in fallback list.
    Fallback,
}

impl From<CatalogSource> for ResultSource {
    fn from(source: CatalogSource) -> Self {
        match source {
            CatalogSource::Bundled => ResultSource::Bundled,
            CatalogSource::Fallback => ResultSource::Fallback,
        }
    }
}

/// Result of one search request.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The query was empty after trimming; nothing was searched.
    Empty,
    Results { products: Vec<Product>, source: ResultSource, from_cache: bool },
    /// Offline with no fresh cached entry for this query.
    NoCachedData,
    Failed { message: String },
}

/// One page lifetime.
pub struct Session<C: Clock = SystemClock> {
    config: AppConfig,
    catalog: Catalog,
    api: ProductApi,
    query_cache: QueryCache<C>,
    online: bool,
    worker: Option<WorkerChannel>,
}

impl<C: Clock> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("catalog_source", &self.catalog.source())
            .field("catalog_len", &self.catalog.len())
            .field("cached_queries", &self.query_cache.len())
            .field("online", &self.online)
            .field("worker", &self.worker.is_some())
            .finish()
    }
}

impl Session<SystemClock> {
    /// Start a session on the wall clock.
    pub async fn start(config: AppConfig, network: Arc<dyn Network>) -> Result<Self, Error> {
        Self::start_with_clock(config, network, SystemClock).await
    }
}

impl<C: Clock> Session<C> {
    /// Start a session, loading the bundled dataset exactly once.
    ///
    /// A dataset that cannot be fetched or parsed is not an error: the
    /// fallback list is used for the rest of the session.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the configured endpoints do not resolve.
    pub async fn start_with_clock(config: AppConfig, network: Arc<dyn Network>, clock: C) -> Result<Self, Error> {
        let api = ProductApi::from_config(network.clone(), &config)?;

        let catalog = match load_catalog(&config, network.as_ref()).await {
            Ok(catalog) => {
                tracing::info!(products = catalog.len(), "loaded bundled dataset");
                catalog
            }
            Err(e) => {
                tracing::warn!("using fallback catalog: {}", e);
                Catalog::fallback()
            }
        };

        let query_cache = QueryCache::with_clock(config.query_cache_ttl(), config.query_cache_capacity, clock);

        Ok(Self { config, catalog, api, query_cache, online: true, worker: None })
    }

    /// Attach the control channel to the page's worker.
    pub fn with_worker(mut self, channel: WorkerChannel) -> Self {
        self.worker = Some(channel);
        self
    }

    pub fn set_online(&mut self, online: bool) {
        if self.online != online {
            tracing::info!(online, "connectivity changed");
        }
        self.online = online;
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn query_cache(&self) -> &QueryCache<C> {
        &self.query_cache
    }

    /// Run a full search.
    pub async fn search(&mut self, query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::Empty;
        }

        if !self.config.remote_search {
            let products = search_limited(query, self.catalog.products(), self.config.search_limit);
            self.query_cache.put(query, products.clone());
            return SearchOutcome::Results { products, source: self.catalog.source().into(), from_cache: false };
        }

        if !self.online {
            return self.cached_or(query, SearchOutcome::NoCachedData);
        }

        let request = ProductQuery::new(query).with_limit(self.config.search_limit);
        match self.api.search(&request).await {
            Ok(response) if response.offline => {
                tracing::info!(query, "search answered with offline payload");
                self.cached_or(query, SearchOutcome::NoCachedData)
            }
            Ok(response) => {
                self.query_cache.put(query, response.productos.clone());
                SearchOutcome::Results { products: response.productos, source: ResultSource::Api, from_cache: false }
            }
            Err(Error::NetworkFailure(e)) => {
                tracing::warn!(query, "search request failed: {}", e);
                self.cached_or(query, SearchOutcome::Failed { message: CONNECTION_MESSAGE.to_string() })
            }
            Err(Error::UpstreamMalformed(e)) => {
                tracing::warn!(query, "search response malformed: {}", e);
                SearchOutcome::Failed { message: MALFORMED_MESSAGE.to_string() }
            }
            Err(e) => SearchOutcome::Failed { message: e.to_string() },
        }
    }

    /// Suggestion names for the autocomplete panel.
    ///
    /// In remote mode failures yield an empty list; offline, the query cache
    /// is consulted.
    pub async fn suggest(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let limit = self.config.suggest_limit;
        if !self.config.remote_search {
            return suggest_limited(query, self.catalog.products(), limit);
        }

        if !self.online {
            return self
                .query_cache
                .get(query)
                .map(|products| products.iter().take(limit).map(|p| p.name.clone()).collect())
                .unwrap_or_default();
        }

        match self.api.search(&ProductQuery::new(query).with_limit(limit)).await {
            Ok(response) => response.productos.into_iter().take(limit).map(|p| p.name).collect(),
            Err(e) => {
                tracing::debug!(query, "suggestions unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Recent searches from the server.
    pub async fn history(&self) -> Result<Vec<String>, Error> {
        self.api.history().await
    }

    /// Ask the worker which version is running.
    ///
    /// Returns `None` when no worker is attached.
    pub async fn worker_version(&self) -> Result<Option<String>, Error> {
        let Some(worker) = &self.worker else {
            return Ok(None);
        };

        match worker.request(WorkerMessage::GetVersion).await? {
            WorkerReply::Version { version } => {
                tracing::info!(%version, "worker version");
                Ok(Some(version))
            }
            other => Err(Error::InvalidState(format!("unexpected reply to GET_VERSION: {other:?}"))),
        }
    }

    /// Tear the session down.
    pub fn end(mut self) {
        let cached = self.query_cache.len();
        self.query_cache.clear();
        tracing::info!(cached, "session ended");
    }

    fn cached_or(&self, query: &str, otherwise: SearchOutcome) -> SearchOutcome {
        match self.query_cache.get(query) {
            Some(products) => {
                SearchOutcome::Results { products: products.to_vec(), source: ResultSource::Api, from_cache: true }
            }
            None => otherwise,
        }
    }
}

async fn load_catalog(config: &AppConfig, network: &dyn Network) -> Result<Catalog, Error> {
    let url = config
        .resolve(&config.dataset_path)
        .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;
    let request = Request::get(url.as_str())?;

    let response = network
        .fetch(&request)
        .await
        .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;
    if !response.is_ok() {
        return Err(Error::CatalogUnavailable(format!("{} returned HTTP {}", url, response.status)));
    }

    Catalog::from_dataset(&response.body).map_err(|e| Error::CatalogUnavailable(e.to_string()))
}
