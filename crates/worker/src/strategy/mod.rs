//! Per-request caching strategies.
//!
//! ### Routing
//!
//! First match wins:
//! 1. Dataset: network first (2xx only), then the generic cache-then-network chain
//! 2. API: network first into the API partition, offline payload for search
//! 3. Static asset: cache first, network into the static partition
//! 4. HTML navigation: network first into the API partition, root document fallback
//! 5. Everything else: stale-while-revalidate on the dynamic partition
//!
//! ### Cache writes
//!
//! Writes happen only for 2xx responses. A failed write (quota, closed
//! database) is logged and never fails the request.

pub mod plan;

pub use plan::{Lookup, Route, Step, Store, plan, route};

use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinHandle;

use crate::manifest::Manifest;
use precios_core::{Error, Network, PartitionRole, PartitionSet, PartitionStore, Request, Response};

/// What the engine decided for a request.
#[derive(Debug)]
pub enum Interception {
    /// Not handled; the caller performs the request itself.
    PassThrough,
    Respond {
        response: Response,
        /// Background refresh started by stale-while-revalidate. Dropping
        /// the handle detaches the task; it still commits its write.
        revalidation: Option<JoinHandle<()>>,
    },
}

impl Interception {
    fn respond(response: Response) -> Self {
        Interception::Respond { response, revalidation: None }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Interception::PassThrough => None,
            Interception::Respond { response, .. } => Some(response),
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Interception::PassThrough => None,
            Interception::Respond { response, .. } => Some(response),
        }
    }
}

/// Executes strategy plans against the partition store and the network.
#[derive(Clone)]
pub struct StrategyEngine {
    store: PartitionStore,
    network: Arc<dyn Network>,
    partitions: PartitionSet,
    manifest: Arc<Manifest>,
}

impl std::fmt::Debug for StrategyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyEngine")
            .field("partitions", &self.partitions)
            .field("scope", &self.manifest.scope.as_str())
            .finish()
    }
}

impl StrategyEngine {
    pub fn new(
        store: PartitionStore, network: Arc<dyn Network>, partitions: PartitionSet, manifest: Arc<Manifest>,
    ) -> Self {
        Self { store, network, partitions, manifest }
    }

    pub fn route(&self, request: &Request) -> Option<Route> {
        route(&self.manifest, request)
    }

    /// Decide and produce the response for one intercepted request.
    pub async fn handle(&self, request: &Request) -> Interception {
        let Some(route) = self.route(request) else {
            return Interception::PassThrough;
        };

        tracing::debug!(url = %request.url, ?route, "intercepted request");
        self.execute(&plan(route), request).await
    }

    /// Run steps in order until one produces a response.
    ///
    /// A plan that runs out of steps answers 503 `Offline`.
    pub async fn execute(&self, steps: &[Step], request: &Request) -> Interception {
        for step in steps {
            if let Some(outcome) = self.run_step(*step, request).await {
                return outcome;
            }
        }
        Interception::respond(Response::unavailable(plan::OFFLINE))
    }

    async fn run_step(&self, step: Step, request: &Request) -> Option<Interception> {
        match step {
            Step::Network { store, ok_only } => self.network_step(request, store, ok_only).await,
            Step::Cache(Lookup::Any) => self.cached_any(request).await.map(Interception::respond),
            Step::Cache(Lookup::Partition(role)) => self.cached_in(role, request).await.map(Interception::respond),
            Step::Revalidate => {
                let cached = self.cached_in(PartitionRole::Dynamic, request).await?;
                let revalidation = self.spawn_revalidation(request.clone());
                Some(Interception::Respond { response: cached, revalidation: Some(revalidation) })
            }
            Step::RootDocument => self.root_document(request).await.map(Interception::respond),
            Step::OfflineSearchPayload => {
                if !self.manifest.is_search_endpoint(&request.url) {
                    return None;
                }
                let payload = json!({
                    "productos": [],
                    "offline": true,
                    "mensaje": plan::OFFLINE_SEARCH_MESSAGE,
                });
                Some(Interception::respond(Response::json(&payload)))
            }
            Step::Unavailable(message) => Some(Interception::respond(Response::unavailable(message))),
        }
    }

    async fn network_step(&self, request: &Request, store: Store, ok_only: bool) -> Option<Interception> {
        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url, "network step failed: {}", e);
                return None;
            }
        };

        if response.is_ok() {
            if let Some(role) = self.store_role(store, request) {
                self.write(role, request, &response).await;
            }
        } else if ok_only {
            tracing::debug!(url = %request.url, status = response.status, "non-2xx falls through");
            return None;
        }

        Some(Interception::respond(response))
    }

    fn store_role(&self, store: Store, request: &Request) -> Option<PartitionRole> {
        match store {
            Store::Nothing => None,
            Store::Into(role) => Some(role),
            Store::StaticLike if self.manifest.is_static_like(&request.url) => Some(PartitionRole::Static),
            Store::StaticLike => None,
        }
    }

    async fn cached_any(&self, request: &Request) -> Option<Response> {
        match self.store.match_any(request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, "cache lookup failed: {}", e);
                None
            }
        }
    }

    async fn cached_in(&self, role: PartitionRole, request: &Request) -> Option<Response> {
        let name = self.partitions.name(role);
        match lookup_in(&self.store, &name, request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, partition = %name, "cache lookup failed: {}", e);
                None
            }
        }
    }

    async fn root_document(&self, request: &Request) -> Option<Response> {
        if !request.accepts_html() {
            return None;
        }

        for url in [&self.manifest.root_document, &self.manifest.scope] {
            let Ok(root) = Request::get(url.as_str()) else {
                continue;
            };
            if let Some(response) = self.cached_any(&root).await {
                return Some(response);
            }
        }
        None
    }

    async fn write(&self, role: PartitionRole, request: &Request, response: &Response) {
        let name = self.partitions.name(role);
        if let Err(e) = write_entry(&self.store, &name, request, response).await {
            tracing::warn!(url = %request.url, partition = %name, "cache write failed: {}", e);
        }
    }

    fn spawn_revalidation(&self, request: Request) -> JoinHandle<()> {
        let store = self.store.clone();
        let network = self.network.clone();
        let name = self.partitions.name(PartitionRole::Dynamic);

        tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    if let Err(e) = write_entry(&store, &name, &request, &response).await {
                        tracing::warn!(url = %request.url, "revalidation write failed: {}", e);
                    } else {
                        tracing::debug!(url = %request.url, "revalidated");
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "revalidation not stored");
                }
                Err(e) => {
                    tracing::debug!(url = %request.url, "background fetch failed: {}", e);
                }
            }
        })
    }
}

async fn lookup_in(store: &PartitionStore, name: &str, request: &Request) -> Result<Option<Response>, Error> {
    match store.find_partition(name).await? {
        Some(partition) => store.match_entry(&partition, request).await,
        None => Ok(None),
    }
}

async fn write_entry(store: &PartitionStore, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
    let partition = store.open_partition(name).await?;
    store.put(&partition, request, response).await
}
