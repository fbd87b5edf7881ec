//! Wiring of the page and worker contexts behind the MCP tools.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use precios_client::{Autocomplete, FetchConfig, HttpNetwork, Session};
use precios_core::{AppConfig, Error, Network, PartitionStore, Request, Response, WorkerChannel, message};
use precios_worker::{InterceptingNetwork, Worker, spawn_inbox};

/// Client id the single page session registers with the worker.
const PAGE_CLIENT: &str = "page";

/// Network with an on/off switch, the server's stand-in for the browser's
/// offline mode.
pub struct Connectivity {
    online: AtomicBool,
    inner: Arc<dyn Network>,
}

impl Connectivity {
    pub fn new(inner: Arc<dyn Network>) -> Self {
        Self { online: AtomicBool::new(true), inner }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for Connectivity {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if !self.is_online() {
            return Err(Error::NetworkFailure(format!("offline: {}", request.url)));
        }
        self.inner.fetch(request).await
    }
}

/// Everything one page lifetime needs.
pub struct AppState {
    pub config: AppConfig,
    pub connectivity: Arc<Connectivity>,
    pub worker: Arc<Worker>,
    pub channel: WorkerChannel,
    /// Page-side network: every request goes through the worker first.
    pub page_network: Arc<InterceptingNetwork>,
    pub session: Mutex<Session>,
    pub autocomplete: Mutex<Autocomplete>,
    inbox: JoinHandle<()>,
}

impl AppState {
    /// Open the partition store and boot both contexts over real HTTP.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, Error> {
        let store = PartitionStore::open(&config.db_path)
            .await?
            .with_quota(config.quota_bytes);
        let http = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
        Self::with_network(config, store, http).await
    }

    /// Boot over an arbitrary network.
    ///
    /// A failed worker install is logged and leaves page requests passing
    /// straight through to the network.
    pub async fn with_network(
        config: AppConfig, store: PartitionStore, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let connectivity = Arc::new(Connectivity::new(network));

        let worker = Arc::new(Worker::new(&config, store, connectivity.clone())?);
        worker.lifecycle().register_client(PAGE_CLIENT);
        if let Err(e) = worker.start().await {
            tracing::warn!("worker not active, requests pass through: {}", e);
        }

        let (channel, rx) = message::channel(32);
        let inbox = spawn_inbox(worker.clone(), rx);

        let page_network = Arc::new(InterceptingNetwork::new(worker.clone(), connectivity.clone()));
        let session = Session::start(config.clone(), page_network.clone())
            .await?
            .with_worker(channel.clone());
        let autocomplete = Autocomplete::new(config.min_query_len);

        Ok(Self {
            config,
            connectivity,
            worker,
            channel,
            page_network,
            session: Mutex::new(session),
            autocomplete: Mutex::new(autocomplete),
            inbox,
        })
    }

    /// Flip connectivity for both contexts.
    pub async fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
        self.session.lock().await.set_online(online);
    }

    /// Tear down the session and stop the inbox.
    pub async fn shutdown(self) {
        self.session.into_inner().end();
        self.inbox.abort();
        tracing::info!("page session closed");
    }
}
