//! The worker context: lifecycle, fetch interception and the control inbox.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::{Coordinator, LifecycleState};
use crate::manifest::Manifest;
use crate::strategy::{Interception, StrategyEngine};
use precios_core::message::Envelope;
use precios_core::{AppConfig, Error, Network, PartitionStore, Request, WorkerMessage, WorkerReply};

/// One running worker version.
#[derive(Debug)]
pub struct Worker {
    version_tag: String,
    store: PartitionStore,
    engine: StrategyEngine,
    lifecycle: Coordinator,
}

impl Worker {
    pub fn new(config: &AppConfig, store: PartitionStore, network: Arc<dyn Network>) -> Result<Self, Error> {
        let manifest = Arc::new(Manifest::from_config(config)?);
        let partitions = config.partitions();

        let engine = StrategyEngine::new(store.clone(), network.clone(), partitions.clone(), manifest.clone());
        let lifecycle = Coordinator::new(store.clone(), network, partitions, manifest);

        Ok(Self { version_tag: config.version_tag(), store, engine, lifecycle })
    }

    pub fn version_tag(&self) -> &str {
        &self.version_tag
    }

    pub fn engine(&self) -> &StrategyEngine {
        &self.engine
    }

    pub fn lifecycle(&self) -> &Coordinator {
        &self.lifecycle
    }

    /// Install and immediately activate.
    pub async fn start(&self) -> Result<(), Error> {
        self.lifecycle.install().await?;
        self.lifecycle.activate().await
    }

    /// Intercept a page request. Requests pass through until the worker is active.
    pub async fn handle_fetch(&self, request: &Request) -> Interception {
        if !self.lifecycle.is_active() {
            return Interception::PassThrough;
        }
        self.engine.handle(request).await
    }

    /// Total cached bytes in KB, rounded to nearest.
    pub async fn cache_size_kb(&self) -> Result<u64, Error> {
        let bytes = self.store.total_size_bytes().await?;
        Ok((bytes + 512) / 1024)
    }

    /// Names of every partition currently in the store.
    pub async fn partition_keys(&self) -> Result<Vec<String>, Error> {
        self.store.keys().await
    }

    /// Delete every partition. Returns how many were removed.
    pub async fn clear_caches(&self) -> Result<u64, Error> {
        self.store.clear_all().await
    }

    /// Single entry point for control messages.
    ///
    /// Returns the reply for messages that expect one. Internal failures still
    /// produce a reply: size `0` or `cleared: false`.
    pub async fn dispatch(&self, message: WorkerMessage) -> Option<WorkerReply> {
        tracing::debug!(?message, "control message");

        match message {
            WorkerMessage::SkipWaiting => {
                self.lifecycle.skip_waiting();
                if self.lifecycle.state() == LifecycleState::Installed
                    && let Err(e) = self.lifecycle.activate().await
                {
                    tracing::warn!("activation after SKIP_WAITING failed: {}", e);
                }
                None
            }
            WorkerMessage::GetCacheSize => {
                let size = self.cache_size_kb().await.unwrap_or_else(|e| {
                    tracing::warn!("cache size unavailable: {}", e);
                    0
                });
                Some(WorkerReply::Size { size })
            }
            WorkerMessage::ClearCache => {
                let cleared = match self.clear_caches().await {
                    Ok(count) => {
                        tracing::info!(partitions = count, "cleared all caches");
                        true
                    }
                    Err(e) => {
                        tracing::warn!("clear cache failed: {}", e);
                        false
                    }
                };
                Some(WorkerReply::Cleared { cleared })
            }
            WorkerMessage::GetVersion => Some(WorkerReply::Version { version: self.version_tag.clone() }),
        }
    }
}

/// Serve the control inbox until every sender is dropped.
///
/// Each envelope runs on its own task; a reply port is always answered
/// exactly once.
pub fn spawn_inbox(worker: Arc<Worker>, mut rx: mpsc::Receiver<Envelope>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let worker = worker.clone();
            tokio::spawn(async move {
                let Envelope { message, reply } = envelope;
                let answer = worker.dispatch(message).await;
                match (reply, answer) {
                    (Some(port), Some(answer)) => {
                        if port.send(answer).is_err() {
                            tracing::debug!(?message, "requester went away before reply");
                        }
                    }
                    (Some(_), None) => tracing::debug!(?message, "reply port dropped for message without reply"),
                    (None, _) => {}
                }
            });
        }
        tracing::debug!("worker inbox closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use precios_core::message::channel;
    use precios_core::testing::MockNetwork;
    use precios_core::{PartitionRole, PartitionSet, Response};

    async fn worker(network: Arc<MockNetwork>) -> (Arc<Worker>, PartitionStore) {
        let config = AppConfig::default();
        let store = PartitionStore::open_in_memory().await.unwrap();
        let worker = Worker::new(&config, store.clone(), network).unwrap();
        (Arc::new(worker), store)
    }

    fn serve_manifest(network: &MockNetwork) {
        let manifest = Manifest::from_config(&AppConfig::default()).unwrap();
        for url in &manifest.assets {
            network.respond(url.as_str(), Response::new(200, "ok"));
        }
    }

    async fn seed_bytes(store: &PartitionStore, len: usize) {
        let name = PartitionSet::new("1.0.3").name(PartitionRole::Dynamic);
        let partition = store.open_partition(&name).await.unwrap();
        let request = Request::get("http://localhost:8000/blob").unwrap();
        store.put(&partition, &request, &Response::new(200, vec![b'x'; len])).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_version() {
        let (worker, _) = worker(Arc::new(MockNetwork::new())).await;
        let reply = worker.dispatch(WorkerMessage::GetVersion).await;
        assert_eq!(reply, Some(WorkerReply::Version { version: "precios-app-v1.0.3".into() }));
    }

    #[tokio::test]
    async fn test_cache_size_rounds_to_kb() {
        let (worker, store) = worker(Arc::new(MockNetwork::new())).await;
        assert_eq!(worker.dispatch(WorkerMessage::GetCacheSize).await, Some(WorkerReply::Size { size: 0 }));

        seed_bytes(&store, 1536).await;
        assert_eq!(worker.dispatch(WorkerMessage::GetCacheSize).await, Some(WorkerReply::Size { size: 2 }));
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let (worker, store) = worker(Arc::new(MockNetwork::new())).await;
        seed_bytes(&store, 10).await;

        let reply = worker.dispatch(WorkerMessage::ClearCache).await;
        assert_eq!(reply, Some(WorkerReply::Cleared { cleared: true }));
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_installed_worker() {
        let network = Arc::new(MockNetwork::new());
        serve_manifest(&network);
        let (worker, _) = worker(network).await;

        worker.lifecycle().install().await.unwrap();
        assert_eq!(worker.dispatch(WorkerMessage::SkipWaiting).await, None);
        assert_eq!(worker.lifecycle().state(), LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_fetch_passes_through_until_active() {
        let network = Arc::new(MockNetwork::new());
        serve_manifest(&network);
        let (worker, _) = worker(network.clone()).await;
        let request = Request::get("http://localhost:8000/static/css/style.css").unwrap();

        assert!(matches!(worker.handle_fetch(&request).await, Interception::PassThrough));

        worker.start().await.unwrap();
        network.set_offline(true);
        let response = worker.handle_fetch(&request).await.into_response().unwrap();
        assert_eq!(response.text(), "ok");
    }

    #[tokio::test]
    async fn test_inbox_answers_requests() {
        let (worker, store) = worker(Arc::new(MockNetwork::new())).await;
        seed_bytes(&store, 4096).await;
        let (channel, rx) = channel(8);
        let inbox = spawn_inbox(worker, rx);

        let version = channel.request(WorkerMessage::GetVersion).await.unwrap();
        assert_eq!(version, WorkerReply::Version { version: "precios-app-v1.0.3".into() });

        let size = channel.request(WorkerMessage::GetCacheSize).await.unwrap();
        assert_eq!(size, WorkerReply::Size { size: 4 });

        channel.post(WorkerMessage::SkipWaiting).await.unwrap();

        let cleared = channel.request(WorkerMessage::ClearCache).await.unwrap();
        assert_eq!(cleared, WorkerReply::Cleared { cleared: true });

        drop(channel);
        inbox.await.unwrap();
    }
}
