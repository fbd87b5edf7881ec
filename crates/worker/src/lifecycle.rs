//! Install/activate lifecycle of one worker version.
//!
//! `Parsed -> Installing -> Installed -> Activating -> Active`, with any
//! install failure ending in `Redundant`. Install is all-or-nothing: the
//! static partition only receives entries once every manifest asset has
//! been fetched with a 2xx status.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::task::JoinSet;

use crate::manifest::Manifest;
use precios_core::{Error, Network, PartitionRole, PartitionSet, PartitionStore, Request, Response};

/// Background sync tag that refreshes the bundled dataset.
pub const SYNC_TAG: &str = "background-sync-productos";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed; this version will never control clients.
    Redundant,
}

#[derive(Debug)]
struct Inner {
    state: LifecycleState,
    skip_waiting: bool,
    clients: BTreeSet<String>,
    controlled: BTreeSet<String>,
}

/// Drives install and activation for the current version.
pub struct Coordinator {
    store: PartitionStore,
    network: Arc<dyn Network>,
    partitions: PartitionSet,
    manifest: Arc<Manifest>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("partitions", &self.partitions)
            .field("inner", &*self.inner())
            .finish()
    }
}

impl Coordinator {
    pub fn new(
        store: PartitionStore, network: Arc<dyn Network>, partitions: PartitionSet, manifest: Arc<Manifest>,
    ) -> Self {
        let inner = Inner {
            state: LifecycleState::Parsed,
            skip_waiting: false,
            clients: BTreeSet::new(),
            controlled: BTreeSet::new(),
        };
        Self { store, network, partitions, manifest, inner: Mutex::new(inner) }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LifecycleState {
        self.inner().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.inner().skip_waiting
    }

    fn set_state(&self, state: LifecycleState) {
        let mut inner = self.inner();
        tracing::debug!(from = ?inner.state, to = ?state, "lifecycle transition");
        inner.state = state;
    }

    /// Move `from -> to` atomically, or fail if the current state differs.
    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), Error> {
        let mut inner = self.inner();
        if inner.state != from {
            return Err(Error::InvalidState(format!("expected {:?}, found {:?}", from, inner.state)));
        }
        inner.state = to;
        Ok(())
    }

    /// Precache every manifest asset into the static partition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless the worker is `Parsed`. Any fetch
    /// failure or non-2xx status returns `Error::NetworkFailure` and leaves the
    /// worker `Redundant` with nothing written.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(LifecycleState::Parsed, LifecycleState::Installing)?;
        tracing::info!(version = self.partitions.version(), assets = self.manifest.assets.len(), "installing");

        match self.precache().await {
            Ok(count) => {
                let mut inner = self.inner();
                inner.state = LifecycleState::Installed;
                inner.skip_waiting = true;
                tracing::info!(entries = count, "install complete");
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::Redundant);
                tracing::warn!("install failed: {}", e);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let mut join_set = JoinSet::new();

        for (index, url) in self.manifest.assets.iter().enumerate() {
            let request = Request::get(url.as_str())?;
            let network = self.network.clone();
            join_set.spawn(async move {
                let result = network.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut fetched: Vec<(usize, Request, Response)> = Vec::with_capacity(self.manifest.assets.len());
        while let Some(joined) = join_set.join_next().await {
            let (index, request, result) = joined.map_err(|e| Error::NetworkFailure(e.to_string()))?;

            let failure = match result {
                Ok(response) if response.is_ok() => {
                    fetched.push((index, request, response));
                    continue;
                }
                Ok(response) => format!("{} returned HTTP {}", request.url, response.status),
                Err(e) => e.to_string(),
            };

            join_set.shutdown().await;
            return Err(Error::NetworkFailure(format!("precache failed: {failure}")));
        }

        fetched.sort_by_key(|(index, _, _)| *index);
        let entries: Vec<(Request, Response)> = fetched.into_iter().map(|(_, req, resp)| (req, resp)).collect();

        let partition = self.store.open_partition(&self.partitions.name(PartitionRole::Static)).await?;
        self.store.put_all(&partition, &entries).await?;
        Ok(entries.len())
    }

    /// Promote an installed worker.
    ///
    /// Deletes every partition outside the current version's set, provisions
    /// the current three, and claims all registered clients.
    pub async fn activate(&self) -> Result<(), Error> {
        self.transition(LifecycleState::Installed, LifecycleState::Activating)?;

        match self.swap_partitions().await {
            Ok(deleted) => {
                let claimed = self.claim();
                self.set_state(LifecycleState::Active);
                tracing::info!(deleted = deleted.len(), claimed, "activated");
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::Installed);
                tracing::warn!("activation failed: {}", e);
                Err(e)
            }
        }
    }

    async fn swap_partitions(&self) -> Result<Vec<String>, Error> {
        let current = self.partitions.names();
        let deleted = self.store.delete_all_except(&current).await?;
        for name in &current {
            self.store.open_partition(name).await?;
        }
        Ok(deleted)
    }

    /// Request activation without waiting for old clients to close.
    pub fn skip_waiting(&self) {
        self.inner().skip_waiting = true;
    }

    pub fn register_client(&self, id: &str) {
        self.inner().clients.insert(id.to_string());
    }

    /// Take control of every registered client. Returns how many were claimed.
    pub fn claim(&self) -> usize {
        let mut inner = self.inner();
        let clients = inner.clients.clone();
        inner.controlled = clients;
        inner.controlled.len()
    }

    pub fn controlled_clients(&self) -> Vec<String> {
        self.inner().controlled.iter().cloned().collect()
    }

    /// Handle a background sync event.
    ///
    /// `background-sync-productos` refetches the dataset into the static
    /// partition and returns `true`; other tags are ignored.
    pub async fn sync(&self, tag: &str) -> Result<bool, Error> {
        if tag != SYNC_TAG {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return Ok(false);
        }

        let request = Request::get(self.manifest.dataset.as_str())?;
        let response = self.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::NetworkFailure(format!("{} returned HTTP {}", request.url, response.status)));
        }

        let partition = self.store.open_partition(&self.partitions.name(PartitionRole::Static)).await?;
        self.store.put(&partition, &request, &response).await?;
        tracing::info!(tag, bytes = response.body.len(), "product sync complete");
        Ok(true)
    }
}
