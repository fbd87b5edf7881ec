//! Routes and their ordered fallback steps.
//!
//! A strategy is a plain list of steps. The executor tries them in order and
//! the first step that produces a response wins, so fallback order is data
//! and can be asserted without touching the network.

use precios_core::{PartitionRole, Request};

use crate::manifest::Manifest;

/// Body of the generic 503.
pub const OFFLINE: &str = "Offline";

/// Body of the 503 for static assets missing from every partition.
pub const ASSET_UNAVAILABLE: &str = "Recurso no disponible offline";

/// `mensaje` of the synthesized search payload.
pub const OFFLINE_SEARCH_MESSAGE: &str = "Modo offline - usando datos cacheados";

/// Request class, decided once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// The bundled product dataset: network first, prices must be fresh.
    Dataset,
    Api,
    StaticAsset,
    /// HTML page loads.
    Navigation,
    /// Anything else in scope: stale-while-revalidate.
    Dynamic,
}

/// Where a network step stores a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    Nothing,
    Into(PartitionRole),
    /// Into the static partition, only for static-looking paths.
    StaticLike,
}

/// Which partitions a cache step reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// First match across every partition, oldest partition first.
    Any,
    Partition(PartitionRole),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fetch from the network. Non-2xx answers are returned as-is unless
    /// `ok_only` is set, in which case they fall through to the next step.
    Network { store: Store, ok_only: bool },
    Cache(Lookup),
    /// Serve the dynamic partition's copy and refresh it in the background.
    Revalidate,
    /// Cached root document, for HTML navigations only.
    RootDocument,
    /// `{productos: [], offline: true, mensaje}`, for the search endpoint only.
    OfflineSearchPayload,
    /// A 503 with this body. Always produces a response.
    Unavailable(&'static str),
}

/// Classify a request, or `None` to let it pass through untouched.
///
/// Only GET requests are handled. Cross-origin requests are handled only for
/// allow-listed CDN hosts.
pub fn route(manifest: &Manifest, request: &Request) -> Option<Route> {
    if request.method != precios_core::Method::Get {
        return None;
    }

    let url = &request.url;
    if !manifest.is_same_origin(url) && !manifest.is_allowed_cdn(url) {
        return None;
    }

    if manifest.is_dataset(url) {
        Some(Route::Dataset)
    } else if manifest.is_api(url) {
        Some(Route::Api)
    } else if manifest.contains(url) || url.path().starts_with(&manifest.static_prefix) {
        Some(Route::StaticAsset)
    } else if request.accepts_html() {
        Some(Route::Navigation)
    } else {
        Some(Route::Dynamic)
    }
}

/// The fallback steps for a route.
pub fn plan(route: Route) -> Vec<Step> {
    match route {
        Route::Dataset => vec![
            Step::Network { store: Store::Into(PartitionRole::Static), ok_only: true },
            Step::Cache(Lookup::Any),
            Step::Network { store: Store::StaticLike, ok_only: false },
            Step::RootDocument,
            Step::Unavailable(OFFLINE),
        ],
        Route::Api => vec![
            Step::Network { store: Store::Into(PartitionRole::Api), ok_only: false },
            Step::Cache(Lookup::Any),
            Step::OfflineSearchPayload,
            Step::Unavailable(OFFLINE),
        ],
        Route::StaticAsset => vec![
            Step::Cache(Lookup::Any),
            Step::Network { store: Store::Into(PartitionRole::Static), ok_only: false },
            Step::Unavailable(ASSET_UNAVAILABLE),
        ],
        Route::Navigation => vec![
            Step::Network { store: Store::Into(PartitionRole::Api), ok_only: false },
            Step::Cache(Lookup::Any),
            Step::RootDocument,
            Step::Unavailable(OFFLINE),
        ],
        Route::Dynamic => vec![
            Step::Revalidate,
            Step::Network { store: Store::Into(PartitionRole::Dynamic), ok_only: false },
            Step::Unavailable(OFFLINE),
        ],
    }
}
