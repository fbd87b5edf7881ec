//! worker_fetch tool implementation.
//!
//! Issues a page request and reports how the worker handled it: which route
//! matched and whether the answer came from the strategy engine or went
//! straight to the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::AppState;
use crate::tools::json_result;
use precios_client::fetch::canonicalize;
use precios_core::{Error, Method, Network, Request};
use precios_worker::{Interception, Route};

/// Longest body returned inline, in bytes.
const MAX_BODY: usize = 64 * 1024;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL or a path relative to the app scope.
    pub url: String,
    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
    /// Accept header; `text/html` marks the request as a navigation.
    #[serde(default)]
    pub accept: Option<String>,
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    /// Route chosen by the worker, absent for pass-through requests.
    pub route: Option<String>,
    /// `worker` when the strategy engine answered, `network` otherwise.
    pub served_by: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub truncated: bool,
}

pub async fn fetch_impl(state: &AppState, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let scope = state
        .config
        .scope_url()
        .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let url = canonicalize(&params.url, &scope).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method: Method = params.method.as_deref().unwrap_or("GET").parse()?;

    let mut request = Request::get(url.as_str())?.with_method(method);
    if let Some(accept) = &params.accept {
        request = request.with_header("accept", accept);
    }

    let route = state.worker.engine().route(&request);
    let (response, served_by) = match state.worker.handle_fetch(&request).await {
        Interception::Respond { response, .. } => (response, "worker"),
        Interception::PassThrough => (state.connectivity.fetch(&request).await?, "network"),
    };

    let truncated = response.body.len() > MAX_BODY;
    let body = String::from_utf8_lossy(&response.body[..response.body.len().min(MAX_BODY)]).into_owned();

    let output = WorkerFetchOutput {
        url: url.to_string(),
        route: route.map(route_name),
        served_by: served_by.to_string(),
        status: response.status,
        headers: response.headers,
        body,
        truncated,
    };
    json_result(&output)
}

fn route_name(route: Route) -> String {
    match route {
        Route::Dataset => "dataset",
        Route::Api => "api",
        Route::StaticAsset => "static_asset",
        Route::Navigation => "navigation",
        Route::Dynamic => "dynamic",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state;
    use crate::tools::output_json;
    use precios_core::{AppConfig, Response};

    fn params(url: &str) -> WorkerFetchParams {
        WorkerFetchParams { url: url.into(), method: None, accept: None }
    }

    #[tokio::test]
    async fn test_static_asset_served_from_cache_offline() {
        let (state, _) = state(AppConfig::default()).await;
        state.set_online(false).await;

        let result = fetch_impl(&state, params("static/css/style.css")).await.unwrap();
        let json = output_json(&result);
        assert_eq!(json["route"], "static_asset");
        assert_eq!(json["served_by"], "worker");
        assert_eq!(json["status"], 200);
        assert_eq!(json["body"], "asset /static/css/style.css");
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_root_document() {
        let (state, _) = state(AppConfig::default()).await;
        state.set_online(false).await;

        let request = WorkerFetchParams { accept: Some("text/html".into()), ..params("/some/page") };
        let json = output_json(&fetch_impl(&state, request).await.unwrap());
        assert_eq!(json["route"], "navigation");
        assert_eq!(json["body"], "asset /index.html");
    }

    #[tokio::test]
    async fn test_post_passes_through() {
        let (state, network) = state(AppConfig::default()).await;
        network.respond("http://localhost:8000/api/buscar", Response::new(201, "created"));

        let request = WorkerFetchParams { method: Some("post".into()), ..params("/api/buscar") };
        let json = output_json(&fetch_impl(&state, request).await.unwrap());
        assert_eq!(json["route"], serde_json::Value::Null);
        assert_eq!(json["served_by"], "network");
        assert_eq!(json["status"], 201);
    }

    #[tokio::test]
    async fn test_rejects_non_http_url() {
        let (state, _) = state(AppConfig::default()).await;
        assert!(fetch_impl(&state, params("ftp://example.com/x")).await.is_err());
        assert!(fetch_impl(&state, params("  ")).await.is_err());
    }
}
