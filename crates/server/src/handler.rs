//! MCP server handler implementation.
//!
//! This module defines the server handler that routes tool calls to the
//! page-context and worker-context implementations.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::worker::{
    WorkerFetchParams, WorkerMessageParams, WorkerSyncParams, fetch_impl, message_impl, status_impl, sync_impl,
};
use crate::tools::{
    AutocompleteEventParams, PriceSearchParams, PriceSuggestParams, SetOnlineParams, event_impl, history_impl,
    search_impl, set_online_impl, suggest_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for the offline price lookup.
#[derive(Clone)]
pub struct PreciosServer {
    tool_router: ToolRouter<Self>,
    state: Arc<AppState>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PreciosServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    /// Search products by name.
    ///
    /// Uses the local catalog or the remote API depending on configuration,
    /// falling back to cached results when offline.
    #[tool(
        description = "Search products by name. Returns matching products with USD and CUP prices and where the results came from."
    )]
    async fn price_search(&self, params: Parameters<PriceSearchParams>) -> Result<CallToolResult, McpError> {
        search_impl(&self.state, params.0).await
    }

    #[tool(description = "Update the search input text and return the autocomplete suggestions panel.")]
    async fn price_suggest(&self, params: Parameters<PriceSuggestParams>) -> Result<CallToolResult, McpError> {
        suggest_impl(&self.state, params.0).await
    }

    /// Drive the suggestion panel with a key, pick, blur or submit event.
    #[tool(
        description = "Send a key (ArrowDown, ArrowUp, Enter, Escape), pick, blur or submit event to the autocomplete panel. Committed values are searched."
    )]
    async fn autocomplete_event(
        &self, params: Parameters<AutocompleteEventParams>,
    ) -> Result<CallToolResult, McpError> {
        event_impl(&self.state, params.0).await
    }

    #[tool(description = "List recent searches recorded by the server. Served from cache when offline.")]
    async fn price_history(&self) -> Result<CallToolResult, McpError> {
        history_impl(&self.state).await
    }

    /// Toggle simulated connectivity.
    ///
    /// Offline cuts every outgoing request for both the page and the worker.
    #[tool(description = "Switch the app online or offline.")]
    async fn set_online(&self, params: Parameters<SetOnlineParams>) -> Result<CallToolResult, McpError> {
        set_online_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Fetch a URL as the page would, through the worker. Reports the matched route and whether the worker or the network answered."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Post a control message (SKIP_WAITING, GET_CACHE_SIZE, CLEAR_CACHE, GET_VERSION) to the worker.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state, params.0).await
    }

    #[tool(description = "Fire a background sync event. The default tag refreshes the product dataset in the cache.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.state, params.0).await
    }

    #[tool(description = "Report worker version, lifecycle state, controlled clients and cache partitions.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }
}

impl ServerHandler for PreciosServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "precios-offline".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
