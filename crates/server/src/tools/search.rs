//! price_search tool implementation.
//!
//! Runs a full search through the page session: API, query cache or
//! catalog depending on mode and connectivity.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;
use precios_client::SearchOutcome;

/// Parameters for the price_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PriceSearchParams {
    /// Product name or fragment, matched case-insensitively.
    pub query: String,
}

/// Output from the price_search tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PriceSearchOutput {
    pub query: String,
    pub online: bool,
    pub outcome: SearchOutcome,
}

pub async fn search_impl(state: &AppState, params: PriceSearchParams) -> Result<CallToolResult, McpError> {
    let mut session = state.session.lock().await;
    let outcome = session.search(&params.query).await;

    let output = PriceSearchOutput { query: params.query, online: session.is_online(), outcome };
    json_result(&output)
}
