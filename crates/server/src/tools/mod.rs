//! MCP tool implementations.
//!
//! Page-context tools drive the session and autocomplete controller;
//! `worker_*` tools talk to the worker through its control channel or the
//! intercepted-fetch path.

pub mod autocomplete;
pub mod connectivity;
pub mod history;
pub mod search;
pub mod suggest;
pub mod worker;

pub use autocomplete::{AutocompleteEventParams, event_impl};
pub use connectivity::{SetOnlineParams, set_online_impl};
pub use history::history_impl;
pub use search::{PriceSearchParams, search_impl};
pub use suggest::{PriceSuggestParams, suggest_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use precios_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json =
        serde_json::to_string_pretty(output).map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let text = result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.clone())
        .unwrap_or_default();
    serde_json::from_str(&text).unwrap()
}
