//! worker_sync tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;
use precios_worker::SYNC_TAG;

/// Parameters for the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Sync tag (default: the product refresh tag).
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WorkerSyncOutput {
    pub tag: String,
    /// Whether the tag was recognized and the dataset refreshed.
    pub synced: bool,
}

/// Fire a background sync event at the worker.
pub async fn sync_impl(state: &AppState, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.unwrap_or_else(|| SYNC_TAG.to_string());
    let synced = state.worker.lifecycle().sync(&tag).await?;
    json_result(&WorkerSyncOutput { tag, synced })
}
