//! worker_status tool implementation.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;

use crate::state::AppState;
use crate::tools::json_result;
use precios_worker::LifecycleState;

/// Snapshot of the worker and its partitions.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub version: String,
    pub state: LifecycleState,
    pub online: bool,
    pub controlled_clients: Vec<String>,
    pub partitions: Vec<String>,
    pub cache_size_kb: u64,
    /// RFC 3339 timestamp of the snapshot.
    pub checked_at: String,
}

pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let worker = &state.worker;
    let output = WorkerStatusOutput {
        version: worker.version_tag().to_string(),
        state: worker.lifecycle().state(),
        online: state.connectivity.is_online(),
        controlled_clients: worker.lifecycle().controlled_clients(),
        partitions: worker.partition_keys().await?,
        cache_size_kb: worker.cache_size_kb().await?,
        checked_at: Utc::now().to_rfc3339(),
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state;
    use crate::tools::output_json;
    use precios_core::AppConfig;

    #[tokio::test]
    async fn test_status_after_boot() {
        let (state, _) = state(AppConfig::default()).await;
        let json = output_json(&status_impl(&state).await.unwrap());

        assert_eq!(json["version"], "precios-app-v1.0.3");
        assert_eq!(json["state"], "active");
        assert_eq!(json["online"], true);
        assert_eq!(json["controlled_clients"], serde_json::json!(["page"]));
        let partitions = json["partitions"].as_array().unwrap();
        assert_eq!(partitions.len(), 3);
        assert!(json["checked_at"].is_string());
    }
}
