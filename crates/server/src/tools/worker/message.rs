//! worker_message tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;
use precios_core::{WorkerMessage, WorkerReply};

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// `{"type": "GET_VERSION"}` and friends.
    pub message: WorkerMessage,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WorkerMessageOutput {
    pub message: WorkerMessage,
    /// Absent for fire-and-forget messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<WorkerReply>,
}

/// Post a control message through the worker channel, waiting for the
/// reply when the message carries one.
pub async fn message_impl(state: &AppState, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let message = params.message;
    let reply = if message.expects_reply() {
        Some(state.channel.request(message).await?)
    } else {
        state.channel.post(message).await?;
        None
    };

    json_result(&WorkerMessageOutput { message, reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state;
    use crate::tools::output_json;
    use precios_core::AppConfig;

    async fn send(state: &AppState, message: WorkerMessage) -> serde_json::Value {
        output_json(&message_impl(state, WorkerMessageParams { message }).await.unwrap())
    }

    #[tokio::test]
    async fn test_get_version() {
        let (state, _) = state(AppConfig::default()).await;
        let json = send(&state, WorkerMessage::GetVersion).await;
        assert_eq!(json["message"]["type"], "GET_VERSION");
        assert_eq!(json["reply"]["version"], "precios-app-v1.0.3");
    }

    #[tokio::test]
    async fn test_cache_size_then_clear() {
        let (state, _) = state(AppConfig::default()).await;
        let size = send(&state, WorkerMessage::GetCacheSize).await;
        assert!(size["reply"]["size"].as_u64().is_some());

        let cleared = send(&state, WorkerMessage::ClearCache).await;
        assert_eq!(cleared["reply"]["cleared"], true);

        let empty = send(&state, WorkerMessage::GetCacheSize).await;
        assert_eq!(empty["reply"]["size"], 0);
    }

    #[tokio::test]
    async fn test_skip_waiting_has_no_reply() {
        let (state, _) = state(AppConfig::default()).await;
        let json = send(&state, WorkerMessage::SkipWaiting).await;
        assert!(json.get("reply").is_none());
    }

    #[test]
    fn test_params_from_wire_shape() {
        let params: WorkerMessageParams =
            serde_json::from_value(serde_json::json!({"message": {"type": "CLEAR_CACHE"}})).unwrap();
        assert_eq!(params.message, WorkerMessage::ClearCache);
    }
}
