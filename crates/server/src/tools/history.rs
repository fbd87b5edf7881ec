//! price_history tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;
use crate::state::AppState;
use precios_core::HistoryResponse;

/// Recent searches from `GET /api/historial`, through the worker.
pub async fn history_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let historial = state.session.lock().await.history().await?;
    json_result(&HistoryResponse { historial })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state;
    use crate::tools::output_json;
    use precios_core::{AppConfig, Response};

    #[tokio::test]
    async fn test_history_cached_for_offline() {
        let (state, network) = state(AppConfig::default()).await;
        network.respond(
            "http://localhost:8000/api/historial",
            Response::json(&serde_json::json!({"historial": ["vino", "ron"]})),
        );

        let online = history_impl(&state).await.unwrap();
        assert_eq!(output_json(&online)["historial"], serde_json::json!(["vino", "ron"]));

        state.set_online(false).await;
        let offline = history_impl(&state).await.unwrap();
        assert_eq!(output_json(&offline)["historial"], serde_json::json!(["vino", "ron"]));
    }

    #[tokio::test]
    async fn test_history_offline_uncached_is_error() {
        let (state, _) = state(AppConfig::default()).await;
        state.set_online(false).await;
        assert!(history_impl(&state).await.is_err());
    }
}
