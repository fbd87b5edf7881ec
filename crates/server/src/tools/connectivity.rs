//! set_online tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the set_online tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetOnlineParams {
    /// `false` cuts both the page and the worker off the network.
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SetOnlineOutput {
    pub online: bool,
}

pub async fn set_online_impl(state: &AppState, params: SetOnlineParams) -> Result<CallToolResult, McpError> {
    state.set_online(params.online).await;
    json_result(&SetOnlineOutput { online: state.connectivity.is_online() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state;
    use crate::tools::output_json;
    use precios_core::AppConfig;

    #[tokio::test]
    async fn test_set_online() {
        let (state, _) = state(AppConfig::default()).await;
        let result = set_online_impl(&state, SetOnlineParams { online: false }).await.unwrap();
        assert_eq!(output_json(&result)["online"], false);
        assert!(!state.session.lock().await.is_online());
    }
}
