//! price_suggest tool implementation.
//!
//! Feeds the typed text through the autocomplete length gate and, when it
//! passes, fills the suggestion panel from the session.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;
use precios_client::InputAction;

/// Parameters for the price_suggest tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PriceSuggestParams {
    /// Current contents of the search input.
    pub text: String,
}

/// Output from the price_suggest tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PriceSuggestOutput {
    /// Suggestions shown in the panel, first 10 of the search order.
    pub suggestions: Vec<String>,
    /// Whether the panel is open.
    pub visible: bool,
}

pub async fn suggest_impl(state: &AppState, params: PriceSuggestParams) -> Result<CallToolResult, McpError> {
    let action = state.autocomplete.lock().await.on_input(&params.text);

    let suggestions = match action {
        InputAction::Suggest(query) => state.session.lock().await.suggest(&query).await,
        InputAction::Dismiss => Vec::new(),
    };

    let mut autocomplete = state.autocomplete.lock().await;
    autocomplete.show(suggestions);

    let output = PriceSuggestOutput { suggestions: autocomplete.suggestions().to_vec(), visible: autocomplete.is_visible() };
    json_result(&output)
}
