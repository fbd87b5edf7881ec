//! autocomplete_event tool implementation.
//!
//! Replays one keyboard, pointer or focus event against the suggestion
//! panel. Events that commit a value run the search immediately, the same
//! way the page does.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;
use precios_client::{FocusTarget, Key, KeyOutcome, SearchOutcome};

/// A single widget event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutocompleteEvent {
    /// A navigation key pressed in the input.
    Key { key: Key },
    /// A click on the suggestion at `index`.
    Pick { index: usize },
    /// Focus left the input.
    Blur { target: FocusTarget },
    /// The form was submitted with the typed text.
    Submit { text: String },
}

/// Parameters for the autocomplete_event tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AutocompleteEventParams {
    pub event: AutocompleteEvent,
}

/// Panel state after the event.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PanelState {
    pub visible: bool,
    pub selected: Option<usize>,
    pub suggestions: Vec<String>,
}

/// Output from the autocomplete_event tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AutocompleteEventOutput {
    pub outcome: KeyOutcome,
    pub panel: PanelState,
    /// Present when the event committed a value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchOutcome>,
}

pub async fn event_impl(state: &AppState, params: AutocompleteEventParams) -> Result<CallToolResult, McpError> {
    let (outcome, panel) = {
        let mut autocomplete = state.autocomplete.lock().await;
        let outcome = match params.event {
            AutocompleteEvent::Key { key } => autocomplete.on_key(key),
            AutocompleteEvent::Pick { index } => autocomplete.pick(index).map_or(KeyOutcome::Ignored, KeyOutcome::Commit),
            AutocompleteEvent::Blur { target } => {
                if autocomplete.on_blur(target) {
                    KeyOutcome::Dismissed
                } else {
                    KeyOutcome::Ignored
                }
            }
            AutocompleteEvent::Submit { text } => {
                autocomplete.commit_typed(&text).map_or(KeyOutcome::Ignored, KeyOutcome::Commit)
            }
        };
        let panel = PanelState {
            visible: autocomplete.is_visible(),
            selected: autocomplete.selected(),
            suggestions: autocomplete.suggestions().to_vec(),
        };
        (outcome, panel)
    };

    let search = match &outcome {
        KeyOutcome::Commit(value) => Some(state.session.lock().await.search(value).await),
        _ => None,
    };

    json_result(&AutocompleteEventOutput { outcome, panel, search })
}
