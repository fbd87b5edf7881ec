//! Keyboard and pointer state for the suggestion panel.
//!
//! Pure state machine: it never fetches. `on_input` says whether the caller
//! should request suggestions, `show` installs them, and key/blur events
//! move the selection or produce a `Commit` that the caller feeds to
//! `Session::search`.

use serde::{Deserialize, Serialize};

/// Navigation keys the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

/// Where focus moved on blur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FocusTarget {
    Input,
    Panel,
    Outside,
}

/// Response to a change of the input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Fetch suggestions for this query.
    Suggest(String),
    /// Close the panel; the query is below the length gate.
    Dismiss,
}

/// Response to a key press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum KeyOutcome {
    /// Nothing changed.
    Ignored,
    /// Selection moved to this index.
    Selected(usize),
    /// Run a search for this value.
    Commit(String),
    Dismissed,
}

#[derive(Debug, Clone)]
pub struct Autocomplete {
    min_len: usize,
    suggestions: Vec<String>,
    selected: Option<usize>,
    visible: bool,
}

impl Autocomplete {
    pub fn new(min_len: usize) -> Self {
        Self { min_len, suggestions: Vec::new(), selected: None, visible: false }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Gate a new input value on the minimum query length.
    pub fn on_input(&mut self, text: &str) -> InputAction {
        let query = text.trim();
        if query.chars().count() >= self.min_len {
            InputAction::Suggest(query.to_string())
        } else {
            self.dismiss();
            InputAction::Dismiss
        }
    }

    /// Install a suggestion list. An empty list closes the panel.
    pub fn show(&mut self, suggestions: Vec<String>) {
        self.visible = !suggestions.is_empty();
        self.suggestions = suggestions;
        self.selected = None;
    }

    pub fn on_key(&mut self, key: Key) -> KeyOutcome {
        if !self.visible || self.suggestions.is_empty() {
            return KeyOutcome::Ignored;
        }

        let len = self.suggestions.len();
        match key {
            Key::ArrowDown => {
                let next = self.selected.map_or(0, |i| (i + 1) % len);
                self.selected = Some(next);
                KeyOutcome::Selected(next)
            }
            Key::ArrowUp => {
                let prev = match self.selected {
                    None | Some(0) => len - 1,
                    Some(i) => i - 1,
                };
                self.selected = Some(prev);
                KeyOutcome::Selected(prev)
            }
            Key::Enter => match self.selected.and_then(|i| self.suggestions.get(i)).cloned() {
                Some(value) => {
                    self.dismiss();
                    KeyOutcome::Commit(value)
                }
                None => KeyOutcome::Ignored,
            },
            Key::Escape => {
                self.dismiss();
                KeyOutcome::Dismissed
            }
        }
    }

    /// Pointer pick of a suggestion by index.
    pub fn pick(&mut self, index: usize) -> Option<String> {
        let value = self.suggestions.get(index).cloned()?;
        self.dismiss();
        Some(value)
    }

    /// Close the panel unless focus stayed inside the widget.
    pub fn on_blur(&mut self, target: FocusTarget) -> bool {
        if target == FocusTarget::Outside {
            self.dismiss();
            true
        } else {
            false
        }
    }

    /// Confirm the typed text when no suggestion is selected.
    pub fn commit_typed(&mut self, text: &str) -> Option<String> {
        let query = text.trim();
        self.dismiss();
        if query.is_empty() { None } else { Some(query.to_string()) }
    }

    fn dismiss(&mut self) {
        self.visible = false;
        self.selected = None;
    }
}
