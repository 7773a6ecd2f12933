//! Sequence document types.

use serde::{Deserialize, Serialize};

/// Kind of UI action a step performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    /// Load `url` in the active tab.
    Navigate,
    /// Click the element matching `selector`.
    Click,
    /// Type `text` into the element matching `selector`.
    Type,
    /// Pause for `delay` milliseconds.
    Wait,
}

/// One browser UI action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Action kind.
    pub action: StepAction,
    /// CSS selector of the target element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Destination for `navigate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Input for `type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// Milliseconds to wait after the action.
    pub delay: u64,
}

impl Step {
    /// A `navigate` step.
    pub fn navigate(url: &str, description: &str, delay: u64) -> Self {
        Self {
            action: StepAction::Navigate,
            selector: None,
            url: Some(url.to_owned()),
            text: None,
            description: description.to_owned(),
            delay,
        }
    }

    /// A `click` step.
    pub fn click(selector: &str, description: &str, delay: u64) -> Self {
        Self {
            action: StepAction::Click,
            selector: Some(selector.to_owned()),
            url: None,
            text: None,
            description: description.to_owned(),
            delay,
        }
    }

    /// A `type` step.
    pub fn type_text(selector: &str, text: &str, description: &str, delay: u64) -> Self {
        Self {
            action: StepAction::Type,
            selector: Some(selector.to_owned()),
            url: None,
            text: Some(text.to_owned()),
            description: description.to_owned(),
            delay,
        }
    }

    /// A `wait` step.
    pub fn wait(description: &str, delay: u64) -> Self {
        Self {
            action: StepAction::Wait,
            selector: None,
            url: None,
            text: None,
            description: description.to_owned(),
            delay,
        }
    }
}

/// A named, ordered list of steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceDocument {
    /// Versioned identifier, e.g. `form-creation-v1`.
    pub sequence_id: String,
    /// Display name.
    pub name: String,
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl SequenceDocument {
    /// Sum of all step delays in milliseconds.
    pub fn total_delay_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.delay).sum()
    }
}
