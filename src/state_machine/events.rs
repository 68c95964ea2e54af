use serde::{Deserialize, Serialize};

/// Events that can trigger workflow step state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StepEvent {
    /// Make a pending step the active one
    Activate,
    /// Close the active step, with the officer's optional notes
    Complete(Option<String>),
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Complete(_) => "complete",
        }
    }

    /// Extract notes if this is a completion event
    pub fn notes(&self) -> Option<&str> {
        match self {
            Self::Complete(notes) => notes.as_deref(),
            Self::Activate => None,
        }
    }

    /// Create a completion event carrying notes
    pub fn complete_with_notes(notes: Option<String>) -> Self {
        Self::Complete(notes)
    }
}
