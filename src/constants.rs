//! # System Constants
//!
//! Event names and numbering defaults shared across the case routing core.

// Re-export state types for convenience
pub use crate::state_machine::{CaseState as CaseStatus, StepState as StepStatus};

/// Lifecycle events published by the case service
pub mod events {
    pub const CASE_CREATED: &str = "case.created";
    pub const CASE_STATUS_CHANGED: &str = "case.status_changed";
    pub const CASE_COMPLETED: &str = "case.completed";

    pub const STEP_ACTIVATED: &str = "step.activated";
    pub const STEP_COMPLETED: &str = "step.completed";

    pub const WORKFLOW_REDEFINED: &str = "workflow.redefined";
    pub const DOCUMENT_ATTACHED: &str = "document.attached";
}

/// Case numbering defaults
pub mod numbering {
    /// Prefix of every case number (`FILE-<year>-<sequence>`)
    pub const DEFAULT_PREFIX: &str = "FILE";
    /// Minimum digits of the zero-padded sequence
    pub const DEFAULT_SEQUENCE_WIDTH: usize = 3;
}

pub mod system {
    pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 5;
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;
    pub const DEFAULT_PAGE_LIMIT: u32 = 10;
}
