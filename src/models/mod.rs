pub mod case;
pub mod document;
pub mod workflow;

// Re-export core models for easy access
pub use case::{Case, CaseDetails, CasePage, CaseQuery, NewCase};
pub use document::{DocumentEntry, NewDocument};
pub use workflow::{StepAssignment, Workflow, WorkflowStep};
