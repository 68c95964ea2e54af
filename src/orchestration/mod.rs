//! # Case Orchestration
//!
//! The workflow core: how steps are numbered, activated and completed, and how
//! the parent case's status and step pointer stay in step with them.
//!
//! ## Core Components
//!
//! - **StepSequenceBuilder**: turns ordered assignments into steps numbered `1..=N`
//! - **CaseNumberGenerator**: `<prefix>-<year>-<sequence>` from an atomic counter
//! - **WorkflowEngine**: activation, completion and advancement; owns the
//!   single-active-step invariant
//! - **StatusSynchronizer**: writes engine output back onto the case
//! - **DocumentLedger**: append-only document metadata entries
//! - **CaseInitializer**: atomic case + workflow creation
//! - **CaseService**: facade running capability checks and optimistic commits
//!   around all of the above

pub mod case_initializer;
pub mod case_numbering;
pub mod case_service;
pub mod document_ledger;
pub mod status_synchronizer;
pub mod step_sequence;
pub mod workflow_engine;

// Re-export core types and components for easy access
pub use case_initializer::{CaseInitializationResult, CaseInitializer};
pub use case_numbering::{format_case_number, CaseNumberGenerator};
pub use case_service::{CaseService, CompletionOutcome, StatusUpdate, StatusUpdateRequest};
pub use document_ledger::DocumentLedger;
pub use status_synchronizer::StatusSynchronizer;
pub use step_sequence::StepSequenceBuilder;
pub use workflow_engine::{Advancement, NextStep, WorkflowEngine};
