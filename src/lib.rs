#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Caseflow Core
//!
//! Case ("file") routing through ordered departmental approval steps.
//!
//! ## Overview
//!
//! A case is created together with an ordered list of department/officer
//! assignments. The first step becomes active; each time the assigned officer
//! completes the active step the workflow advances to the next pending step,
//! and once no step is left pending the case is COMPLETED. The case's status
//! and current-step pointer are kept in sync with every transition.
//!
//! ## Key Features
//!
//! - **Single Active Step**: at most one step per workflow is IN_PROGRESS
//! - **Race-Safe Completion**: conditional, version-checked commits; duplicate
//!   completion requests produce exactly one transition
//! - **Atomic Numbering**: `FILE-<year>-<sequence>` from a fetch-and-add counter
//! - **Pluggable Storage**: in-memory store and a PostgreSQL store behind one trait
//! - **Observability**: structured `tracing` logs, OpenTelemetry counters and
//!   in-process lifecycle events
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Workflow engine, numbering, synchronizer and the `CaseService` facade
//! - [`state_machine`] - Case and step states and legal step transitions
//! - [`models`] - Cases, workflows, steps and document metadata
//! - [`store`] - Persistence seam with in-memory and PostgreSQL implementations
//! - [`authorization`] - Actors, roles and capability checks
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`events`] - Lifecycle event broadcast
//! - [`logging`] / [`metrics`] - Observability
//!
//! ## Quick Start
//!
//! ```rust
//! use caseflow_core::{Actor, CaseService, CaseflowConfig, NewCase, StepAssignment};
//! use uuid::Uuid;
//!
//! # async fn example() -> caseflow_core::CaseflowResult<()> {
//! let service = CaseService::in_memory(&CaseflowConfig::default());
//! let (clerk, reviewer) = (Uuid::new_v4(), Uuid::new_v4());
//!
//! let case = service
//!     .create_case(
//!         &Actor::officer(Uuid::new_v4()),
//!         NewCase::new("Land transfer", "Parcel 12").with_steps(vec![
//!             StepAssignment::new(Uuid::new_v4(), clerk),
//!             StepAssignment::new(Uuid::new_v4(), reviewer),
//!         ]),
//!     )
//!     .await?;
//! assert_eq!(case.current_step, 1);
//!
//! service
//!     .complete_active_step(&Actor::officer(clerk), case.case_id, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests (PostgreSQL tests are ignored)
//! ```

pub mod authorization;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod orchestration;
pub mod state_machine;
pub mod store;

pub use authorization::{Actor, AuthorizationGate, Capability, Role, RoleAuthorizationGate};
pub use config::{CaseflowConfig, ConfigManager};
pub use constants::{CaseStatus, StepStatus};
pub use error::{CaseflowError, CaseflowResult};
pub use events::{EventPublisher, PublishedEvent};
pub use models::{
    Case, CaseDetails, CasePage, CaseQuery, DocumentEntry, NewCase, NewDocument, StepAssignment,
    Workflow, WorkflowStep,
};
pub use orchestration::{
    Advancement, CaseService, CompletionOutcome, NextStep, StatusUpdate, StatusUpdateRequest,
};
pub use state_machine::{CaseState, StepState};
pub use store::{CaseStore, InMemoryCaseStore, PgCaseStore, SequenceSource};
