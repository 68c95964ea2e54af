//! # Workflow Model
//!
//! The ordered sequence of approval steps attached to one case.
//!
//! ## Invariants
//!
//! - Exactly one workflow per case, keyed by the case id, created together with it.
//! - Step numbers are exactly `1..=N` in list order.
//! - At most one step is `IN_PROGRESS` at any time.
//!
//! ## Database Schema
//!
//! Steps are child rows of `caseflow_workflows` keyed by `(case_id, step_number)`;
//! a partial unique index on `case_id WHERE status = 'IN_PROGRESS'` backs the
//! single-active-step invariant.

use crate::state_machine::StepState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered approval steps for one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub case_id: Uuid,
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One department/officer approval stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// 1-based position in the workflow
    pub step_number: u32,
    pub department_id: Uuid,
    pub officer_id: Uuid,
    pub status: StepState,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workflow {
    /// The step currently `IN_PROGRESS`, if any
    pub fn active_step(&self) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.status.is_active())
    }

    /// The `IN_PROGRESS` step assigned to the given officer, if any
    pub fn active_step_for(&self, officer_id: Uuid) -> Option<&WorkflowStep> {
        self.steps
            .iter()
            .find(|step| step.status.is_active() && step.officer_id == officer_id)
    }

    /// First step still `PENDING`, in list order
    pub fn first_pending_step(&self) -> Option<&WorkflowStep> {
        self.steps
            .iter()
            .find(|step| step.status == StepState::Pending)
    }

    pub fn step(&self, step_number: u32) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.step_number == step_number)
    }

    pub fn step_mut(&mut self, step_number: u32) -> Option<&mut WorkflowStep> {
        self.steps
            .iter_mut()
            .find(|step| step.step_number == step_number)
    }

    /// Whether every step is COMPLETED or SKIPPED
    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(|step| step.status.is_terminal())
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Whether the workflow routes through the given department
    pub fn involves_department(&self, department_id: Uuid) -> bool {
        self.steps
            .iter()
            .any(|step| step.department_id == department_id)
    }
}

/// Caller-supplied step assignment, as accepted by creation and redefinition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAssignment {
    pub department_id: Uuid,
    pub officer_id: Uuid,
    /// Accepted for wire compatibility; list position is authoritative
    #[serde(default)]
    pub step_number: Option<u32>,
    /// Preserved as given; defaults to PENDING
    #[serde(default)]
    pub status: Option<StepState>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StepAssignment {
    pub fn new(department_id: Uuid, officer_id: Uuid) -> Self {
        Self {
            department_id,
            officer_id,
            step_number: None,
            status: None,
            notes: None,
        }
    }

    pub fn with_status(mut self, status: StepState) -> Self {
        self.status = Some(status);
        self
    }
}
