//! # Step Sequence Builder
//!
//! Turns a caller-supplied ordered list of department/officer assignments into
//! a contiguous, 1-indexed list of workflow steps.
//!
//! ## Rules
//!
//! - List position is authoritative: the step at index `i` becomes step `i + 1`,
//!   whatever `step_number` the caller sent.
//! - Caller-supplied status and notes are kept as given (default PENDING).
//!   Steps submitted as COMPLETED are stamped with the build time as their
//!   `completed_at`; every other status gets none.
//!   Activation of the first step is the initializer's job, not the builder's.
//! - The list must be non-empty, every assignment must name a department and an
//!   officer, and at most one step may arrive `IN_PROGRESS`.

use crate::error::{CaseflowError, CaseflowResult};
use crate::models::{StepAssignment, Workflow, WorkflowStep};
use crate::state_machine::StepState;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

pub struct StepSequenceBuilder;

impl StepSequenceBuilder {
    /// Build a fresh workflow for `case_id` from `assignments`
    pub fn build(
        case_id: Uuid,
        assignments: &[StepAssignment],
        now: DateTime<Utc>,
    ) -> CaseflowResult<Workflow> {
        let steps = Self::build_steps(assignments, now)?;
        Ok(Workflow {
            case_id,
            steps,
            created_at: now,
            updated_at: now,
        })
    }

    /// Validate and number `assignments` without wrapping them in a workflow
    pub fn build_steps(
        assignments: &[StepAssignment],
        now: DateTime<Utc>,
    ) -> CaseflowResult<Vec<WorkflowStep>> {
        Self::validate(assignments)?;

        let steps: Vec<WorkflowStep> = assignments
            .iter()
            .zip(1u32..)
            .map(|(assignment, step_number)| {
                let status = assignment.status.unwrap_or_default();
                WorkflowStep {
                    step_number,
                    department_id: assignment.department_id,
                    officer_id: assignment.officer_id,
                    status,
                    notes: assignment.notes.clone(),
                    completed_at: (status == StepState::Completed).then_some(now),
                }
            })
            .collect();

        debug!(step_count = steps.len(), "Built step sequence");
        Ok(steps)
    }

    fn validate(assignments: &[StepAssignment]) -> CaseflowResult<()> {
        if assignments.is_empty() {
            return Err(CaseflowError::validation(
                "Workflow requires at least one step",
            ));
        }
        if u32::try_from(assignments.len()).is_err() {
            return Err(CaseflowError::validation("Too many workflow steps"));
        }

        for (index, assignment) in assignments.iter().enumerate() {
            if assignment.department_id.is_nil() {
                return Err(CaseflowError::validation(format!(
                    "Step {} is missing a department",
                    index + 1
                )));
            }
            if assignment.officer_id.is_nil() {
                return Err(CaseflowError::validation(format!(
                    "Step {} is missing an officer",
                    index + 1
                )));
            }
        }

        let active = assignments
            .iter()
            .filter(|a| a.status == Some(StepState::InProgress))
            .count();
        if active > 1 {
            return Err(CaseflowError::validation(format!(
                "At most one step may be IN_PROGRESS, got {active}"
            )));
        }

        Ok(())
    }
}
