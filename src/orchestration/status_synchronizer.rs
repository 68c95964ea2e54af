//! # Case Status Synchronizer
//!
//! Writes the workflow engine's output back onto the case: the current-step
//! pointer follows the active step, and the case becomes COMPLETED once the
//! workflow is finished. A finished workflow leaves the pointer on its last
//! step.

use super::workflow_engine::{Advancement, NextStep};
use crate::models::{Case, Workflow};
use crate::state_machine::CaseState;
use chrono::{DateTime, Utc};
use tracing::debug;

pub struct StatusSynchronizer;

impl StatusSynchronizer {
    /// Apply one advancement to the case
    pub fn apply(case: &mut Case, advancement: &Advancement, now: DateTime<Utc>) {
        match advancement.next {
            NextStep::Activated(step_number) => {
                case.current_step = step_number;
            }
            NextStep::WorkflowFinished => {
                case.status = CaseState::Completed;
            }
        }
        case.updated_at = now;

        debug!(
            case_id = %case.case_id,
            status = %case.status,
            current_step = case.current_step,
            "Synchronized case with advancement"
        );
    }

    /// Re-derive the pointer (and completion) from a whole workflow, used after
    /// creation and redefinition. Returns whether the case changed.
    pub fn sync_with_workflow(case: &mut Case, workflow: &Workflow, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        if let Some(active) = workflow.active_step() {
            if case.current_step != active.step_number {
                case.current_step = active.step_number;
                changed = true;
            }
        } else if let Some(last) = workflow.steps.last().filter(|_| workflow.is_finished()) {
            if case.status != CaseState::Completed {
                case.status = CaseState::Completed;
                changed = true;
            }
            if case.current_step != last.step_number {
                case.current_step = last.step_number;
                changed = true;
            }
        }

        if changed {
            case.updated_at = now;
        }
        changed
    }

    /// Direct status write, independent of the workflow
    pub fn set_status(case: &mut Case, status: CaseState, now: DateTime<Utc>) {
        case.status = status;
        case.updated_at = now;
    }
}
