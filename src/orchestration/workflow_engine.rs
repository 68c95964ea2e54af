//! # Workflow Engine
//!
//! Step activation, completion and advancement for a single workflow. The
//! engine is the only component that moves steps between states, and the only
//! one that enforces the single-active-step invariant.
//!
//! The engine works on an in-memory [`Workflow`] read as part of a case unit.
//! It never persists anything: the case service commits the mutated unit
//! conditionally, so a transition computed from a stale read is thrown away
//! and re-evaluated rather than applied twice.
//!
//! ## Advancement
//!
//! After a step is completed the engine scans the list in order and activates
//! the first step still PENDING. When none is left the workflow is finished and
//! the caller is told so through [`NextStep::WorkflowFinished`].

use crate::error::{CaseflowError, CaseflowResult};
use crate::models::Workflow;
use crate::state_machine::StepStateMachine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// What happened after the active step was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextStep {
    /// This step number became the active step
    Activated(u32),
    /// No pending step remained
    WorkflowFinished,
}

/// Result of one successful completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advancement {
    pub completed_step: u32,
    pub next: NextStep,
}

impl Advancement {
    pub fn finished_workflow(&self) -> bool {
        self.next == NextStep::WorkflowFinished
    }
}

pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Step number of the active step assigned to `officer_id`, if any
    pub fn locate_active_step(workflow: &Workflow, officer_id: Uuid) -> Option<u32> {
        workflow
            .active_step_for(officer_id)
            .map(|step| step.step_number)
    }

    /// Activate the first PENDING step, returning its number. Returns `None`
    /// when nothing is pending. Refuses to activate while another step is
    /// already IN_PROGRESS.
    pub fn activate_first_pending(workflow: &mut Workflow) -> CaseflowResult<Option<u32>> {
        if let Some(active) = workflow.active_step() {
            return Err(CaseflowError::StateTransitionError(format!(
                "Step {} is already active",
                active.step_number
            )));
        }

        let Some(step_number) = workflow.first_pending_step().map(|step| step.step_number) else {
            return Ok(None);
        };
        let case_id = workflow.case_id;
        let Some(step) = workflow.step_mut(step_number) else {
            return Ok(None);
        };

        StepStateMachine::activate(step)?;
        debug!(
            case_id = %case_id,
            step_number = step.step_number,
            "Activated step"
        );
        Ok(Some(step.step_number))
    }

    /// Make sure an active step exists if one can: keep the current active
    /// step, otherwise activate the first pending one.
    pub fn ensure_active_step(workflow: &mut Workflow) -> CaseflowResult<Option<u32>> {
        match workflow.active_step() {
            Some(active) => Ok(Some(active.step_number)),
            None => Self::activate_first_pending(workflow),
        }
    }

    /// Close step `step_number` on behalf of `officer_id` and advance.
    ///
    /// The transition happens only if that step is still IN_PROGRESS and still
    /// assigned to the officer; otherwise nothing changes and
    /// `NoActiveStepMatch` is returned.
    pub fn complete_step(
        workflow: &mut Workflow,
        step_number: u32,
        officer_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CaseflowResult<Advancement> {
        let case_id = workflow.case_id;
        let step = workflow
            .step_mut(step_number)
            .filter(|step| step.status.is_active() && step.officer_id == officer_id)
            .ok_or(CaseflowError::NoActiveStepMatch {
                case_id,
                officer_id,
            })?;

        StepStateMachine::complete(step, officer_id, notes, now)?;

        let next = match Self::activate_first_pending(workflow)? {
            Some(activated) => NextStep::Activated(activated),
            None => NextStep::WorkflowFinished,
        };
        workflow.updated_at = now;

        debug!(
            case_id = %case_id,
            completed_step = step_number,
            next = ?next,
            "Advanced workflow"
        );
        Ok(Advancement {
            completed_step: step_number,
            next,
        })
    }
}
