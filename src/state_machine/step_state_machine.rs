use super::{
    errors::{guard_failed, StateMachineError, StateMachineResult},
    events::StepEvent,
    states::StepState,
};
use crate::models::WorkflowStep;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Legal transitions for a single workflow step.
///
/// The machine works on an in-memory step; callers own persistence and are
/// expected to apply it inside a unit of work that commits conditionally.
pub struct StepStateMachine;

impl StepStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: StepState,
        event: &StepEvent,
    ) -> StateMachineResult<StepState> {
        let target = match (current_state, event) {
            (StepState::Pending, StepEvent::Activate) => StepState::InProgress,
            (StepState::InProgress, StepEvent::Complete(_)) => StepState::Completed,
            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    /// Activate a pending step
    pub fn activate(step: &mut WorkflowStep) -> StateMachineResult<StepState> {
        let target = Self::determine_target_state(step.status, &StepEvent::Activate)?;
        step.status = target;
        Ok(target)
    }

    /// Close the active step on behalf of its assigned officer, recording notes
    /// and the completion timestamp.
    pub fn complete(
        step: &mut WorkflowStep,
        officer_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> StateMachineResult<StepState> {
        if step.officer_id != officer_id {
            return Err(guard_failed(format!(
                "Step {} is assigned to officer {}, not {}",
                step.step_number, step.officer_id, officer_id
            )));
        }

        let event = StepEvent::complete_with_notes(notes);
        let target = Self::determine_target_state(step.status, &event)?;
        step.status = target;
        step.notes = event.notes().map(str::to_string);
        step.completed_at = Some(now);
        Ok(target)
    }
}
