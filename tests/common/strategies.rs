use caseflow_core::{StepAssignment, StepState};
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for generating non-nil UUIDs
pub fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>()
        .prop_filter("nil uuid", |bits| *bits != 0)
        .prop_map(Uuid::from_u128)
}

/// Strategy for caller-supplied step numbers, which the builder ignores
pub fn claimed_step_number_strategy() -> impl Strategy<Value = Option<u32>> {
    prop::option::of(0u32..1000)
}

/// Strategy for step statuses a caller may legitimately submit
pub fn submitted_status_strategy() -> impl Strategy<Value = Option<StepState>> {
    prop_oneof![
        Just(None),
        Just(Some(StepState::Pending)),
        Just(Some(StepState::Completed)),
        Just(Some(StepState::Skipped)),
    ]
}

/// Strategy for one caller-supplied step assignment
pub fn step_assignment_strategy() -> impl Strategy<Value = StepAssignment> {
    (
        uuid_strategy(),
        uuid_strategy(),
        claimed_step_number_strategy(),
        submitted_status_strategy(),
    )
        .prop_map(|(department_id, officer_id, step_number, status)| StepAssignment {
            department_id,
            officer_id,
            step_number,
            status,
            notes: None,
        })
}

/// Strategy for non-empty assignment lists
pub fn assignment_list_strategy(max_len: usize) -> impl Strategy<Value = Vec<StepAssignment>> {
    prop::collection::vec(step_assignment_strategy(), 1..=max_len)
}

/// Strategy for a route of officers, possibly repeating the same officer
pub fn officer_route_strategy(max_len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..3, 1..=max_len)
}
