// State machine module for case routing
//
// Case and step status vocabularies plus the legal step transitions that the
// workflow engine drives.

pub mod errors;
pub mod events;
pub mod states;
pub mod step_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::StepEvent;
pub use states::{CaseState, StepState};
pub use step_state_machine::StepStateMachine;
