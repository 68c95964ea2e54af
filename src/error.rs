//! Error types for the Caseflow core.
//!

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaseflowError {
    /// Case or workflow referenced by id does not exist
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },

    /// Empty or malformed input, rejected before any write
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Acting identity lacks the capability for the operation
    #[error("Actor {actor_id} is not permitted to {capability}")]
    Forbidden { actor_id: Uuid, capability: String },

    /// No IN_PROGRESS step owned by the acting officer; nothing was changed
    #[error("No active step assigned to officer {officer_id} on case {case_id}")]
    NoActiveStepMatch { case_id: Uuid, officer_id: Uuid },

    /// The case-number sequence could not be advanced
    #[error("Case numbering unavailable: {0}")]
    NumberingUnavailable(String),

    /// Optimistic commit kept losing to concurrent writers
    #[error("Case {case_id} was modified concurrently {attempts} times; giving up")]
    ConcurrentModification { case_id: Uuid, attempts: u32 },

    #[error("Duplicate case number: {0}")]
    DuplicateCaseNumber(String),

    #[error("State transition error: {0}")]
    StateTransitionError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl CaseflowError {
    pub fn case_not_found(case_id: Uuid) -> Self {
        Self::NotFound {
            resource: "Case".to_string(),
            id: case_id.to_string(),
        }
    }

    pub fn workflow_not_found(case_id: Uuid) -> Self {
        Self::NotFound {
            resource: "Workflow for case".to_string(),
            id: case_id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Whether the error means "nothing to do" rather than a failed request
    pub fn is_no_op(&self) -> bool {
        matches!(self, Self::NoActiveStepMatch { .. })
    }

    /// Short, stable label used for structured logs and metric attributes
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ValidationError(_) => "validation",
            Self::Forbidden { .. } => "forbidden",
            Self::NoActiveStepMatch { .. } => "no_active_step_match",
            Self::NumberingUnavailable(_) => "numbering_unavailable",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::DuplicateCaseNumber(_) => "duplicate_case_number",
            Self::StateTransitionError(_) => "state_transition",
            Self::DatabaseError(_) => "database",
            Self::ConfigurationError(_) => "configuration",
        }
    }
}

impl From<sqlx::Error> for CaseflowError {
    fn from(err: sqlx::Error) -> Self {
        CaseflowError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for CaseflowError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CaseflowError::DatabaseError(format!("Migration failed: {err}"))
    }
}

pub type CaseflowResult<T> = std::result::Result<T, CaseflowError>;
