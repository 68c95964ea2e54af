//! # Case Initializer
//!
//! Atomic case creation: validation, numbering, workflow build, first-step
//! activation and a single store insert.
//!
//! ## Ordering
//!
//! 1. Title, description and step list are validated before anything else, so
//!    a rejected request never consumes a case number.
//! 2. The case number is drawn once. If the counter is unavailable creation
//!    stops there and nothing is stored.
//! 3. The workflow's first pending step is activated and the case pointer is
//!    synchronized with it.
//! 4. Case and workflow are inserted together; readers never see a case
//!    without its number or without its workflow.

use super::case_numbering::CaseNumberGenerator;
use super::status_synchronizer::StatusSynchronizer;
use super::step_sequence::StepSequenceBuilder;
use super::workflow_engine::WorkflowEngine;
use crate::error::{CaseflowError, CaseflowResult};
use crate::models::{Case, NewCase, Workflow};
use crate::store::CaseStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Result of case initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseInitializationResult {
    pub case: Case,
    pub workflow: Option<Workflow>,
    /// Step activated at creation, if the case has a workflow with a pending step
    pub activated_step: Option<u32>,
}

pub struct CaseInitializer {
    store: Arc<dyn CaseStore>,
    numbering: CaseNumberGenerator,
}

impl CaseInitializer {
    pub fn new(store: Arc<dyn CaseStore>, numbering: CaseNumberGenerator) -> Self {
        Self { store, numbering }
    }

    /// Create a case (and its workflow, if steps were given) for `initiator_id`
    #[instrument(skip_all, fields(initiator_id = %initiator_id))]
    pub async fn create_case(
        &self,
        initiator_id: Uuid,
        request: &NewCase,
    ) -> CaseflowResult<CaseInitializationResult> {
        Self::validate_request(request)?;

        let now = Utc::now();
        let case_id = Uuid::new_v4();

        let mut workflow = request
            .steps
            .as_deref()
            .map(|steps| StepSequenceBuilder::build(case_id, steps, now))
            .transpose()?;

        let case_number = self.numbering.next_case_number(now).await?;
        let mut case = Case::new(case_id, case_number, request, initiator_id, now);

        let activated_step = match workflow.as_mut() {
            Some(workflow) => {
                let already_active = workflow.active_step().is_some();
                let active = WorkflowEngine::ensure_active_step(workflow)?;
                StatusSynchronizer::sync_with_workflow(&mut case, workflow, now);
                if already_active {
                    None
                } else {
                    active
                }
            }
            None => None,
        };

        self.store.insert_case(&case, workflow.as_ref()).await?;

        info!(
            case_id = %case.case_id,
            case_number = %case.case_number,
            step_count = workflow.as_ref().map_or(0, Workflow::step_count),
            "Case created"
        );

        Ok(CaseInitializationResult {
            case,
            workflow,
            activated_step,
        })
    }

    fn validate_request(request: &NewCase) -> CaseflowResult<()> {
        if request.title.trim().is_empty() {
            return Err(CaseflowError::validation("Case title is required"));
        }
        if request.description.trim().is_empty() {
            return Err(CaseflowError::validation("Case description is required"));
        }
        debug!(
            has_steps = request.steps.is_some(),
            "Case creation request validated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumberingConfig;
    use crate::models::StepAssignment;
    use crate::state_machine::{CaseState, StepState};
    use crate::store::{InMemoryCaseStore, SequenceSource};

    fn initializer() -> (Arc<InMemoryCaseStore>, CaseInitializer) {
        let store = Arc::new(InMemoryCaseStore::new());
        let numbering = CaseNumberGenerator::new(store.clone(), &NumberingConfig::default());
        (store.clone(), CaseInitializer::new(store, numbering))
    }

    #[tokio::test]
    async fn test_creation_activates_first_step() {
        let (store, initializer) = initializer();
        let request = NewCase::new("Land transfer", "Parcel 12").with_steps(vec![
            StepAssignment::new(Uuid::new_v4(), Uuid::new_v4()),
            StepAssignment::new(Uuid::new_v4(), Uuid::new_v4()),
        ]);

        let result = initializer.create_case(Uuid::new_v4(), &request).await.unwrap();
        let workflow = result.workflow.unwrap();

        assert_eq!(result.activated_step, Some(1));
        assert_eq!(result.case.current_step, 1);
        assert_eq!(result.case.status, CaseState::Pending);
        assert_eq!(workflow.steps[0].status, StepState::InProgress);
        assert_eq!(workflow.steps[1].status, StepState::Pending);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_creation_without_steps_has_no_workflow() {
        let (store, initializer) = initializer();

        let result = initializer
            .create_case(Uuid::new_v4(), &NewCase::new("Title", "Description"))
            .await
            .unwrap();

        assert!(result.workflow.is_none());
        assert!(store
            .find_workflow(result.case.case_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rejected_request_consumes_no_number() {
        let (store, initializer) = initializer();

        let err = initializer
            .create_case(
                Uuid::new_v4(),
                &NewCase::new("Title", "Description").with_steps(Vec::new()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CaseflowError::ValidationError(_)));

        let err = initializer
            .create_case(Uuid::new_v4(), &NewCase::new("  ", "Description"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseflowError::ValidationError(_)));

        assert!(store.is_empty());
        assert_eq!(store.next_value().await.unwrap(), 1);
    }
}
