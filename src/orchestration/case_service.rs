//! # Case Service
//!
//! Facade exposing every case operation to the transport layer. Each call
//! takes the acting identity, runs the capability check, does its work against
//! the [`CaseStore`] and reports through logging, metrics and lifecycle events.
//!
//! ## Atomicity
//!
//! Every workflow mutation goes through one loop: load the case unit, mutate
//! it in memory, commit conditionally on the version that was read. When the
//! commit loses to a concurrent writer, the unit is re-read and the mutation is
//! re-evaluated against the fresh state, up to `engine.max_commit_attempts`
//! times. Re-evaluation re-checks every guard, so a request that no longer
//! applies turns into its normal "nothing to do" answer instead of writing.
//!
//! Completion requests pin the step they matched on their first read. A
//! duplicate request that lost the race finds that step already COMPLETED and
//! reports `NoActiveStepMatch`; it never goes on to close the next step, even
//! when the same officer owns it.
//!
//! ## Usage
//!
//! ```rust
//! use caseflow_core::authorization::Actor;
//! use caseflow_core::config::CaseflowConfig;
//! use caseflow_core::models::{NewCase, StepAssignment};
//! use caseflow_core::orchestration::CaseService;
//! use uuid::Uuid;
//!
//! # async fn example() -> caseflow_core::error::CaseflowResult<()> {
//! let service = CaseService::in_memory(&CaseflowConfig::default());
//! let officer = Uuid::new_v4();
//!
//! let case = service
//!     .create_case(
//!         &Actor::officer(Uuid::new_v4()),
//!         NewCase::new("Land transfer", "Parcel 12")
//!             .with_steps(vec![StepAssignment::new(Uuid::new_v4(), officer)]),
//!     )
//!     .await?;
//!
//! let outcome = service
//!     .complete_active_step(&Actor::officer(officer), case.case_id, Some("approved".into()))
//!     .await?;
//! assert!(outcome.advancement.finished_workflow());
//! # Ok(())
//! # }
//! ```

use super::case_initializer::CaseInitializer;
use super::case_numbering::CaseNumberGenerator;
use super::document_ledger::DocumentLedger;
use super::status_synchronizer::StatusSynchronizer;
use super::step_sequence::StepSequenceBuilder;
use super::workflow_engine::{Advancement, NextStep, WorkflowEngine};
use crate::authorization::{Actor, AuthorizationGate, Capability, RoleAuthorizationGate};
use crate::config::{CaseflowConfig, EngineConfig};
use crate::constants::events;
use crate::error::{CaseflowError, CaseflowResult};
use crate::events::EventPublisher;
use crate::logging::{log_case_operation, log_error, log_step_operation};
use crate::metrics;
use crate::models::{
    Case, CaseDetails, CasePage, CaseQuery, NewCase, NewDocument, StepAssignment, Workflow,
    WorkflowStep,
};
use crate::state_machine::CaseState;
use crate::store::{CaseStore, CaseUnit, InMemoryCaseStore, SequenceSource};
use chrono::Utc;
use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Result of a successful step completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub case: Case,
    pub workflow: Workflow,
    pub advancement: Advancement,
}

/// Combined "update status / complete my step" request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    /// Direct status write, applied before the engine runs
    #[serde(default)]
    pub status: Option<CaseState>,
    /// Notes recorded on the completed step
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of the combined update path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Case state after both the direct write and the engine ran
    pub case: Case,
    /// `None` when the acting officer had no active step to complete
    pub completion: Option<CompletionOutcome>,
}

pub struct CaseService {
    store: Arc<dyn CaseStore>,
    initializer: CaseInitializer,
    gate: Arc<dyn AuthorizationGate>,
    publisher: EventPublisher,
    engine: EngineConfig,
}

impl CaseService {
    /// Build a service over `store`, drawing case numbers from `sequence`
    pub fn new(
        store: Arc<dyn CaseStore>,
        sequence: Arc<dyn SequenceSource>,
        config: &CaseflowConfig,
    ) -> Self {
        let numbering = CaseNumberGenerator::new(sequence, &config.numbering);
        Self {
            initializer: CaseInitializer::new(store.clone(), numbering),
            store,
            gate: Arc::new(RoleAuthorizationGate),
            publisher: EventPublisher::new(config.events.channel_capacity),
            engine: config.engine.clone(),
        }
    }

    /// Service backed by a fresh [`InMemoryCaseStore`]
    pub fn in_memory(config: &CaseflowConfig) -> Self {
        let store = Arc::new(InMemoryCaseStore::new());
        Self::new(store.clone(), store, config)
    }

    /// Replace the default role-based gate
    pub fn with_authorization_gate(mut self, gate: Arc<dyn AuthorizationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_event_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Create a case, number it and, if steps were given, build its workflow
    /// with step 1 active.
    #[instrument(skip_all, fields(actor_id = %actor.id))]
    pub async fn create_case(&self, actor: &Actor, request: NewCase) -> CaseflowResult<Case> {
        self.gate.authorize(actor, Capability::CreateCase)?;

        let result = match self.initializer.create_case(actor.id, &request).await {
            Ok(result) => result,
            Err(err) => {
                log_error("case_service", "create_case", &err.to_string(), Some(err.kind()));
                return Err(err);
            }
        };
        let case = result.case;

        metrics::cases_created_total().add(1, &[]);
        log_case_operation(
            "create_case",
            case.case_id,
            Some(&case.case_number),
            case.status.as_str(),
            None,
        );
        self.publisher.publish(
            events::CASE_CREATED,
            case.case_id,
            json!({
                "case_number": case.case_number,
                "initiator_id": case.initiator_id,
                "step_count": result.workflow.as_ref().map_or(0, Workflow::step_count),
            }),
        );

        if let (Some(step_number), Some(workflow)) = (result.activated_step, &result.workflow) {
            let officer_id = workflow.step(step_number).map(|step| step.officer_id);
            log_step_operation("activate_step", case.case_id, step_number, officer_id, "IN_PROGRESS");
            self.publisher.publish(
                events::STEP_ACTIVATED,
                case.case_id,
                json!({ "step_number": step_number, "officer_id": officer_id }),
            );
        }

        Ok(case)
    }

    /// Read a case together with its workflow from one consistent snapshot
    pub async fn get_case(&self, actor: &Actor, case_id: Uuid) -> CaseflowResult<CaseDetails> {
        self.gate.authorize(actor, Capability::ReadCase)?;

        let unit = self
            .store
            .load_unit(case_id)
            .await?
            .ok_or_else(|| CaseflowError::case_not_found(case_id))?;

        Ok(CaseDetails {
            case: unit.case,
            workflow: unit.workflow,
        })
    }

    /// Filtered, paginated listing, newest first
    pub async fn list_cases(&self, actor: &Actor, query: CaseQuery) -> CaseflowResult<CasePage> {
        self.gate.authorize(actor, Capability::ReadCase)?;

        let page = self.store.list_cases(&query).await?;
        debug!(
            total = page.total,
            page = page.page,
            returned = page.cases.len(),
            "Listed cases"
        );
        Ok(page)
    }

    /// The step currently IN_PROGRESS, if any. Fails with `NotFound` when the
    /// case has no workflow.
    pub async fn current_step(
        &self,
        actor: &Actor,
        case_id: Uuid,
    ) -> CaseflowResult<Option<WorkflowStep>> {
        self.gate.authorize(actor, Capability::ReadCase)?;

        let workflow = self
            .store
            .find_workflow(case_id)
            .await?
            .ok_or_else(|| CaseflowError::workflow_not_found(case_id))?;
        Ok(workflow.active_step().cloned())
    }

    /// Close the acting officer's active step and advance the workflow.
    ///
    /// Returns `NoActiveStepMatch` and leaves everything untouched when the
    /// officer owns no IN_PROGRESS step on this case.
    #[instrument(skip_all, fields(actor_id = %actor.id, case_id = %case_id))]
    pub async fn complete_active_step(
        &self,
        actor: &Actor,
        case_id: Uuid,
        notes: Option<String>,
    ) -> CaseflowResult<CompletionOutcome> {
        self.gate.authorize(actor, Capability::CompleteStep)?;
        self.run_completion(actor.id, case_id, notes).await
    }

    /// Combined update path: apply the direct status write (if any), then let
    /// the engine complete the actor's active step. When the engine finishes
    /// the workflow its COMPLETED status supersedes the direct value.
    #[instrument(skip_all, fields(actor_id = %actor.id, case_id = %case_id))]
    pub async fn update_case_status(
        &self,
        actor: &Actor,
        case_id: Uuid,
        request: StatusUpdateRequest,
    ) -> CaseflowResult<StatusUpdate> {
        self.gate.authorize(actor, Capability::UpdateCaseStatus)?;

        let mut case = None;
        if let Some(status) = request.status {
            let updated = self
                .mutate_unit(case_id, |unit| {
                    StatusSynchronizer::set_status(&mut unit.case, status, Utc::now());
                    // status-only commit; leave the stored workflow alone
                    unit.workflow = None;
                    Ok(unit.case.clone())
                })
                .await?;

            log_case_operation(
                "set_case_status",
                case_id,
                Some(&updated.case_number),
                status.as_str(),
                None,
            );
            self.publisher.publish(
                events::CASE_STATUS_CHANGED,
                case_id,
                json!({ "status": status, "source": "direct" }),
            );
            case = Some(updated);
        }

        match self.run_completion(actor.id, case_id, request.notes).await {
            Ok(outcome) => Ok(StatusUpdate {
                case: outcome.case.clone(),
                completion: Some(outcome),
            }),
            Err(err) if err.is_no_op() => {
                let case = match case {
                    Some(case) => case,
                    None => self
                        .store
                        .find_case(case_id)
                        .await?
                        .ok_or_else(|| CaseflowError::case_not_found(case_id))?,
                };
                Ok(StatusUpdate {
                    case,
                    completion: None,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Append one document's metadata to the case
    #[instrument(skip_all, fields(actor_id = %actor.id, case_id = %case_id))]
    pub async fn attach_document(
        &self,
        actor: &Actor,
        case_id: Uuid,
        document: NewDocument,
    ) -> CaseflowResult<Case> {
        self.gate.authorize(actor, Capability::AttachDocument)?;

        let entry = DocumentLedger::entry(actor.id, &document, Utc::now())?;
        if !self.store.append_document(case_id, &entry).await? {
            return Err(CaseflowError::case_not_found(case_id));
        }

        let case = self
            .store
            .find_case(case_id)
            .await?
            .ok_or_else(|| CaseflowError::case_not_found(case_id))?;

        log_case_operation(
            "attach_document",
            case_id,
            Some(&case.case_number),
            case.status.as_str(),
            Some(&entry.document_type),
        );
        self.publisher.publish(
            events::DOCUMENT_ATTACHED,
            case_id,
            json!({
                "document_id": entry.document_id,
                "document_type": entry.document_type,
                "uploaded_by": entry.uploaded_by,
            }),
        );
        Ok(case)
    }

    /// Admin-only: discard the workflow's steps and rebuild them from
    /// `steps`. Progress on the old steps is lost.
    #[instrument(skip_all, fields(actor_id = %actor.id, case_id = %case_id))]
    pub async fn replace_steps(
        &self,
        actor: &Actor,
        case_id: Uuid,
        steps: Vec<StepAssignment>,
    ) -> CaseflowResult<Workflow> {
        self.gate.authorize(actor, Capability::RedefineWorkflow)?;

        let new_steps = StepSequenceBuilder::build_steps(&steps, Utc::now())?;

        let workflow = self
            .mutate_unit(case_id, |unit| {
                let now = Utc::now();
                let workflow = unit
                    .workflow
                    .as_mut()
                    .ok_or_else(|| CaseflowError::workflow_not_found(case_id))?;
                workflow.steps = new_steps.clone();
                workflow.updated_at = now;
                StatusSynchronizer::sync_with_workflow(&mut unit.case, workflow, now);
                Ok(workflow.clone())
            })
            .await?;

        info!(
            case_id = %case_id,
            step_count = workflow.step_count(),
            "Workflow redefined"
        );
        self.publisher.publish(
            events::WORKFLOW_REDEFINED,
            case_id,
            json!({ "step_count": workflow.step_count(), "redefined_by": actor.id }),
        );
        Ok(workflow)
    }

    async fn run_completion(
        &self,
        officer_id: Uuid,
        case_id: Uuid,
        notes: Option<String>,
    ) -> CaseflowResult<CompletionOutcome> {
        let no_match = CaseflowError::NoActiveStepMatch {
            case_id,
            officer_id,
        };
        let mut pinned: Option<u32> = None;

        let result = self
            .mutate_unit(case_id, |unit| {
                let now = Utc::now();
                let workflow = unit.workflow.as_mut().ok_or_else(|| no_match.clone())?;

                let step_number = match pinned {
                    Some(step_number) => step_number,
                    None => {
                        let step_number = WorkflowEngine::locate_active_step(workflow, officer_id)
                            .ok_or_else(|| no_match.clone())?;
                        pinned = Some(step_number);
                        step_number
                    }
                };

                let advancement = WorkflowEngine::complete_step(
                    workflow,
                    step_number,
                    officer_id,
                    notes.clone(),
                    now,
                )?;
                StatusSynchronizer::apply(&mut unit.case, &advancement, now);

                Ok(CompletionOutcome {
                    case: unit.case.clone(),
                    workflow: workflow.clone(),
                    advancement,
                })
            })
            .await;

        match &result {
            Ok(outcome) => self.report_completion(outcome, officer_id),
            Err(err) if err.is_no_op() => {
                metrics::no_active_step_matches_total().add(1, &[]);
                debug!(case_id = %case_id, officer_id = %officer_id, "No active step to complete");
            }
            Err(err) => {
                log_error("case_service", "complete_step", &err.to_string(), Some(err.kind()));
            }
        }
        result
    }

    fn report_completion(&self, outcome: &CompletionOutcome, officer_id: Uuid) {
        let case_id = outcome.case.case_id;
        let advancement = outcome.advancement;
        let label = if advancement.finished_workflow() {
            "case_completed"
        } else {
            "advanced"
        };

        metrics::step_completions_total().add(1, &[KeyValue::new("outcome", label)]);
        log_step_operation(
            "complete_step",
            case_id,
            advancement.completed_step,
            Some(officer_id),
            "COMPLETED",
        );
        self.publisher.publish(
            events::STEP_COMPLETED,
            case_id,
            json!({ "step_number": advancement.completed_step, "officer_id": officer_id }),
        );

        match advancement.next {
            NextStep::Activated(step_number) => {
                let next_officer = outcome.workflow.step(step_number).map(|step| step.officer_id);
                log_step_operation("activate_step", case_id, step_number, next_officer, "IN_PROGRESS");
                self.publisher.publish(
                    events::STEP_ACTIVATED,
                    case_id,
                    json!({ "step_number": step_number, "officer_id": next_officer }),
                );
            }
            NextStep::WorkflowFinished => {
                metrics::cases_completed_total().add(1, &[]);
                log_case_operation(
                    "complete_case",
                    case_id,
                    Some(&outcome.case.case_number),
                    CaseState::Completed.as_str(),
                    None,
                );
                self.publisher.publish(
                    events::CASE_COMPLETED,
                    case_id,
                    json!({ "case_number": outcome.case.case_number, "current_step": outcome.case.current_step }),
                );
            }
        }
    }

    /// Load, mutate and conditionally commit one case unit, re-evaluating
    /// `mutate` against fresh state whenever the commit loses a version race.
    /// An error from `mutate` aborts without writing.
    async fn mutate_unit<T, F>(&self, case_id: Uuid, mut mutate: F) -> CaseflowResult<T>
    where
        F: FnMut(&mut CaseUnit) -> CaseflowResult<T> + Send,
        T: Send,
    {
        let attempts = self.engine.max_commit_attempts;

        for attempt in 1..=attempts {
            let mut unit = self
                .store
                .load_unit(case_id)
                .await?
                .ok_or_else(|| CaseflowError::case_not_found(case_id))?;

            let outcome = mutate(&mut unit)?;

            if self.store.commit_unit(&unit).await? {
                return Ok(outcome);
            }

            metrics::commit_conflicts_total().add(1, &[]);
            debug!(
                case_id = %case_id,
                attempt = attempt,
                "Case changed during update; re-evaluating"
            );
        }

        Err(CaseflowError::ConcurrentModification { case_id, attempts })
    }
}
