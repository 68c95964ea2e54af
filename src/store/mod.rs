//! # Case Store
//!
//! Persistence seam for cases, workflows and documents. The workflow logic
//! never talks to a database directly; it loads a [`CaseUnit`], mutates it in
//! memory and hands it back through [`CaseStore::commit_unit`], which succeeds
//! only if nobody else committed in between.
//!
//! ## Consistency Model
//!
//! - Each `(Case, Workflow)` pair is its own unit of consistency, guarded by a
//!   monotonically increasing `version`. Different cases never contend.
//! - Document appends are not covered by the version: the ledger is
//!   append-only and never conflicts with step transitions.
//! - Case numbers come from a [`SequenceSource`] that hands out values with a
//!   single atomic fetch-and-add.

pub mod memory;
pub mod postgres;

use crate::error::CaseflowResult;
use crate::models::{Case, CasePage, CaseQuery, DocumentEntry, Workflow};
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::InMemoryCaseStore;
pub use postgres::PgCaseStore;

/// A case and its workflow as read at one version
#[derive(Debug, Clone, PartialEq)]
pub struct CaseUnit {
    pub case: Case,
    pub workflow: Option<Workflow>,
    /// Version the unit was read at; commits are conditional on it
    pub version: i64,
}

/// Source of the shared case-number counter
#[async_trait]
pub trait SequenceSource: Send + Sync {
    /// Atomically advance the counter and return the new value (first value is 1)
    async fn next_value(&self) -> CaseflowResult<u64>;
}

/// Storage for cases and their workflows
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Insert a new case and, if given, its workflow in one atomic write.
    /// Fails with `DuplicateCaseNumber` when the case number is taken.
    async fn insert_case(&self, case: &Case, workflow: Option<&Workflow>) -> CaseflowResult<()>;

    async fn find_case(&self, case_id: Uuid) -> CaseflowResult<Option<Case>>;

    async fn find_workflow(&self, case_id: Uuid) -> CaseflowResult<Option<Workflow>>;

    /// Read the case, its workflow and the current version together
    async fn load_unit(&self, case_id: Uuid) -> CaseflowResult<Option<CaseUnit>>;

    /// Write the unit's case status, step pointer and workflow steps if the
    /// stored version still equals `unit.version`, bumping it by one.
    /// Returns `false` without writing anything when the version moved on.
    /// Documents on `unit.case` are ignored.
    async fn commit_unit(&self, unit: &CaseUnit) -> CaseflowResult<bool>;

    /// Append one document entry. Returns `false` if the case does not exist.
    async fn append_document(&self, case_id: Uuid, entry: &DocumentEntry) -> CaseflowResult<bool>;

    /// Filtered, paginated listing, newest first
    async fn list_cases(&self, query: &CaseQuery) -> CaseflowResult<CasePage>;
}
