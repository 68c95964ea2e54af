//! # Case Model
//!
//! A tracked item ("file") routed through an ordered sequence of departmental
//! approval steps.
//!
//! ## Ownership
//!
//! The case lifecycle owns the record. Its `status` and `current_step` are
//! written only by the status synchronizer (and by the direct status write of
//! the combined update path); `documents` only grows through the document
//! ledger. The `case_number` is assigned once at creation and never changes.
//!
//! ## Database Schema
//!
//! Maps to `caseflow_cases`, with documents held as child rows in
//! `caseflow_case_documents` (see `migrations/`).

use super::document::DocumentEntry;
use super::workflow::{StepAssignment, Workflow};
use crate::constants::system::DEFAULT_PAGE_LIMIT;
use crate::state_machine::CaseState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A case routed through departmental approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: Uuid,
    /// Human-readable identifier, `<prefix>-<year>-<sequence>`
    pub case_number: String,
    pub title: String,
    pub description: String,
    pub status: CaseState,
    pub initiator_id: Uuid,
    /// Step number of the active step, or of the last step once the case completes
    pub current_step: u32,
    /// Document metadata in append order
    pub documents: Vec<DocumentEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Build a fresh case record. Status starts at PENDING and the pointer at 1.
    pub fn new(
        case_id: Uuid,
        case_number: String,
        new_case: &NewCase,
        initiator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            case_id,
            case_number,
            title: new_case.title.trim().to_string(),
            description: new_case.description.trim().to_string(),
            status: CaseState::default(),
            initiator_id,
            current_step: 1,
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request payload for creating a case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCase {
    pub title: String,
    pub description: String,
    /// Ordered approval steps. `None` creates the case without a workflow.
    #[serde(default)]
    pub steps: Option<Vec<StepAssignment>>,
}

impl NewCase {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            steps: None,
        }
    }

    pub fn with_steps(mut self, steps: Vec<StepAssignment>) -> Self {
        self.steps = Some(steps);
        self
    }
}

/// A case together with its workflow, as returned by detail reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDetails {
    pub case: Case,
    pub workflow: Option<Workflow>,
}

/// Filters and paging for case listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseQuery {
    pub status: Option<CaseState>,
    /// Cases whose workflow routes through this department
    pub department_id: Option<Uuid>,
    /// Case-insensitive substring of the case number or title
    pub search: Option<String>,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl Default for CaseQuery {
    fn default() -> Self {
        Self {
            status: None,
            department_id: None,
            search: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl CaseQuery {
    /// Page and limit clamped to at least 1
    pub fn normalized(&self) -> (u32, u32) {
        (self.page.max(1), self.limit.max(1))
    }

    pub fn offset(&self) -> u64 {
        let (page, limit) = self.normalized();
        u64::from(page - 1) * u64::from(limit)
    }

    /// Lowercased search needle, if any non-blank search was given
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// One page of cases, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasePage {
    pub cases: Vec<Case>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

impl CasePage {
    pub fn new(cases: Vec<Case>, total: u64, query: &CaseQuery) -> Self {
        let (page, limit) = query.normalized();
        Self {
            cases,
            total,
            page,
            total_pages: total.div_ceil(u64::from(limit)),
        }
    }
}
