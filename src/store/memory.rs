//! # In-Memory Case Store
//!
//! Thread-safe store for tests, development and embedded use.
//!
//! ## Features
//!
//! - **Per-case isolation**: records live in a sharded `DashMap`, so writers on
//!   different cases do not block each other
//! - **Version-checked commits**: the compare and the write happen under the
//!   record's shard lock
//! - **Atomic numbering**: the case-number counter is an `AtomicU64`

use super::{CaseStore, CaseUnit, SequenceSource};
use crate::error::{CaseflowError, CaseflowResult};
use crate::models::{Case, CasePage, CaseQuery, DocumentEntry, Workflow};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct CaseRecord {
    case: Case,
    workflow: Option<Workflow>,
    version: i64,
}

/// In-memory `CaseStore` and `SequenceSource`
#[derive(Debug, Default)]
pub struct InMemoryCaseStore {
    records: DashMap<Uuid, CaseRecord>,
    /// case_number -> case_id
    case_numbers: RwLock<HashMap<String, Uuid>>,
    sequence: AtomicU64,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cases
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SequenceSource for InMemoryCaseStore {
    async fn next_value(&self) -> CaseflowResult<u64> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn insert_case(&self, case: &Case, workflow: Option<&Workflow>) -> CaseflowResult<()> {
        {
            let mut numbers = self.case_numbers.write();
            if numbers.contains_key(&case.case_number) {
                return Err(CaseflowError::DuplicateCaseNumber(case.case_number.clone()));
            }
            numbers.insert(case.case_number.clone(), case.case_id);
        }

        self.records.insert(
            case.case_id,
            CaseRecord {
                case: case.clone(),
                workflow: workflow.cloned(),
                version: 0,
            },
        );
        debug!(case_id = %case.case_id, case_number = %case.case_number, "Inserted case");
        Ok(())
    }

    async fn find_case(&self, case_id: Uuid) -> CaseflowResult<Option<Case>> {
        Ok(self.records.get(&case_id).map(|record| record.case.clone()))
    }

    async fn find_workflow(&self, case_id: Uuid) -> CaseflowResult<Option<Workflow>> {
        Ok(self
            .records
            .get(&case_id)
            .and_then(|record| record.workflow.clone()))
    }

    async fn load_unit(&self, case_id: Uuid) -> CaseflowResult<Option<CaseUnit>> {
        Ok(self.records.get(&case_id).map(|record| CaseUnit {
            case: record.case.clone(),
            workflow: record.workflow.clone(),
            version: record.version,
        }))
    }

    async fn commit_unit(&self, unit: &CaseUnit) -> CaseflowResult<bool> {
        let case_id = unit.case.case_id;
        let mut record = self
            .records
            .get_mut(&case_id)
            .ok_or_else(|| CaseflowError::case_not_found(case_id))?;

        if record.version != unit.version {
            debug!(
                case_id = %case_id,
                expected = unit.version,
                actual = record.version,
                "Rejected stale case unit"
            );
            return Ok(false);
        }

        record.case.status = unit.case.status;
        record.case.current_step = unit.case.current_step;
        record.case.updated_at = unit.case.updated_at;
        if let Some(workflow) = &unit.workflow {
            record.workflow = Some(workflow.clone());
        }
        record.version += 1;
        Ok(true)
    }

    async fn append_document(&self, case_id: Uuid, entry: &DocumentEntry) -> CaseflowResult<bool> {
        match self.records.get_mut(&case_id) {
            Some(mut record) => {
                record.case.documents.push(entry.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_cases(&self, query: &CaseQuery) -> CaseflowResult<CasePage> {
        let needle = query.needle();
        let mut matching: Vec<Case> = self
            .records
            .iter()
            .filter(|record| query.status.map_or(true, |s| record.case.status == s))
            .filter(|record| {
                query.department_id.map_or(true, |department_id| {
                    record
                        .workflow
                        .as_ref()
                        .is_some_and(|w| w.involves_department(department_id))
                })
            })
            .filter(|record| {
                needle.as_deref().map_or(true, |needle| {
                    record.case.case_number.to_lowercase().contains(needle)
                        || record.case.title.to_lowercase().contains(needle)
                })
            })
            .map(|record| record.case.clone())
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.case_number.cmp(&a.case_number))
        });

        let total = matching.len() as u64;
        let (_, limit) = query.normalized();
        let cases = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(limit as usize)
            .collect();

        Ok(CasePage::new(cases, total, query))
    }
}
