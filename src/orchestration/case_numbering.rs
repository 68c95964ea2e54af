//! # Case Numbering Generator
//!
//! Produces `<prefix>-<year>-<sequence>` case numbers from a shared,
//! atomically advanced counter. The sequence is global; it does not reset at
//! the turn of the year.

use crate::config::NumberingConfig;
use crate::error::{CaseflowError, CaseflowResult};
use crate::store::SequenceSource;
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Format a case number, zero-padding the sequence to at least `width` digits
pub fn format_case_number(prefix: &str, year: i32, sequence: u64, width: usize) -> String {
    format!("{prefix}-{year}-{sequence:0width$}")
}

#[derive(Clone)]
pub struct CaseNumberGenerator {
    sequence: Arc<dyn SequenceSource>,
    prefix: String,
    width: usize,
}

impl std::fmt::Debug for CaseNumberGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseNumberGenerator")
            .field("prefix", &self.prefix)
            .field("width", &self.width)
            .finish()
    }
}

impl CaseNumberGenerator {
    pub fn new(sequence: Arc<dyn SequenceSource>, config: &NumberingConfig) -> Self {
        Self {
            sequence,
            prefix: config.prefix.clone(),
            width: config.sequence_width,
        }
    }

    /// Consume one sequence value and format the number for a case created at
    /// `created_at`. A counter failure surfaces as `NumberingUnavailable`.
    pub async fn next_case_number(&self, created_at: DateTime<Utc>) -> CaseflowResult<String> {
        let sequence = self.sequence.next_value().await.map_err(|err| {
            warn!(error = %err, "Case number sequence unavailable");
            CaseflowError::NumberingUnavailable(err.to_string())
        })?;

        let case_number =
            format_case_number(&self.prefix, created_at.year(), sequence, self.width);
        debug!(case_number = %case_number, sequence = sequence, "Assigned case number");
        Ok(case_number)
    }
}
