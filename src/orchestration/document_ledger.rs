//! Document Ledger: builds the append-only metadata entries attached to a
//! case. Entries are never edited once stored.

use crate::error::{CaseflowError, CaseflowResult};
use crate::models::{DocumentEntry, NewDocument};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct DocumentLedger;

impl DocumentLedger {
    /// Validate the metadata and stamp it with an id, uploader and time
    pub fn entry(
        uploaded_by: Uuid,
        document: &NewDocument,
        now: DateTime<Utc>,
    ) -> CaseflowResult<DocumentEntry> {
        let document_url = document.document_url.trim();
        if document_url.is_empty() {
            return Err(CaseflowError::validation("Document URL is required"));
        }
        let document_type = document.document_type.trim();
        if document_type.is_empty() {
            return Err(CaseflowError::validation("Document type is required"));
        }

        Ok(DocumentEntry {
            document_id: Uuid::new_v4(),
            document_url: document_url.to_string(),
            uploaded_by,
            document_type: document_type.to_string(),
            uploaded_at: now,
        })
    }
}
