//! Document metadata attached to a case. The blob itself lives in external
//! storage; only the handle and descriptive fields are kept here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub document_id: Uuid,
    /// URL or storage handle of the uploaded document
    pub document_url: String,
    pub uploaded_by: Uuid,
    /// MIME type or caller-defined document kind
    pub document_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Metadata supplied when attaching a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub document_url: String,
    pub document_type: String,
}

impl NewDocument {
    pub fn new(document_url: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            document_url: document_url.into(),
            document_type: document_type.into(),
        }
    }
}
