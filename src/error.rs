use thiserror::Error;

use crate::api::ApiError;
use crate::routing::RoutingError;

#[derive(Debug, Error)]
pub enum SieError {
    #[error("SIE API error: {0}")]
    Api(#[from] ApiError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Document not found: {0}")]
    DocumentNotFound(i64),

    #[error("Document {0} is already archived")]
    AlreadyArchived(i64),

    #[error("No active flow from status {from_status} to {to_status} for document {document_id}")]
    NoFlow {
        document_id: i64,
        from_status: i64,
        to_status: i64,
    },

    #[error("Document type {doc_type} has no initial flow")]
    NoInitialFlow { doc_type: i64 },

    #[error("Document type {doc_type} has {count} initial flows; pick one explicitly")]
    AmbiguousInitialFlow { doc_type: i64, count: usize },

    #[error("Unsupported process number mask: {0:?}")]
    UnsupportedMask(String),

    #[error("Document type {0} delegates numbering in a cycle")]
    NumberingCycle(i64),

    #[error("No process number counter for document type {doc_type} in {year}")]
    NoProcessCounter { doc_type: i64, year: i32 },

    #[error("Subject {subject_id} has an out-of-range archive time of {days} days")]
    ArchiveDeadlineOutOfRange { subject_id: i64, days: i64 },

    #[error("Project {project_id} already has a report for {year} that is no longer with the professor")]
    ReportAlreadySubmitted { project_id: i64, year: i32 },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

impl SieError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        SieError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// True when the failure is the remote API reporting an empty result.
    pub fn is_no_content(&self) -> bool {
        matches!(self, SieError::Api(e) if e.is_no_content())
    }
}

pub type Result<T> = std::result::Result<T, SieError>;
