//! Documentos eletrônicos do SIE: criação, tramitação e numeração.

mod dao;
mod document;
pub mod numbering;

pub use dao::{
    DOCUMENT_ACTIVE, DOCUMENT_SITUATION_TABLE, DOCUMENT_STATES, DOCUMENTS, DocumentDao, FLOWS,
    ROUTING_STEPS,
};
pub use document::{Document, DocumentOwner, INITIAL_STATUS, NewDocument};
pub use numbering::{DocumentTypeDao, ProcessMask, ProcessNumberDao, SubjectDao};
