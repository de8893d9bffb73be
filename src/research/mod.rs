//! DAOs de pesquisa usados pelas caixas postais e pelos cadastros.

pub mod candidates;
pub mod evaluations;
pub mod files;
pub mod projects;
pub mod staff;

pub use candidates::{Candidate, CandidateDao, CandidateUpdate};
pub use evaluations::{Evaluation, EvaluationDao, EvaluationUpdate, NewEvaluation, ReportPeriod};
pub use files::{ProjectFile, ProjectFileDao};
pub use projects::{Project, ProjectDao, ProjectUpdate};
pub use staff::{Staff, StaffDao, StaffIds};
