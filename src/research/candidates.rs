use serde::{Deserialize, Serialize};
use tracing::info;

use super::staff::StaffDao;
use crate::api::{Query, SieApi, from_row, to_row};
use crate::config::SessionUser;
use crate::documents::{Document, DocumentDao, DocumentOwner};
use crate::error::{Result, SieError};
use crate::routing::{NoResolver, RoutingAudit};

pub const CANDIDATES: &str = "CANDIDATOS_BOLSISTA";
pub const STUDY_PLAN_VIEW: &str = "V_TRAMIT_PLANO_ESTUDOS";
/// Tipo de documento "plano de estudos" de candidato a bolsista.
pub const CANDIDATE_DOC_TYPE: i64 = 289;

pub const STATUS_APPROVED: &str = "D";
pub const STATUS_REJECTED: &str = "I";

/// Linha de `CANDIDATOS_BOLSISTA`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    #[serde(rename = "ID_CANDIDATOS_BOLSISTA")]
    pub id: i64,
    #[serde(rename = "ID_PROJETO", default)]
    pub project_id: Option<i64>,
    #[serde(rename = "ID_DOCUMENTO", default)]
    pub document_id: Option<i64>,
    #[serde(rename = "STATUS", default)]
    pub status: Option<String>,
    #[serde(rename = "ID_PARECER", default)]
    pub opinion_file_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateUpdate {
    #[serde(rename = "ID_CANDIDATOS_BOLSISTA")]
    pub id: i64,
    #[serde(rename = "ID_DOCUMENTO", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<i64>,
    #[serde(rename = "STATUS", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "ID_PARECER", skip_serializing_if = "Option::is_none")]
    pub opinion_file_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CoordinatorCpf {
    #[serde(rename = "CPF_COORDENADOR")]
    cpf: String,
}

pub struct CandidateDao<'a, A: SieApi> {
    api: &'a A,
    user: &'a SessionUser,
}

impl<'a, A: SieApi> CandidateDao<'a, A> {
    pub fn new(api: &'a A, user: &'a SessionUser) -> Self {
        Self { api, user }
    }

    pub async fn get(&self, id: i64) -> Result<Candidate> {
        let query = Query::new().eq("ID_CANDIDATOS_BOLSISTA", id);
        match self.api.get_optional(CANDIDATES, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("scholarship candidate", id)),
        }
    }

    pub async fn by_document(&self, document_id: i64) -> Result<Candidate> {
        let query = Query::new().eq("ID_DOCUMENTO", document_id);
        match self.api.get_optional(CANDIDATES, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("scholarship candidate of document", document_id)),
        }
    }

    pub async fn update(&self, update: &CandidateUpdate) -> Result<bool> {
        let affected = self.api.put(CANDIDATES, &to_row(update)?).await?;
        Ok(affected == 1)
    }

    pub async fn set_status_by_document(&self, document_id: i64, status: &str) -> Result<()> {
        let candidate = self.by_document(document_id).await?;
        let update = CandidateUpdate {
            id: candidate.id,
            status: Some(status.to_string()),
            ..CandidateUpdate::default()
        };
        self.update(&update).await?;
        info!(candidate = candidate.id, status, "candidate status changed");
        Ok(())
    }

    /// The project coordinator owns the candidate's document.
    async fn coordinator(&self, candidate_id: i64) -> Result<DocumentOwner> {
        let query = Query::new()
            .eq("ID_CANDIDATOS_BOLSISTA", candidate_id)
            .fields(&["CPF_COORDENADOR"]);
        let row = self
            .api
            .get_optional(STUDY_PLAN_VIEW, &query)
            .await?
            .ok_or_else(|| SieError::not_found("study plan of candidate", candidate_id))?;
        let CoordinatorCpf { cpf } = from_row(row)?;
        let ids = StaffDao::new(self.api).ids_by_cpf(cpf.trim()).await?;
        Ok(DocumentOwner {
            user_id: ids.user_id,
            hr_contract_id: ids.hr_contract_id,
        })
    }

    /// Creates the candidate's study-plan document, routes it through the
    /// initial flow and links it to the candidate.
    pub async fn register_document(&self, candidate_id: i64, dispatch: &str) -> Result<(Document, RoutingAudit)> {
        let owner = self.coordinator(candidate_id).await?;

        let documents = DocumentDao::new(self.api, self.user);
        let new = documents.initial_document(CANDIDATE_DOC_TYPE, owner).await?;
        let (document, audit) = documents.create_and_route(new, dispatch, &NoResolver).await?;

        let update = CandidateUpdate {
            id: candidate_id,
            document_id: Some(document.id),
            ..CandidateUpdate::default()
        };
        self.update(&update).await?;
        info!(candidate = candidate_id, document = document.id, "candidate document registered");
        Ok((document, audit))
    }
}
