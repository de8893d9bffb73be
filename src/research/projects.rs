use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{Query, SieApi, from_row, to_row};
use crate::config::SessionUser;
use crate::dates::sie_date;
use crate::documents::{Document, DocumentDao};
use crate::error::{Result, SieError};
use crate::routing::{NoResolver, RoutingAudit};

pub const PROJECTS: &str = "PROJETOS";
/// Tipo de documento "projeto de pesquisa".
pub const RESEARCH_PROJECT_DOC_TYPE: i64 = 217;

/// Itens de `SITUACAO_ITEM` de um projeto.
pub mod situation {
    pub const CONCLUDED: i64 = 1;
    pub const IN_PROGRESS: i64 = 2;
    pub const SUSPENDED: i64 = 4;
    pub const CANCELLED: i64 = 5;
    pub const RENEWED: i64 = 6;
    pub const AWAITING_REGISTRATION: i64 = 8;
    pub const REJECTED: i64 = 9;
}

/// Itens de `AVALIACAO_ITEM` de um projeto.
pub mod evaluation {
    pub const NOT_EVALUATED: i64 = 1;
    pub const PENDING: i64 = 2;
    pub const EVALUATED: i64 = 3;
}

/// Linha de `PROJETOS`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Project {
    #[serde(rename = "ID_PROJETO")]
    pub id: i64,
    #[serde(rename = "ID_DOCUMENTO", default)]
    pub document_id: Option<i64>,
    #[serde(rename = "NUM_PROCESSO", default)]
    pub process_number: Option<String>,
    #[serde(rename = "TITULO", default)]
    pub title: Option<String>,
    #[serde(rename = "SITUACAO_ITEM", default)]
    pub situation: Option<i64>,
    #[serde(rename = "AVALIACAO_ITEM", default)]
    pub evaluation: Option<i64>,
    #[serde(rename = "DT_CONCLUSAO", default, with = "sie_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "DT_ULTIMA_AVAL", default, with = "sie_date")]
    pub last_evaluation: Option<NaiveDate>,
}

/// Atualização parcial de um projeto; só os campos presentes são enviados.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectUpdate {
    #[serde(rename = "ID_PROJETO")]
    pub id: i64,
    #[serde(rename = "ID_DOCUMENTO", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<i64>,
    #[serde(rename = "NUM_PROCESSO", skip_serializing_if = "Option::is_none")]
    pub process_number: Option<String>,
    #[serde(rename = "SITUACAO_ITEM", skip_serializing_if = "Option::is_none")]
    pub situation: Option<i64>,
    #[serde(rename = "AVALIACAO_ITEM", skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<i64>,
    #[serde(
        rename = "DT_CONCLUSAO",
        with = "sie_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(
        rename = "DT_ULTIMA_AVAL",
        with = "sie_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_evaluation: Option<NaiveDate>,
}

impl ProjectUpdate {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

pub struct ProjectDao<'a, A: SieApi> {
    api: &'a A,
    user: &'a SessionUser,
}

impl<'a, A: SieApi> ProjectDao<'a, A> {
    pub fn new(api: &'a A, user: &'a SessionUser) -> Self {
        Self { api, user }
    }

    pub async fn get(&self, id: i64) -> Result<Project> {
        let query = Query::new().eq("ID_PROJETO", id).limits(0, 1);
        match self.api.get_optional(PROJECTS, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("project", id)),
        }
    }

    pub async fn by_document(&self, document_id: i64) -> Result<Option<Project>> {
        let query = Query::new().eq("ID_DOCUMENTO", document_id);
        match self.api.get_optional(PROJECTS, &query).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    /// True when exactly one row changed.
    pub async fn update(&self, update: &ProjectUpdate) -> Result<bool> {
        let affected = self.api.put(PROJECTS, &to_row(update)?).await?;
        Ok(affected == 1)
    }

    /// Changes the situation of the project routed by `document_id`.
    pub async fn set_situation_by_document(&self, document_id: i64, situation: i64) -> Result<()> {
        let project = self
            .by_document(document_id)
            .await?
            .ok_or_else(|| SieError::not_found("project of document", document_id))?;
        let update = ProjectUpdate {
            situation: Some(situation),
            ..ProjectUpdate::new(project.id)
        };
        self.update(&update).await?;
        info!(project = project.id, situation, "project situation changed");
        Ok(())
    }

    /// Creates the project's document in the session user's name, routes
    /// it through the initial flow and records it on the project.
    pub async fn register(&self, project_id: i64, dispatch: &str) -> Result<(Document, RoutingAudit)> {
        self.get(project_id).await?;

        let documents = DocumentDao::new(self.api, self.user);
        let new = documents
            .initial_document(RESEARCH_PROJECT_DOC_TYPE, self.user.into())
            .await?;
        let (document, audit) = documents.create_and_route(new, dispatch, &NoResolver).await?;

        let update = ProjectUpdate {
            document_id: Some(document.id),
            process_number: document.process_number.clone(),
            ..ProjectUpdate::new(project_id)
        };
        self.update(&update).await?;
        info!(project = project_id, document = document.id, "project registered");
        Ok((document, audit))
    }

    /// Sends a project returned to its coordinator back through the
    /// initial flow.
    pub async fn reroute(&self, project_id: i64, document_id: i64, dispatch: &str) -> Result<RoutingAudit> {
        self.get(project_id).await?;

        let documents = DocumentDao::new(self.api, self.user);
        let document = documents.get_document(document_id).await?;
        documents.receive_document(&document).await?;
        let flow = documents.initial_flow(document.doc_type).await?;
        documents
            .route_document(&document, &flow, dispatch, &NoResolver)
            .await
    }
}
