//! Caixas postais da tramitação de pesquisa.
//!
//! Cada caixa lê uma view de tramitação (`V_TRAMIT_*`) e oferece as listagens
//! de entrada, enviados, deferidos e câmara, além das ações de tramitar para a
//! DPq, para a câmara, de volta ao docente, deferir e indeferir. O que muda de
//! um tipo de trâmite para outro fica em [`Workflow`]: o perfil de situações,
//! filtros extras das listagens e os ganchos executados após cada tramitação.

pub mod registration;
pub mod scholarship;
pub mod teaching_report;

use std::marker::PhantomData;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{MAX_ROWS, Query, Row, SieApi, Sort, from_row, from_rows};
use crate::config::SessionUser;
use crate::dates::sie_date;
use crate::documents::DocumentDao;
use crate::error::{Result, SieError};
use crate::research::StaffDao;
use crate::routing::{Destination, Flow, NoResolver, ResolveDestination, RoutingAudit};

pub use registration::ProjectRegistration;
pub use scholarship::ScholarshipCandidate;
pub use teaching_report::{ReportSubmission, TeachingReport};

pub const WITH_DPQ: i64 = 10;
pub const WITH_PROFESSOR: i64 = 1;
pub const APPROVED: i64 = 777;
pub const LIMBO: i64 = 999;
/// Tipo de destino de uma pessoa (docente coordenador ou membro de câmara).
pub const PERSON_DESTINATION_TYPE: i64 = 20;

/// Only the latest line of each document is listed.
const LATEST_LINE: &str = "S";

/// Situações e tabelas de um tipo de trâmite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxProfile {
    pub view: &'static str,
    pub doc_type: i64,
    pub with_dpq: i64,
    pub with_committee: i64,
    pub with_professor: i64,
    pub approved: i64,
    pub limbo: i64,
    pub committee_destination_type: i64,
    pub coordinator_destination_type: i64,
    pub opinion_file_type: i64,
}

impl MailboxProfile {
    pub const fn new(view: &'static str, doc_type: i64, with_committee: i64, opinion_file_type: i64) -> Self {
        Self {
            view,
            doc_type,
            with_dpq: WITH_DPQ,
            with_committee,
            with_professor: WITH_PROFESSOR,
            approved: APPROVED,
            limbo: LIMBO,
            committee_destination_type: PERSON_DESTINATION_TYPE,
            coordinator_destination_type: PERSON_DESTINATION_TYPE,
            opinion_file_type,
        }
    }
}

/// Linha de uma view de tramitação. Colunas específicas de cada view ficam
/// em `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailboxLine {
    #[serde(rename = "ID_DOCUMENTO")]
    pub document_id: i64,
    #[serde(rename = "ID_PROJETO", default)]
    pub project_id: Option<i64>,
    #[serde(rename = "SEQUENCIA", default)]
    pub sequence: Option<i64>,
    #[serde(rename = "SITUACAO_ATUAL")]
    pub status: i64,
    #[serde(rename = "SITUACAO_ANTERIOR", default)]
    pub previous_status: Option<i64>,
    #[serde(rename = "CPF_COORDENADOR", default)]
    pub coordinator_cpf: Option<String>,
    #[serde(rename = "TIPO_DESTINO", default)]
    pub destination_type: Option<i64>,
    #[serde(rename = "ID_DESTINO", default)]
    pub destination_id: Option<i64>,
    #[serde(rename = "DT_ALTERACAO", default, with = "sie_date")]
    pub changed_on: Option<NaiveDate>,
    #[serde(rename = "SITUACAO_ITEM_PROJETO", default)]
    pub project_situation: Option<i64>,
    #[serde(rename = "TITULO", default)]
    pub title: Option<String>,
    #[serde(rename = "NUM_PROCESSO", default)]
    pub process_number: Option<String>,
    #[serde(flatten)]
    pub extra: Row,
}

/// A kind of research routing: its profile, listing filters and the hooks
/// run after each routing action.
#[allow(async_fn_in_trait)]
pub trait Workflow: Sized {
    const PROFILE: MailboxProfile;

    /// Filters added to the inbox query.
    fn inbox_filters() -> Query {
        Query::new()
    }

    fn approved_filters() -> Query {
        Query::new().eq("SITUACAO_ATUAL", Self::PROFILE.approved)
    }

    fn keep_sent(_line: &MailboxLine) -> bool {
        true
    }

    async fn after_approval<A: SieApi>(_mailbox: &Mailbox<'_, A, Self>, _document_id: i64) -> Result<()> {
        Ok(())
    }

    async fn after_rejection<A: SieApi>(_mailbox: &Mailbox<'_, A, Self>, _document_id: i64) -> Result<()> {
        Ok(())
    }

    async fn after_return<A: SieApi>(_mailbox: &Mailbox<'_, A, Self>, _document_id: i64) -> Result<()> {
        Ok(())
    }

    /// Links a committee opinion file to whatever `document_id` stands for.
    async fn register_opinion_file<A: SieApi>(
        _mailbox: &Mailbox<'_, A, Self>,
        _file_id: i64,
        _document_id: i64,
    ) -> Result<()> {
        Ok(())
    }
}

/// Resolves to the coordinator of the document's current line.
pub struct OriginProfessor<'m, 'a, A: SieApi, W: Workflow> {
    mailbox: &'m Mailbox<'a, A, W>,
    document_id: i64,
}

impl<A: SieApi, W: Workflow> ResolveDestination for OriginProfessor<'_, '_, A, W> {
    async fn resolve(&self, _flow: &Flow) -> Result<Destination> {
        self.mailbox.origin_professor(self.document_id).await
    }
}

pub struct Mailbox<'a, A: SieApi, W: Workflow> {
    api: &'a A,
    user: &'a SessionUser,
    kind: PhantomData<W>,
}

impl<'a, A: SieApi, W: Workflow> Mailbox<'a, A, W> {
    pub fn new(api: &'a A, user: &'a SessionUser) -> Self {
        Self {
            api,
            user,
            kind: PhantomData,
        }
    }

    pub fn profile(&self) -> MailboxProfile {
        W::PROFILE
    }

    fn documents(&self) -> DocumentDao<'a, A> {
        DocumentDao::new(self.api, self.user)
    }

    async fn list(&self, filters: Query) -> Result<Vec<MailboxLine>> {
        let query = Query::new()
            .eq("ULTIMA_SITUACAO", LATEST_LINE)
            .limits(0, MAX_ROWS)
            .merge(filters);
        Ok(from_rows(self.api.get_all(W::PROFILE.view, &query).await?)?)
    }

    /// Documents with the committee. Non-admins only see their own.
    pub async fn committee(&self, user_id: i64, admin: bool) -> Result<Vec<MailboxLine>> {
        let mut filters = Query::new().eq("SITUACAO_ATUAL", W::PROFILE.with_committee);
        if !admin {
            filters = filters
                .eq("ID_DESTINO", user_id)
                .eq("TIPO_DESTINO", W::PROFILE.committee_destination_type);
        }
        self.list(filters).await
    }

    pub async fn inbox(&self) -> Result<Vec<MailboxLine>> {
        let filters = Query::new()
            .eq("SITUACAO_ATUAL", W::PROFILE.with_dpq)
            .merge(W::inbox_filters());
        self.list(filters).await
    }

    pub async fn approved(&self) -> Result<Vec<MailboxLine>> {
        self.list(W::approved_filters()).await
    }

    /// Documents the DPq sent on to a committee or back to a professor.
    pub async fn sent(&self) -> Result<Vec<MailboxLine>> {
        let filters = Query::new()
            .eq("SITUACAO_ANTERIOR", W::PROFILE.with_dpq)
            .one_of(
                "SITUACAO_ATUAL",
                [W::PROFILE.with_committee, W::PROFILE.with_professor],
            );
        let mut lines = self.list(filters).await?;
        lines.retain(W::keep_sent);
        Ok(lines)
    }

    async fn latest_line(&self, column: &'static str, id: i64) -> Result<MailboxLine> {
        let query = Query::new()
            .eq(column, id)
            .order_by("SEQUENCIA", Sort::Desc)
            .limits(0, 1);
        match self.api.get_optional(W::PROFILE.view, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("routing line", format!("{column}={id}"))),
        }
    }

    pub async fn current_line(&self, document_id: i64) -> Result<MailboxLine> {
        self.latest_line("ID_DOCUMENTO", document_id).await
    }

    pub async fn current_line_for_project(&self, project_id: i64) -> Result<MailboxLine> {
        self.latest_line("ID_PROJETO", project_id).await
    }

    /// Every line of the document, newest first.
    pub async fn history(&self, document_id: i64) -> Result<Vec<MailboxLine>> {
        let query = Query::new()
            .eq("ID_DOCUMENTO", document_id)
            .order_by("SEQUENCIA", Sort::Desc)
            .limits(0, MAX_ROWS);
        Ok(from_rows(self.api.get_all(W::PROFILE.view, &query).await?)?)
    }

    /// The project coordinator of the document's current line.
    pub async fn origin_professor(&self, document_id: i64) -> Result<Destination> {
        let line = self.current_line(document_id).await?;
        let cpf = line
            .coordinator_cpf
            .ok_or_else(|| SieError::not_found("coordinator of document", document_id))?;
        let coordinator = StaffDao::new(self.api).by_cpf(cpf.trim()).await?;
        Ok(Destination {
            kind: W::PROFILE.coordinator_destination_type,
            id: coordinator.user_id,
        })
    }

    fn origin_of(&self, document_id: i64) -> OriginProfessor<'_, 'a, A, W> {
        OriginProfessor {
            mailbox: self,
            document_id,
        }
    }

    pub async fn route_to_dpq(&self, document_id: i64, dispatch: &str) -> Result<RoutingAudit> {
        self.documents()
            .receive_and_route(document_id, dispatch, W::PROFILE.with_dpq, &NoResolver)
            .await
    }

    pub async fn return_to_origin(&self, document_id: i64, dispatch: &str) -> Result<RoutingAudit> {
        let origin = self.origin_of(document_id);
        let audit = self
            .documents()
            .receive_and_route(document_id, dispatch, W::PROFILE.with_professor, &origin)
            .await?;
        W::after_return(self, document_id).await?;
        Ok(audit)
    }

    pub async fn route_to_committee(&self, document_id: i64, dispatch: &str, professor_id: i64) -> Result<RoutingAudit> {
        let member = Destination {
            kind: W::PROFILE.committee_destination_type,
            id: professor_id,
        };
        self.documents()
            .receive_and_route(document_id, dispatch, W::PROFILE.with_committee, &member)
            .await
    }

    /// Sends the document back to the DPq as rejected.
    pub async fn reject(&self, document_id: i64, dispatch: &str) -> Result<RoutingAudit> {
        let audit = self
            .documents()
            .receive_and_route(document_id, dispatch, W::PROFILE.with_dpq, &NoResolver)
            .await?;
        W::after_rejection(self, document_id).await?;
        info!(document = document_id, view = W::PROFILE.view, "rejected");
        Ok(audit)
    }

    pub async fn approve(&self, document_id: i64, dispatch: &str) -> Result<RoutingAudit> {
        let audit = self
            .documents()
            .receive_and_route(document_id, dispatch, W::PROFILE.approved, &NoResolver)
            .await?;
        W::after_approval(self, document_id).await?;
        info!(document = document_id, view = W::PROFILE.view, "approved");
        Ok(audit)
    }

    pub async fn register_opinion_file(&self, file_id: i64, document_id: i64) -> Result<()> {
        W::register_opinion_file(self, file_id, document_id).await
    }
}
