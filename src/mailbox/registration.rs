use chrono::Datelike;
use tracing::{debug, info};

use super::{Mailbox, MailboxLine, MailboxProfile, Workflow};
use crate::api::{Query, SieApi};
use crate::error::{Result, SieError};
use crate::research::ProjectDao;
use crate::research::files::OPINION_PROJECT_REGISTRATION;
use crate::research::projects::{RESEARCH_PROJECT_DOC_TYPE, situation};
use crate::routing::{NoResolver, RoutingAudit};

pub const CANCEL_DISPATCH: &str = "**PROJETO CANCELADO PELA DPq**";
pub const REJECT_DISPATCH: &str = "**PROJETO INDEFERIDO PELA DPq**";

/// Lines last changed up to the end of this year are left out of `sent`.
const SENT_CUTOFF_YEAR: i32 = 2015;

/// Cadastro de projetos de pesquisa (`V_TRAMIT_CAD_PESQUISA`).
pub struct ProjectRegistration;

impl Workflow for ProjectRegistration {
    const PROFILE: MailboxProfile = MailboxProfile::new(
        "V_TRAMIT_CAD_PESQUISA",
        RESEARCH_PROJECT_DOC_TYPE,
        500,
        OPINION_PROJECT_REGISTRATION,
    );

    // Legados com a DPq em outras situações não entram na caixa de entrada.
    fn inbox_filters() -> Query {
        Query::new().eq("SITUACAO_ITEM_PROJETO", situation::AWAITING_REGISTRATION)
    }

    // Pela situação do projeto, não pela do documento.
    fn approved_filters() -> Query {
        Query::new().one_of(
            "SITUACAO_ITEM_PROJETO",
            [situation::IN_PROGRESS, situation::RENEWED, situation::SUSPENDED],
        )
    }

    fn keep_sent(line: &MailboxLine) -> bool {
        line.changed_on
            .is_some_and(|date| date.year() > SENT_CUTOFF_YEAR)
    }

    async fn after_approval<A: SieApi>(mailbox: &Mailbox<'_, A, Self>, document_id: i64) -> Result<()> {
        mailbox.put_project_in_progress(document_id).await
    }
}

impl<A: SieApi> Mailbox<'_, A, ProjectRegistration> {
    fn projects(&self) -> ProjectDao<'_, A> {
        ProjectDao::new(self.api, self.user)
    }

    async fn archive_project(&self, document_id: i64, situation: i64) -> Result<()> {
        self.projects()
            .set_situation_by_document(document_id, situation)
            .await?;
        self.documents().archive_document(document_id).await
    }

    /// Cancels an approved project.
    ///
    /// Documents that reached the approved status are routed to limbo and
    /// archived. Legacy documents stuck elsewhere only get the project and
    /// document situations overwritten, so no audit comes back for them.
    pub async fn cancel_project(&self, document_id: i64) -> Result<Option<RoutingAudit>> {
        let line = self.current_line(document_id).await?;
        if line.status == ProjectRegistration::PROFILE.approved {
            let audit = self
                .documents()
                .receive_and_route(document_id, CANCEL_DISPATCH, ProjectRegistration::PROFILE.limbo, &NoResolver)
                .await?;
            self.archive_project(document_id, situation::CANCELLED).await?;
            info!(document = document_id, "project cancelled");
            return Ok(Some(audit));
        }

        self.projects()
            .set_situation_by_document(document_id, situation::CANCELLED)
            .await?;
        self.documents()
            .update_document_status(document_id, ProjectRegistration::PROFILE.limbo)
            .await?;
        info!(document = document_id, status = line.status, "legacy project cancelled in place");
        Ok(None)
    }

    /// Rejects the project, handing the document back to its coordinator
    /// in limbo and archiving it.
    pub async fn reject_project(&self, document_id: i64) -> Result<RoutingAudit> {
        let origin = self.origin_of(document_id);
        let audit = self
            .documents()
            .receive_and_route(document_id, REJECT_DISPATCH, ProjectRegistration::PROFILE.limbo, &origin)
            .await?;
        self.archive_project(document_id, situation::REJECTED).await?;
        info!(document = document_id, "project rejected");
        Ok(audit)
    }

    /// Moves a project awaiting registration to in progress. Projects in any
    /// other situation are left alone.
    pub async fn put_project_in_progress(&self, document_id: i64) -> Result<()> {
        let project = self
            .projects()
            .by_document(document_id)
            .await?
            .ok_or_else(|| SieError::not_found("project of document", document_id))?;
        if project.situation != Some(situation::AWAITING_REGISTRATION) {
            debug!(project = project.id, situation = ?project.situation, "not awaiting registration");
            return Ok(());
        }
        self.projects()
            .set_situation_by_document(document_id, situation::IN_PROGRESS)
            .await
    }

    pub async fn conclude_project(&self, document_id: i64) -> Result<()> {
        self.projects()
            .set_situation_by_document(document_id, situation::CONCLUDED)
            .await
    }
}
