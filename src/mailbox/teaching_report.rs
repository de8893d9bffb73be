use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use super::{Mailbox, MailboxProfile, WITH_PROFESSOR, Workflow};
use crate::api::SieApi;
use crate::dates;
use crate::documents::{Document, ProcessNumberDao};
use crate::error::{Result, SieError};
use crate::research::files::{OPINION_TEACHING_REPORT, ProjectFileDao};
use crate::research::projects::{evaluation, situation};
use crate::research::{
    Evaluation, EvaluationDao, EvaluationUpdate, NewEvaluation, Project, ProjectDao, ProjectUpdate,
    ReportPeriod,
};
use crate::routing::{NoResolver, RoutingAudit};

pub const TEACHING_REPORT_DOC_TYPE: i64 = 223;

/// Relatório docente enviado pelo coordenador de um projeto.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSubmission {
    pub project_id: i64,
    pub period: ReportPeriod,
    /// Nova data de conclusão, quando o relatório pede prorrogação.
    pub requested_end_date: Option<NaiveDate>,
    pub renewal_notes: Option<String>,
    /// Arquivo do relatório já gravado em `ARQUIVOS_PROJ`.
    pub report_file_id: Option<i64>,
}

/// Avaliação de relatório docente (`V_TRAMIT_AVA_PESQUISA`).
pub struct TeachingReport;

/// A report asking for a later end date renews the project.
fn is_renewal(report: &Evaluation, project: &Project) -> bool {
    match (report.end_date, project.end_date) {
        (Some(requested), Some(current)) => requested > current,
        (Some(_), None) => true,
        _ => false,
    }
}

impl Workflow for TeachingReport {
    const PROFILE: MailboxProfile = MailboxProfile::new(
        "V_TRAMIT_AVA_PESQUISA",
        TEACHING_REPORT_DOC_TYPE,
        20,
        OPINION_TEACHING_REPORT,
    );

    async fn after_approval<A: SieApi>(mailbox: &Mailbox<'_, A, Self>, document_id: i64) -> Result<()> {
        let report = mailbox.report(document_id).await?;
        let projects = ProjectDao::new(mailbox.api, mailbox.user);
        let project = projects.get(report.project_id).await?;

        let renewal = is_renewal(&report, &project);
        let update = ProjectUpdate {
            evaluation: Some(evaluation::EVALUATED),
            situation: Some(situation::IN_PROGRESS),
            last_evaluation: Some(dates::today()),
            end_date: if renewal { report.end_date } else { None },
            ..ProjectUpdate::new(project.id)
        };
        projects.update(&update).await?;

        let report_update = EvaluationUpdate {
            id: report.id,
            evaluator_contract_id: Some(mailbox.user.hr_contract_id),
            unit_id: Some(mailbox.user.official_unit_id),
            situation: Some(situation::IN_PROGRESS),
        };
        EvaluationDao::new(mailbox.api).update(&report_update).await?;
        info!(project = project.id, renewal, "teaching report approved");
        Ok(())
    }

    async fn after_return<A: SieApi>(mailbox: &Mailbox<'_, A, Self>, document_id: i64) -> Result<()> {
        let line = mailbox.current_line(document_id).await?;
        let project_id = line
            .project_id
            .ok_or_else(|| SieError::not_found("project of routing line", document_id))?;
        let update = ProjectUpdate {
            evaluation: Some(evaluation::NOT_EVALUATED),
            ..ProjectUpdate::new(project_id)
        };
        ProjectDao::new(mailbox.api, mailbox.user)
            .update(&update)
            .await?;
        Ok(())
    }

    async fn register_opinion_file<A: SieApi>(
        mailbox: &Mailbox<'_, A, Self>,
        file_id: i64,
        document_id: i64,
    ) -> Result<()> {
        let report = mailbox.report(document_id).await?;
        ProjectFileDao::new(mailbox.api)
            .attach_to_evaluation(file_id, report.id)
            .await?;
        Ok(())
    }
}

impl<A: SieApi> Mailbox<'_, A, TeachingReport> {
    /// Sends a teaching report to the DPq.
    ///
    /// The first report of a period creates the evaluation document, routes
    /// it through the initial flow and leaves the project pending
    /// evaluation. A report for a period that already has one is only
    /// accepted while that evaluation is back with the professor; its
    /// document is received and routed through the initial flow again.
    pub async fn submit_report(
        &self,
        submission: &ReportSubmission,
        dispatch: &str,
    ) -> Result<(Evaluation, RoutingAudit)> {
        let evaluations = EvaluationDao::new(self.api);
        let existing = evaluations
            .for_period(submission.project_id, submission.period)
            .await?;

        let (evaluation, audit) = match existing {
            Some(evaluation) => self.resend_report(evaluation, submission, dispatch).await?,
            None => self.first_report(submission, dispatch).await?,
        };

        if let Some(file_id) = submission.report_file_id {
            ProjectFileDao::new(self.api)
                .attach_to_evaluation(file_id, evaluation.id)
                .await?;
        }
        Ok((evaluation, audit))
    }

    async fn resend_report(
        &self,
        evaluation: Evaluation,
        submission: &ReportSubmission,
        dispatch: &str,
    ) -> Result<(Evaluation, RoutingAudit)> {
        if !self.is_with_professor(&evaluation).await? {
            return Err(SieError::ReportAlreadySubmitted {
                project_id: submission.project_id,
                year: submission.period.year,
            });
        }
        let document_id = evaluation
            .document_id
            .ok_or_else(|| SieError::not_found("document of evaluation", evaluation.id))?;

        let documents = self.documents();
        let initial = documents.initial_flow(TEACHING_REPORT_DOC_TYPE).await?;
        let audit = documents
            .receive_and_route(document_id, dispatch, initial.to_status, &NoResolver)
            .await?;
        info!(evaluation = evaluation.id, document = document_id, "teaching report sent again");
        Ok((evaluation, audit))
    }

    async fn first_report(&self, submission: &ReportSubmission, dispatch: &str) -> Result<(Evaluation, RoutingAudit)> {
        let projects = ProjectDao::new(self.api, self.user);
        let project = projects.get(submission.project_id).await?;

        let documents = self.documents();
        let mut new = documents
            .initial_document(TEACHING_REPORT_DOC_TYPE, self.user.into())
            .await?;
        if let Some(number) = project.process_number.as_deref() {
            new.subject_summary = Some(format!("Projeto nº {}", number.trim()));
        }
        let generated = new.process_number.is_none();
        let (document, audit) = documents.create_and_route(new, dispatch, &NoResolver).await?;

        let report = NewEvaluation {
            process_number: document.process_number.clone(),
            situation: project.situation,
            end_date: submission.requested_end_date.or(project.end_date),
            evaluator_contract_id: self.user.hr_contract_id,
            unit_id: self.user.official_unit_id,
            renewal_notes: submission.renewal_notes.clone(),
            ..NewEvaluation::for_period(project.id, document.id, submission.period)
        };
        let created = match EvaluationDao::new(self.api).create(&report).await {
            Ok(created) => created,
            Err(e) => {
                warn!(document = document.id, error = %e, "evaluation insert failed, discarding report document");
                self.discard_report_document(&document, generated).await;
                return Err(e);
            }
        };

        let pending = ProjectUpdate {
            evaluation: Some(evaluation::PENDING),
            ..ProjectUpdate::new(project.id)
        };
        projects.update(&pending).await?;
        info!(evaluation = created.id, document = document.id, "teaching report sent");
        Ok((created, audit))
    }

    async fn discard_report_document(&self, document: &Document, generated: bool) {
        if let Err(e) = self.documents().remove_document(document).await {
            warn!(document = document.id, error = %e, "could not remove report document");
        }
        if generated {
            let numbers = ProcessNumberDao::new(self.api, TEACHING_REPORT_DOC_TYPE, dates::today().year());
            if let Err(e) = numbers.revert().await {
                warn!(error = %e, "could not revert process number");
            }
        }
    }

    /// Whether the evaluation's document is back with the professor, who may
    /// then send the report again.
    pub async fn is_with_professor(&self, evaluation: &Evaluation) -> Result<bool> {
        let document_id = evaluation
            .document_id
            .ok_or_else(|| SieError::not_found("document of evaluation", evaluation.id))?;
        let document = self.documents().get_document(document_id).await?;
        Ok(document.status == WITH_PROFESSOR)
    }

    /// The evaluation routed by `document_id`.
    pub async fn report(&self, document_id: i64) -> Result<Evaluation> {
        EvaluationDao::new(self.api)
            .by_document(document_id)
            .await?
            .ok_or_else(|| SieError::not_found("evaluation of document", document_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{InMemorySie, Method, Row};
    use crate::config::SessionUser;
    use crate::documents::numbering::DOCUMENT_TYPES;
    use crate::documents::{DocumentDao, FLOWS};
    use crate::research::evaluations::EVALUATIONS;
    use crate::research::files::PROJECT_FILES;
    use crate::research::projects::PROJECTS;
    use crate::research::staff::STAFF;
    use crate::routing::{Destination, NoResolver};
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn user() -> SessionUser {
        SessionUser {
            user_id: 12,
            hr_contract_id: 340,
            official_unit_id: 77,
        }
    }

    fn flow(id: i64, from: i64, to: i64, query: &str) -> Row {
        row(json!({"ID_FLUXO": id, "ID_TIPO_DOC": 223, "SITUACAO_ATUAL": from, "SITUACAO_FUTURA": to,
                   "TIPO_DESTINO": 20, "ID_DESTINO": 90, "IND_QUERY": query, "IND_ATIVO": "S"}))
    }

    /// Relatório do projeto 3 pedindo conclusão em `requested_end`, já com a DPq.
    async fn routed_report(api: &InMemorySie, user: &SessionUser, requested_end: &str) -> i64 {
        api.seed(
            DOCUMENT_TYPES,
            row(json!({"ID_TIPO_DOC": 223, "IND_NUMERACAO_SUP": "N", "MASCARA_TIPO_DOC": "NNNNNN/AAAA"})),
        );
        api.seed(FLOWS, flow(1, 1, 10, "N"));
        api.seed(FLOWS, flow(2, 10, 777, "N"));
        api.seed(FLOWS, flow(3, 10, 1, "S"));
        api.seed(
            PROJECTS,
            row(json!({"ID_PROJETO": 3, "SITUACAO_ITEM": 2, "AVALIACAO_ITEM": 2,
                       "DT_CONCLUSAO": "2017-06-30"})),
        );
        api.seed(STAFF, row(json!({"CPF": "01234567890", "ID_USUARIO": 61})));

        let documents = DocumentDao::new(api, user);
        let new = documents
            .initial_document(TEACHING_REPORT_DOC_TYPE, user.into())
            .await
            .unwrap();
        let (document, _) = documents.create_and_route(new, "Relatório", &NoResolver).await.unwrap();
        api.seed(
            EVALUATIONS,
            row(json!({"ID_PROJETO": 3, "ID_DOCUMENTO": document.id, "SITUACAO_ITEM": 8,
                       "DT_CONCLUSAO": requested_end})),
        );
        document.id
    }

    #[tokio::test]
    async fn approval_renews_project_with_later_end_date() {
        let api = InMemorySie::new();
        let user = user();
        let document = routed_report(&api, &user, "2019-06-30").await;
        let mailbox = Mailbox::<_, TeachingReport>::new(&api, &user);

        mailbox.approve(document, "Aprovado").await.unwrap();

        let project = ProjectDao::new(&api, &user).get(3).await.unwrap();
        assert_eq!(project.evaluation, Some(evaluation::EVALUATED));
        assert_eq!(project.situation, Some(situation::IN_PROGRESS));
        assert_eq!(project.end_date, NaiveDate::from_ymd_opt(2019, 6, 30));
        assert_eq!(project.last_evaluation, Some(dates::today()));

        let report = &api.rows(EVALUATIONS)[0];
        assert_eq!(report["ID_CONTRATO_RH"], json!(340));
        assert_eq!(report["ID_UNIDADE"], json!(77));
        assert_eq!(report["SITUACAO_ITEM"], json!(situation::IN_PROGRESS));
    }

    #[tokio::test]
    async fn approval_keeps_end_date_without_renewal() {
        let api = InMemorySie::new();
        let user = user();
        let document = routed_report(&api, &user, "2017-01-31").await;

        Mailbox::<_, TeachingReport>::new(&api, &user)
            .approve(document, "Aprovado")
            .await
            .unwrap();

        let project = ProjectDao::new(&api, &user).get(3).await.unwrap();
        assert_eq!(project.end_date, NaiveDate::from_ymd_opt(2017, 6, 30));
        assert_eq!(project.evaluation, Some(evaluation::EVALUATED));
    }

    #[tokio::test]
    async fn return_marks_project_not_evaluated() {
        let api = InMemorySie::new();
        let user = user();
        let document = routed_report(&api, &user, "2019-06-30").await;
        api.seed(
            TeachingReport::PROFILE.view,
            row(json!({"ID_DOCUMENTO": document, "ID_PROJETO": 3, "SEQUENCIA": 1,
                       "SITUACAO_ATUAL": 10, "ULTIMA_SITUACAO": "S",
                       "CPF_COORDENADOR": "01234567890"})),
        );
        let mailbox = Mailbox::<_, TeachingReport>::new(&api, &user);

        let audit = mailbox.return_to_origin(document, "Refazer").await.unwrap();
        assert_eq!(audit.destination, Destination::user(61));
        assert_eq!(audit.status_after, 1);

        let project = ProjectDao::new(&api, &user).get(3).await.unwrap();
        assert_eq!(project.evaluation, Some(evaluation::NOT_EVALUATED));
    }

    #[tokio::test]
    async fn opinion_file_attaches_to_the_evaluation() {
        let api = InMemorySie::new();
        let user = user();
        let document = routed_report(&api, &user, "2019-06-30").await;
        let file = api.seed(
            PROJECT_FILES,
            row(json!({"ID_PROJETO": 3, "TIPO_ARQUIVO_ITEM": OPINION_TEACHING_REPORT})),
        );
        let mailbox = Mailbox::<_, TeachingReport>::new(&api, &user);

        mailbox.register_opinion_file(file, document).await.unwrap();
        let report = mailbox.report(document).await.unwrap();
        let stored = ProjectFileDao::new(&api).get(file).await.unwrap();
        assert_eq!(stored.evaluation_id, Some(report.id));
    }

    const PERIOD: ReportPeriod = ReportPeriod {
        year: 2016,
        table: Some(6012),
        item: Some(1),
    };

    /// Tipo 223 com fluxos e o projeto 5, ainda sem relatório.
    fn submission_store() -> InMemorySie {
        let api = InMemorySie::new();
        api.seed(
            DOCUMENT_TYPES,
            row(json!({"ID_TIPO_DOC": 223, "IND_NUMERACAO_SUP": "N", "MASCARA_TIPO_DOC": "NNNNNN/AAAA"})),
        );
        api.seed(FLOWS, flow(1, 1, 10, "N"));
        api.seed(FLOWS, flow(2, 10, 777, "N"));
        api.seed(FLOWS, flow(3, 10, 1, "S"));
        api.seed(
            PROJECTS,
            row(json!({"ID_PROJETO": 5, "NUM_PROCESSO": " P0042/2015 ", "SITUACAO_ITEM": 2,
                       "AVALIACAO_ITEM": 1, "DT_CONCLUSAO": "2017-06-30"})),
        );
        api.seed(STAFF, row(json!({"CPF": "01234567890", "ID_USUARIO": 61})));
        api
    }

    fn submission(file: Option<i64>) -> ReportSubmission {
        ReportSubmission {
            project_id: 5,
            period: PERIOD,
            requested_end_date: NaiveDate::from_ymd_opt(2018, 6, 30),
            renewal_notes: Some("Coleta atrasada".into()),
            report_file_id: file,
        }
    }

    #[tokio::test]
    async fn first_report_creates_evaluation_and_routes_to_dpq() {
        let api = submission_store();
        let user = user();
        let file = api.seed(PROJECT_FILES, row(json!({"ID_PROJETO": 5, "NOME_ARQUIVO": "relatorio.pdf"})));
        let mailbox = Mailbox::<_, TeachingReport>::new(&api, &user);

        let (report, audit) = mailbox.submit_report(&submission(Some(file)), "Relatório 2016").await.unwrap();
        assert_eq!((audit.status_before, audit.status_after), (1, 10));
        assert!(!audit.received);

        let document_id = report.document_id.unwrap();
        let document = DocumentDao::new(&api, &user).get_document(document_id).await.unwrap();
        assert_eq!(document.doc_type, TEACHING_REPORT_DOC_TYPE);
        assert_eq!(document.status, 10);

        let stored = &api.rows(EVALUATIONS)[0];
        assert_eq!(stored["ANO_REF"], json!(2016));
        assert_eq!(stored["SITUACAO_ITEM"], json!(2));
        assert_eq!(stored["DT_CONCLUSAO"], json!("2018-06-30"));
        assert_eq!(stored["ID_CONTRATO_RH"], json!(340));
        assert_eq!(stored["NUM_PROCESSO"], json!(document.process_number.unwrap()));
        assert_eq!(api.rows(crate::documents::DOCUMENTS)[0]["RESUMO_ASSUNTO"], json!("Projeto nº P0042/2015"));

        let project = ProjectDao::new(&api, &user).get(5).await.unwrap();
        assert_eq!(project.evaluation, Some(evaluation::PENDING));
        let attached = ProjectFileDao::new(&api).get(file).await.unwrap();
        assert_eq!(attached.evaluation_id, Some(report.id));
    }

    #[tokio::test]
    async fn report_can_only_be_resent_while_with_the_professor() {
        let api = submission_store();
        let user = user();
        let mailbox = Mailbox::<_, TeachingReport>::new(&api, &user);
        let (report, _) = mailbox.submit_report(&submission(None), "Relatório").await.unwrap();
        let document_id = report.document_id.unwrap();
        assert!(!mailbox.is_with_professor(&report).await.unwrap());

        let err = mailbox.submit_report(&submission(None), "De novo").await.unwrap_err();
        assert!(matches!(
            err,
            SieError::ReportAlreadySubmitted {
                project_id: 5,
                year: 2016
            }
        ));

        api.seed(
            TeachingReport::PROFILE.view,
            row(json!({"ID_DOCUMENTO": document_id, "ID_PROJETO": 5, "SEQUENCIA": 1,
                       "SITUACAO_ATUAL": 10, "ULTIMA_SITUACAO": "S",
                       "CPF_COORDENADOR": "01234567890"})),
        );
        mailbox.return_to_origin(document_id, "Faltam anexos").await.unwrap();
        assert!(mailbox.is_with_professor(&report).await.unwrap());

        let (resent, audit) = mailbox.submit_report(&submission(None), "Com anexos").await.unwrap();
        assert_eq!(resent.id, report.id);
        assert!(audit.received);
        assert_eq!((audit.status_before, audit.status_after), (1, 10));
        assert_eq!(audit.destination, Destination::user(90));
        assert_eq!(api.rows(EVALUATIONS).len(), 1);

        let steps = DocumentDao::new(&api, &user).steps(document_id).await.unwrap();
        assert_eq!(steps.len(), 3);
    }

    #[tokio::test]
    async fn failed_evaluation_insert_discards_report_document() {
        let api = submission_store();
        let user = user();
        let mailbox = Mailbox::<_, TeachingReport>::new(&api, &user);

        api.fail_next(Method::Post, EVALUATIONS);
        assert!(mailbox.submit_report(&submission(None), "Relatório").await.is_err());
        assert!(api.rows(crate::documents::DOCUMENTS).is_empty());
        assert_eq!(
            api.rows(crate::documents::numbering::PROCESS_COUNTERS)[0]["NUM_ULTIMO_DOC"],
            json!(0)
        );

        let (report, _) = mailbox.submit_report(&submission(None), "Relatório").await.unwrap();
        assert_eq!(report.project_id, 5);
    }

    #[test]
    fn renewal_needs_a_later_date() {
        let report = |end: Option<NaiveDate>| Evaluation {
            id: 1,
            project_id: 3,
            document_id: None,
            situation: None,
            end_date: end,
        };
        let project = |end: Option<NaiveDate>| Project {
            id: 3,
            document_id: None,
            process_number: None,
            title: None,
            situation: None,
            evaluation: None,
            end_date: end,
            last_evaluation: None,
        };
        let june = NaiveDate::from_ymd_opt(2017, 6, 30);
        let july = NaiveDate::from_ymd_opt(2017, 7, 1);

        assert!(is_renewal(&report(july), &project(june)));
        assert!(!is_renewal(&report(june), &project(june)));
        assert!(is_renewal(&report(july), &project(None)));
        assert!(!is_renewal(&report(None), &project(june)));
    }
}
