use tracing::info;

use super::{Mailbox, MailboxProfile, Workflow};
use crate::api::SieApi;
use crate::error::Result;
use crate::research::candidates::{CANDIDATE_DOC_TYPE, STATUS_APPROVED, STATUS_REJECTED, STUDY_PLAN_VIEW};
use crate::research::files::OPINION_STUDY_PLAN;
use crate::research::{CandidateDao, CandidateUpdate};

/// Plano de estudos de candidato a bolsista (`V_TRAMIT_PLANO_ESTUDOS`).
pub struct ScholarshipCandidate;

impl Workflow for ScholarshipCandidate {
    const PROFILE: MailboxProfile =
        MailboxProfile::new(STUDY_PLAN_VIEW, CANDIDATE_DOC_TYPE, 20, OPINION_STUDY_PLAN);

    async fn after_approval<A: SieApi>(mailbox: &Mailbox<'_, A, Self>, document_id: i64) -> Result<()> {
        mailbox
            .candidates()
            .set_status_by_document(document_id, STATUS_APPROVED)
            .await
    }

    async fn after_rejection<A: SieApi>(mailbox: &Mailbox<'_, A, Self>, document_id: i64) -> Result<()> {
        mailbox
            .candidates()
            .set_status_by_document(document_id, STATUS_REJECTED)
            .await
    }

    // O parecer fica no próprio candidato.
    async fn register_opinion_file<A: SieApi>(
        mailbox: &Mailbox<'_, A, Self>,
        file_id: i64,
        document_id: i64,
    ) -> Result<()> {
        let candidates = mailbox.candidates();
        let candidate = candidates.by_document(document_id).await?;
        let update = CandidateUpdate {
            id: candidate.id,
            opinion_file_id: Some(file_id),
            ..CandidateUpdate::default()
        };
        candidates.update(&update).await?;
        Ok(())
    }
}

impl<A: SieApi> Mailbox<'_, A, ScholarshipCandidate> {
    fn candidates(&self) -> CandidateDao<'_, A> {
        CandidateDao::new(self.api, self.user)
    }

    /// Drops the request by moving the document straight to limbo, without
    /// a routing step.
    pub async fn cancel_request(&self, document_id: i64) -> Result<()> {
        self.documents()
            .update_document_status(document_id, ScholarshipCandidate::PROFILE.limbo)
            .await?;
        info!(document = document_id, "scholarship request cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{InMemorySie, Row};
    use crate::config::SessionUser;
    use crate::documents::numbering::DOCUMENT_TYPES;
    use crate::documents::{DocumentDao, FLOWS};
    use crate::research::candidates::CANDIDATES;
    use crate::research::staff::STAFF_IDS;
    use crate::routing::Destination;
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
        row(json!({"ID_FLUXO": id, "ID_TIPO_DOC": 289, "SITUACAO_ATUAL": from, "SITUACAO_FUTURA": to,
                   "TIPO_DESTINO": 20, "ID_DESTINO": 90, "IND_QUERY": query, "IND_ATIVO": "S"}))
    }

    /// Candidato 31 com plano de estudos na câmara (situação 20).
    async fn with_committee(api: &InMemorySie, user: &SessionUser) -> i64 {
        api.seed(
            DOCUMENT_TYPES,
            row(json!({"ID_TIPO_DOC": 289, "IND_NUMERACAO_SUP": "N", "MASCARA_TIPO_DOC": "NNNNNN/AAAA"})),
        );
        api.seed(FLOWS, flow(1, 1, 10, "N"));
        api.seed(FLOWS, flow(2, 10, 20, "S"));
        api.seed(FLOWS, flow(3, 20, 777, "N"));
        api.seed(FLOWS, flow(4, 20, 10, "N"));
        api.seed(CANDIDATES, row(json!({"ID_CANDIDATOS_BOLSISTA": 31, "ID_PROJETO": 3})));
        api.seed(
            STUDY_PLAN_VIEW,
            row(json!({"ID_CANDIDATOS_BOLSISTA": 31, "CPF_COORDENADOR": "01234567890"})),
        );
        api.seed(
            STAFF_IDS,
            row(json!({"CPF": "01234567890", "ID_USUARIO": 55, "ID_CONTRATO_RH": 901})),
        );

        let (document, _) = CandidateDao::new(api, user)
            .register_document(31, "Plano de estudos")
            .await
            .unwrap();
        let audit = Mailbox::<_, ScholarshipCandidate>::new(api, user)
            .route_to_committee(document.id, "Para parecer", 44)
            .await
            .unwrap();
        assert_eq!(audit.destination, Destination::user(44));
        document.id
    }

    fn candidate_row(api: &InMemorySie) -> Row {
        api.rows(CANDIDATES)[0].clone()
    }

    #[tokio::test]
    async fn approval_marks_candidate_approved() {
        let api = InMemorySie::new();
        let user = user();
        let document = with_committee(&api, &user).await;

        let audit = Mailbox::<_, ScholarshipCandidate>::new(&api, &user)
            .approve(document, "Aprovado")
            .await
            .unwrap();
        assert_eq!(audit.status_after, 777);
        assert_eq!(candidate_row(&api)["STATUS"], json!("D"));
    }

    #[tokio::test]
    async fn rejection_goes_back_to_dpq() {
        let api = InMemorySie::new();
        let user = user();
        let document = with_committee(&api, &user).await;

        let audit = Mailbox::<_, ScholarshipCandidate>::new(&api, &user)
            .reject(document, "Reprovado")
            .await
            .unwrap();
        assert_eq!((audit.status_before, audit.status_after), (20, 10));
        assert_eq!(candidate_row(&api)["STATUS"], json!("I"));
    }

    #[tokio::test]
    async fn opinion_file_and_cancellation() {
        let api = InMemorySie::new();
        let user = user();
        let document = with_committee(&api, &user).await;
        let mailbox = Mailbox::<_, ScholarshipCandidate>::new(&api, &user);

        mailbox.register_opinion_file(501, document).await.unwrap();
        assert_eq!(candidate_row(&api)["ID_PARECER"], json!(501));

        mailbox.cancel_request(document).await.unwrap();
        let stored = DocumentDao::new(&api, &user).get_document(document).await.unwrap();
        assert_eq!(stored.status, 999);
    }
}
