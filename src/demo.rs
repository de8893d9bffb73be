//! Demonstração embutida: cadastro de um projeto de pesquisa tramitado até
//! o deferimento sobre o store em memória.

use serde_json::{Value, json};
use tracing::info;

use crate::api::{InMemorySie, Row};
use crate::config::SessionUser;
use crate::documents::numbering::DOCUMENT_TYPES;
use crate::documents::{DocumentDao, FLOWS};
use crate::error::Result;
use crate::mailbox::{Mailbox, ProjectRegistration};
use crate::research::projects::{PROJECTS, situation};
use crate::research::{Project, ProjectDao};
use crate::routing::{RoutingAudit, RoutingStep};

const PROJECT_ID: i64 = 1;
const COMMITTEE_MEMBER: i64 = 44;

pub struct DemoReport {
    pub audits: Vec<RoutingAudit>,
    pub steps: Vec<RoutingStep>,
    pub project: Project,
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn flow(id: i64, from: i64, to: i64, query: &str) -> Row {
    row(json!({
        "ID_FLUXO": id, "ID_TIPO_DOC": 217, "SITUACAO_ATUAL": from, "SITUACAO_FUTURA": to,
        "TIPO_DESTINO": 20, "ID_DESTINO": 90, "IND_QUERY": query, "IND_ATIVO": "S", "NUM_DIAS": 30,
    }))
}

/// Tipo 217 com máscara de processo e os fluxos 1 → 10 → 500 → 777.
pub fn seeded_store() -> InMemorySie {
    let api = InMemorySie::new();
    api.seed(
        DOCUMENT_TYPES,
        row(json!({"ID_TIPO_DOC": 217, "IND_NUMERACAO_SUP": "N", "MASCARA_TIPO_DOC": "pNNNN/AAAA"})),
    );
    api.seed(FLOWS, flow(1, 1, 10, "N"));
    api.seed(FLOWS, flow(2, 10, 500, "S"));
    api.seed(FLOWS, flow(3, 500, 777, "N"));
    api.seed(
        PROJECTS,
        row(json!({
            "ID_PROJETO": PROJECT_ID, "TITULO": "Projeto de demonstração",
            "SITUACAO_ITEM": situation::AWAITING_REGISTRATION, "AVALIACAO_ITEM": 1,
        })),
    );
    api
}

/// Registers the project, sends it to a committee member and approves it.
/// `on_step` is called after each routing.
pub async fn run(api: &InMemorySie, user: &SessionUser, mut on_step: impl FnMut(&str)) -> Result<DemoReport> {
    let projects = ProjectDao::new(api, user);
    let mailbox = Mailbox::<_, ProjectRegistration>::new(api, user);
    let mut audits = Vec::new();

    let (document, audit) = projects.register(PROJECT_ID, "Cadastro de projeto").await?;
    on_step(&format!(
        "document {} created with process {}",
        document.id,
        document.process_number.as_deref().unwrap_or("-")
    ));
    audits.push(audit);

    audits.push(
        mailbox
            .route_to_committee(document.id, "Para parecer da câmara", COMMITTEE_MEMBER)
            .await?,
    );
    on_step("routed to the committee");

    audits.push(mailbox.approve(document.id, "Deferido").await?);
    on_step("approved");

    let steps = DocumentDao::new(api, user).steps(document.id).await?;
    let project = projects.get(PROJECT_ID).await?;
    info!(document = document.id, steps = steps.len(), "demo finished");
    Ok(DemoReport {
        audits,
        steps,
        project,
    })
}
