use chrono::Datelike;
use tracing::{info, warn};

use super::document::{
    Activation, ArchiveUpdate, Document, DocumentOwner, NewDocument, OwnerUpdate, StatusUpdate,
};
use super::numbering::{DocumentTypeDao, ProcessNumberDao, SubjectDao};
use crate::api::{MAX_ROWS, Query, SieApi, Sort, from_row, from_rows, to_row};
use crate::config::SessionUser;
use crate::dates;
use crate::error::{Result, SieError};
use crate::routing::{
    AuditBuilder, Flow, NewRoutingStep, ReceiveOutcome, ResolveDestination, RoutingAudit,
    RoutingMachine, RoutingStatus, RoutingStep, StepStatusUpdate, destination_for,
};

pub const DOCUMENTS: &str = "DOCUMENTOS";
pub const ROUTING_STEPS: &str = "TRAMITACOES";
pub const FLOWS: &str = "FLUXOS";
pub const DOCUMENT_STATES: &str = "ESTADOS_DOCUMENTOS";

/// Tabela estruturada de situação de documento e o item "ativo".
pub const DOCUMENT_SITUATION_TABLE: i64 = 2001;
pub const DOCUMENT_ACTIVE: i64 = 1;

const ACTIVE: &str = "S";

/// Documentos eletrônicos e sua tramitação.
pub struct DocumentDao<'a, A: SieApi> {
    api: &'a A,
    user: &'a SessionUser,
}

impl<'a, A: SieApi> DocumentDao<'a, A> {
    pub fn new(api: &'a A, user: &'a SessionUser) -> Self {
        Self { api, user }
    }

    /// Template for a new document of `doc_type`, with the type's default
    /// subject and archive deadline.
    pub async fn initial_document(&self, doc_type: i64, owner: DocumentOwner) -> Result<NewDocument> {
        let params = DocumentTypeDao::new(self.api).parameters(doc_type).await?;
        let now = dates::now();
        let mut document = NewDocument::template(doc_type, owner, self.user.user_id, now);

        if let Some(subject_id) = params.default_subject
            && let Some(subject) = SubjectDao::new(self.api).get(subject_id).await?
        {
            document.subject_id = Some(subject.id);
            document.subject_summary = subject.description.map(|d| d.trim().to_string());
            document.archive_deadline = match subject.archive_days {
                Some(days) => Some(dates::add_days(now.date(), days).ok_or(
                    SieError::ArchiveDeadlineOutOfRange {
                        subject_id: subject.id,
                        days,
                    },
                )?),
                None => None,
            };
        }
        Ok(document)
    }

    /// Inserts `new` with its first routing step and activates it.
    ///
    /// A failure at any stage undoes the stages before it.
    pub async fn create_document(&self, mut new: NewDocument) -> Result<Document> {
        let numbers = ProcessNumberDao::new(self.api, new.doc_type, dates::today().year());
        let generated = new.process_number.is_none();
        if generated {
            new.process_number = Some(numbers.generate().await?);
        }

        let document = match self.insert_document(&new).await {
            Ok(document) => document,
            Err(e) => {
                self.compensate_number(&numbers, generated).await;
                return Err(e);
            }
        };

        if let Err(e) = self.add_first_step(&document).await {
            warn!(document = document.id, error = %e, "first routing step failed, rolling back");
            self.compensate_document(document.id, &numbers, generated).await;
            return Err(e);
        }

        if let Err(e) = self.activate(document.id).await {
            warn!(document = document.id, error = %e, "activation failed, rolling back");
            if let Err(undo) = self.remove_steps(document.id).await {
                warn!(document = document.id, error = %undo, "could not remove routing steps");
            }
            self.compensate_document(document.id, &numbers, generated).await;
            return Err(e);
        }

        info!(
            document = document.id,
            process = document.process_number.as_deref().unwrap_or(""),
            "document created"
        );
        Ok(document)
    }

    /// Creates a document and routes it through its type's initial flow.
    /// The document is discarded when that first routing fails.
    pub async fn create_and_route<R: ResolveDestination>(
        &self,
        new: NewDocument,
        dispatch: &str,
        resolver: &R,
    ) -> Result<(Document, RoutingAudit)> {
        let doc_type = new.doc_type;
        let generated = new.process_number.is_none();
        let document = self.create_document(new).await?;

        let routed = async {
            let flow = self.initial_flow(doc_type).await?;
            self.route_document(&document, &flow, dispatch, resolver).await
        }
        .await;

        match routed {
            Ok(audit) => Ok((document, audit)),
            Err(e) => {
                warn!(document = document.id, error = %e, "initial routing failed, discarding document");
                if let Err(undo) = self.remove_document(&document).await {
                    warn!(document = document.id, error = %undo, "could not remove document");
                }
                let numbers = ProcessNumberDao::new(self.api, doc_type, dates::today().year());
                self.compensate_number(&numbers, generated).await;
                Err(e)
            }
        }
    }

    async fn insert_document(&self, new: &NewDocument) -> Result<Document> {
        let id = self.api.post(DOCUMENTS, &to_row(new)?).await?;
        self.get_document(id).await
    }

    async fn add_first_step(&self, document: &Document) -> Result<RoutingStep> {
        let owner = document
            .owner()
            .ok_or_else(|| SieError::not_found("document owner", document.id))?;
        let step = NewRoutingStep::awaiting(document.id, 1, owner, dates::now());
        let id = self.api.post(ROUTING_STEPS, &to_row(&step)?).await?;
        let row = self
            .api
            .get_single(ROUTING_STEPS, &Query::new().eq("ID_TRAMITACAO", id))
            .await?;
        Ok(from_row(row)?)
    }

    async fn activate(&self, document_id: i64) -> Result<()> {
        let activation = Activation {
            document_id,
            situation_table: DOCUMENT_SITUATION_TABLE,
            situation_item: DOCUMENT_ACTIVE,
        };
        self.api.post(DOCUMENT_STATES, &to_row(&activation)?).await?;
        Ok(())
    }

    async fn compensate_document(&self, document_id: i64, numbers: &ProcessNumberDao<'_, A>, generated: bool) {
        let query = Query::new().eq("ID_DOCUMENTO", document_id);
        if let Err(e) = self.api.delete(DOCUMENTS, &query).await {
            warn!(document = document_id, error = %e, "could not delete document");
        }
        self.compensate_number(numbers, generated).await;
    }

    async fn compensate_number(&self, numbers: &ProcessNumberDao<'_, A>, generated: bool) {
        if !generated {
            return;
        }
        if let Err(e) = numbers.revert().await {
            warn!(error = %e, "could not revert process number");
        }
    }

    pub async fn get_document(&self, id: i64) -> Result<Document> {
        let query = Query::new().eq("ID_DOCUMENTO", id);
        match self.api.get_optional(DOCUMENTS, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::DocumentNotFound(id)),
        }
    }

    /// Removes the document's routing steps, then the document.
    pub async fn remove_document(&self, document: &Document) -> Result<()> {
        self.remove_steps(document.id).await?;
        self.api
            .delete(DOCUMENTS, &Query::new().eq("ID_DOCUMENTO", document.id))
            .await?;
        info!(document = document.id, "document removed");
        Ok(())
    }

    /// Opens the document, then routes it to `next_status`.
    pub async fn receive_and_route<R: ResolveDestination>(
        &self,
        id: i64,
        dispatch: &str,
        next_status: i64,
        resolver: &R,
    ) -> Result<RoutingAudit> {
        let document = self.get_document(id).await?;
        if document.is_archived() {
            return Err(SieError::AlreadyArchived(id));
        }

        let received = self.receive_document(&document).await?;
        let flow = self
            .next_flow_to(&document, next_status)
            .await?
            .ok_or(SieError::NoFlow {
                document_id: id,
                from_status: document.status,
                to_status: next_status,
            })?;

        let audit = AuditBuilder::start(id).received(received);
        self.route_with_audit(&document, &flow, dispatch, resolver, audit)
            .await
    }

    /// Dispatches the AWAITING current step through `flow`.
    pub async fn route_document<R: ResolveDestination>(
        &self,
        document: &Document,
        flow: &Flow,
        dispatch: &str,
        resolver: &R,
    ) -> Result<RoutingAudit> {
        let audit = AuditBuilder::start(document.id);
        self.route_with_audit(document, flow, dispatch, resolver, audit)
            .await
    }

    async fn route_with_audit<R: ResolveDestination>(
        &self,
        document: &Document,
        flow: &Flow,
        dispatch: &str,
        resolver: &R,
        audit: AuditBuilder,
    ) -> Result<RoutingAudit> {
        let current = self.current_step(document.id).await?;
        RoutingMachine::ensure_awaiting(&current)?;

        let destination = destination_for(flow, resolver).await?;
        let delivery = RoutingMachine::deliver(
            &current,
            flow,
            destination,
            dispatch,
            self.user.user_id,
            dates::now(),
        )?;
        self.api.put(ROUTING_STEPS, &to_row(&delivery)?).await?;
        self.update_document_status(document.id, flow.to_status).await?;

        info!(
            document = document.id,
            flow = flow.id,
            from = document.status,
            to = flow.to_status,
            destination = destination.id,
            "document routed"
        );
        Ok(audit.finish(
            flow.id,
            document.status,
            flow.to_status,
            current.sequence,
            destination,
        ))
    }

    /// Opens the current step. A DELIVERED step becomes RECEIVED, the
    /// document changes hands and a new AWAITING step is appended.
    /// Returns whether a reception happened.
    pub async fn receive_document(&self, document: &Document) -> Result<bool> {
        let current = self.current_step(document.id).await?;
        let reception = match RoutingMachine::receive(&current, dates::now())? {
            ReceiveOutcome::Received(reception) => reception,
            ReceiveOutcome::AlreadyOpen => return Ok(false),
        };

        self.api.put(ROUTING_STEPS, &to_row(&reception)?).await?;
        let owner = OwnerUpdate {
            id: document.id,
            owner_type: reception.new_owner.kind,
            owner_id: reception.new_owner.id,
        };
        self.api.put(DOCUMENTS, &to_row(&owner)?).await?;

        let previous = self.current_step(document.id).await?;
        let sequence = RoutingMachine::next_sequence(&previous)?;
        let step = NewRoutingStep::awaiting(document.id, sequence, reception.new_owner, dates::now());
        self.api.post(ROUTING_STEPS, &to_row(&step)?).await?;

        info!(document = document.id, sequence, owner = reception.new_owner.id, "document received");
        Ok(true)
    }

    pub async fn update_document_status(&self, id: i64, status: i64) -> Result<()> {
        let now = dates::now();
        let update = StatusUpdate {
            id,
            status,
            changed_on: Some(now.date()),
            changed_at: Some(now.time()),
        };
        self.api.put(DOCUMENTS, &to_row(&update)?).await?;
        Ok(())
    }

    /// Closes the current step and stamps the archive date.
    pub async fn archive_document(&self, id: i64) -> Result<()> {
        let current = self.current_step(id).await?;
        let close = StepStatusUpdate {
            step_id: current.id,
            status: RoutingStatus::Received,
        };
        self.api.put(ROUTING_STEPS, &to_row(&close)?).await?;

        let archive = ArchiveUpdate {
            id,
            archived_on: Some(dates::today()),
        };
        self.api.put(DOCUMENTS, &to_row(&archive)?).await?;
        info!(document = id, "document archived");
        Ok(())
    }

    fn steps_query(document_id: i64, sort: Sort) -> Query {
        Query::new()
            .eq("ID_DOCUMENTO", document_id)
            .order_by("SEQUENCIA", sort)
    }

    async fn single_step(&self, document_id: i64, sort: Sort) -> Result<RoutingStep> {
        let query = Self::steps_query(document_id, sort).limits(0, 1);
        match self.api.get_optional(ROUTING_STEPS, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("routing step of document", document_id)),
        }
    }

    pub async fn first_step(&self, document_id: i64) -> Result<RoutingStep> {
        self.single_step(document_id, Sort::Asc).await
    }

    /// The step with the greatest sequence.
    pub async fn current_step(&self, document_id: i64) -> Result<RoutingStep> {
        self.single_step(document_id, Sort::Desc).await
    }

    /// Every step, by ascending sequence.
    pub async fn steps(&self, document_id: i64) -> Result<Vec<RoutingStep>> {
        let query = Self::steps_query(document_id, Sort::Asc).limits(0, MAX_ROWS);
        Ok(from_rows(self.api.get_all(ROUTING_STEPS, &query).await?)?)
    }

    /// Deletes every routing step of the document; returns how many.
    pub async fn remove_steps(&self, document_id: i64) -> Result<u64> {
        let query = Query::new()
            .eq("ID_DOCUMENTO", document_id)
            .fields(&["ID_TRAMITACAO"]);
        let mut removed = 0;
        for row in self.api.get_all(ROUTING_STEPS, &query).await? {
            let Some(step_id) = row.get("ID_TRAMITACAO").cloned() else {
                continue;
            };
            removed += self
                .api
                .delete(ROUTING_STEPS, &Query::new().eq("ID_TRAMITACAO", step_id))
                .await?;
        }
        Ok(removed)
    }

    /// Flow recorded on the current step.
    pub async fn current_flow(&self, document_id: i64) -> Result<Flow> {
        let step = self.current_step(document_id).await?;
        let flow_id = step
            .flow_id
            .ok_or_else(|| SieError::not_found("flow of current step of document", document_id))?;
        let row = self
            .api
            .get_single(FLOWS, &Query::new().eq("ID_FLUXO", flow_id))
            .await?;
        Ok(from_row(row)?)
    }

    fn active_flows(doc_type: i64, from_status: i64) -> Query {
        Query::new()
            .eq("ID_TIPO_DOC", doc_type)
            .eq("SITUACAO_ATUAL", from_status)
            .eq("IND_ATIVO", ACTIVE)
    }

    /// Active flows leaving the document's current status.
    pub async fn valid_next_flows(&self, document: &Document) -> Result<Vec<Flow>> {
        let query = Self::active_flows(document.doc_type, document.status).limits(0, MAX_ROWS);
        Ok(from_rows(self.api.get_all(FLOWS, &query).await?)?)
    }

    pub async fn next_flow_to(&self, document: &Document, status: i64) -> Result<Option<Flow>> {
        let query = Self::active_flows(document.doc_type, document.status)
            .eq("SITUACAO_FUTURA", status)
            .limits(0, MAX_ROWS);
        match self.api.get_optional(FLOWS, &query).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    /// The single active flow leaving the initial status.
    pub async fn initial_flow(&self, doc_type: i64) -> Result<Flow> {
        let query = Self::active_flows(doc_type, super::INITIAL_STATUS);
        let mut flows: Vec<Flow> = from_rows(self.api.get_all(FLOWS, &query).await?)?;
        match flows.len() {
            0 => Err(SieError::NoInitialFlow { doc_type }),
            1 => Ok(flows.remove(0)),
            count => Err(SieError::AmbiguousInitialFlow { doc_type, count }),
        }
    }

    pub async fn documents_of_type(&self, doc_type: i64, filters: Query) -> Result<Vec<Document>> {
        let query = filters
            .merge(Query::new().eq("ID_TIPO_DOC", doc_type))
            .limits(0, MAX_ROWS);
        Ok(from_rows(self.api.get_all(DOCUMENTS, &query).await?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{InMemorySie, Method, Row};
    use crate::documents::numbering::{DOCUMENT_TYPES, PROCESS_COUNTERS, SUBJECTS};
    use crate::routing::{Destination, NoResolver, RoutingError};
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

    /// Tipo 217 com assunto padrão e fluxos 1 → 10 → 500.
    fn seeded() -> InMemorySie {
        let api = InMemorySie::new();
        api.seed(
            DOCUMENT_TYPES,
            row(json!({"ID_TIPO_DOC": 217, "IND_NUMERACAO_SUP": "N",
                       "MASCARA_TIPO_DOC": "pNNNN/AAAA", "ID_ASSUNTO_PADRAO": 8})),
        );
        api.seed(
            SUBJECTS,
            row(json!({"ID_ASSUNTO": 8, "DESCR_ASSUNTO": "Projeto de pesquisa ", "TEMPO_ARQUIVAMENTO": 30})),
        );
        api.seed(
            FLOWS,
            row(json!({"ID_FLUXO": 1, "ID_TIPO_DOC": 217, "SITUACAO_ATUAL": 1, "SITUACAO_FUTURA": 10,
                       "TIPO_DESTINO": 20, "ID_DESTINO": 90, "NUM_DIAS": 5,
                       "IND_QUERY": "N", "IND_ATIVO": "S"})),
        );
        api.seed(
            FLOWS,
            row(json!({"ID_FLUXO": 2, "ID_TIPO_DOC": 217, "SITUACAO_ATUAL": 10, "SITUACAO_FUTURA": 500,
                       "TIPO_DESTINO": 20, "NUM_DIAS": 15, "IND_QUERY": "S", "IND_ATIVO": "S"})),
        );
        api.seed(
            FLOWS,
            row(json!({"ID_FLUXO": 3, "ID_TIPO_DOC": 217, "SITUACAO_ATUAL": 10, "SITUACAO_FUTURA": 999,
                       "TIPO_DESTINO": 20, "ID_DESTINO": 1, "IND_QUERY": "N", "IND_ATIVO": "N"})),
        );
        api
    }

    async fn created(api: &InMemorySie, user: &SessionUser) -> Document {
        let dao = DocumentDao::new(api, user);
        let new = dao.initial_document(217, user.into()).await.unwrap();
        dao.create_document(new).await.unwrap()
    }

    #[tokio::test]
    async fn initial_document_uses_type_subject() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let new = dao.initial_document(217, (&user).into()).await.unwrap();

        assert_eq!(new.subject_id, Some(8));
        assert_eq!(new.subject_summary.as_deref(), Some("Projeto de pesquisa"));
        assert_eq!(
            new.archive_deadline,
            dates::add_days(dates::today(), 30)
        );
        assert_eq!(new.creator_id, 12);
        assert_eq!(new.owner_id, 12);
    }

    #[tokio::test]
    async fn create_document_numbers_routes_and_activates() {
        let api = seeded();
        let user = user();
        let document = created(&api, &user).await;

        let year = dates::today().year();
        assert_eq!(document.process_number, Some(format!("P0001/{year}")));
        assert_eq!(document.status, 1);

        let dao = DocumentDao::new(&api, &user);
        let first = dao.first_step(document.id).await.unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.status, RoutingStatus::Awaiting);
        assert_eq!(first.destination(), Some(Destination::user(12)));

        let states = api.rows(DOCUMENT_STATES);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0]["COD_SITUACAO_TAB"], json!(2001));
    }

    #[tokio::test]
    async fn provided_process_number_is_kept() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let mut new = dao.initial_document(217, (&user).into()).await.unwrap();
        new.process_number = Some("P9999/2010".into());
        let document = dao.create_document(new).await.unwrap();
        assert_eq!(document.process_number.as_deref(), Some("P9999/2010"));
        assert!(api.rows(PROCESS_COUNTERS).is_empty());
    }

    #[tokio::test]
    async fn insert_failure_reverts_number() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let new = dao.initial_document(217, (&user).into()).await.unwrap();

        api.fail_next(Method::Post, DOCUMENTS);
        assert!(dao.create_document(new.clone()).await.is_err());
        assert_eq!(api.rows(PROCESS_COUNTERS)[0]["NUM_ULTIMO_DOC"], json!(0));

        let document = dao.create_document(new).await.unwrap();
        assert_eq!(
            document.process_number,
            Some(format!("P0001/{}", dates::today().year()))
        );
    }

    #[tokio::test]
    async fn step_failure_deletes_document() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let new = dao.initial_document(217, (&user).into()).await.unwrap();

        api.fail_next(Method::Post, ROUTING_STEPS);
        assert!(dao.create_document(new).await.is_err());
        assert!(api.rows(DOCUMENTS).is_empty());
        assert_eq!(api.rows(PROCESS_COUNTERS)[0]["NUM_ULTIMO_DOC"], json!(0));
    }

    #[tokio::test]
    async fn activation_failure_removes_steps_and_document() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let new = dao.initial_document(217, (&user).into()).await.unwrap();

        api.fail_next(Method::Post, DOCUMENT_STATES);
        assert!(dao.create_document(new).await.is_err());
        assert!(api.rows(DOCUMENTS).is_empty());
        assert!(api.rows(ROUTING_STEPS).is_empty());
        assert_eq!(api.rows(PROCESS_COUNTERS)[0]["NUM_ULTIMO_DOC"], json!(0));
    }

    #[tokio::test]
    async fn route_then_receive_and_route_again() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let document = created(&api, &user).await;

        let flow = dao.initial_flow(217).await.unwrap();
        let audit = dao
            .route_document(&document, &flow, "para a DPq", &NoResolver)
            .await
            .unwrap();
        assert_eq!((audit.status_before, audit.status_after), (1, 10));
        assert_eq!(audit.destination, Destination::user(90));
        assert!(!audit.received);

        let routed = dao.get_document(document.id).await.unwrap();
        assert_eq!(routed.status, 10);
        let step = dao.current_step(document.id).await.unwrap();
        assert_eq!(step.status, RoutingStatus::Delivered);
        assert_eq!(step.flow_id, Some(1));
        assert_eq!(step.concurrency, 1);

        let audit = dao
            .receive_and_route(document.id, "para a câmara", 500, &Destination::user(41))
            .await
            .unwrap();
        assert!(audit.received);
        assert_eq!(audit.step_sequence, 2);
        assert_eq!(audit.destination, Destination::user(41));

        let steps = dao.steps(document.id).await.unwrap();
        let seqs: Vec<_> = steps.iter().map(|s| (s.sequence, s.status)).collect();
        assert_eq!(
            seqs,
            vec![(1, RoutingStatus::Received), (2, RoutingStatus::Delivered)]
        );
        let owner = dao.get_document(document.id).await.unwrap().owner();
        assert_eq!(owner, Some(Destination::user(90)));
        assert_eq!(dao.current_flow(document.id).await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn receive_is_a_noop_on_awaiting_step() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let document = created(&api, &user).await;

        assert!(!dao.receive_document(&document).await.unwrap());
        assert_eq!(dao.steps(document.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn routing_a_delivered_step_is_corruption() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let document = created(&api, &user).await;
        let flow = dao.initial_flow(217).await.unwrap();
        dao.route_document(&document, &flow, "x", &NoResolver).await.unwrap();

        let err = dao
            .route_document(&document, &flow, "x", &NoResolver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SieError::Routing(RoutingError::Corrupted { .. })
        ));
    }

    #[tokio::test]
    async fn query_flow_without_resolver_fails() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let document = created(&api, &user).await;
        let flow = dao.initial_flow(217).await.unwrap();
        dao.route_document(&document, &flow, "x", &NoResolver).await.unwrap();

        let err = dao
            .receive_and_route(document.id, "x", 500, &NoResolver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SieError::Routing(RoutingError::MissingResolver { flow_id: 2 })
        ));
    }

    #[tokio::test]
    async fn missing_or_inactive_flow_is_reported() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let document = created(&api, &user).await;
        let flow = dao.initial_flow(217).await.unwrap();
        dao.route_document(&document, &flow, "x", &NoResolver).await.unwrap();

        let err = dao
            .receive_and_route(document.id, "x", 999, &NoResolver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SieError::NoFlow {
                from_status: 10,
                to_status: 999,
                ..
            }
        ));

        let routed = dao.get_document(document.id).await.unwrap();
        let next: Vec<_> = dao
            .valid_next_flows(&routed)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(next, vec![2]);
    }

    #[tokio::test]
    async fn archived_documents_cannot_be_routed() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let document = created(&api, &user).await;

        dao.archive_document(document.id).await.unwrap();
        let archived = dao.get_document(document.id).await.unwrap();
        assert_eq!(archived.archived_on, Some(dates::today()));
        assert_eq!(
            dao.current_step(document.id).await.unwrap().status,
            RoutingStatus::Received
        );

        let err = dao
            .receive_and_route(document.id, "x", 10, &NoResolver)
            .await
            .unwrap_err();
        assert!(matches!(err, SieError::AlreadyArchived(_)));
    }

    #[tokio::test]
    async fn initial_flow_must_be_unique() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        assert!(matches!(
            dao.initial_flow(300).await,
            Err(SieError::NoInitialFlow { doc_type: 300 })
        ));

        api.seed(
            FLOWS,
            row(json!({"ID_FLUXO": 4, "ID_TIPO_DOC": 217, "SITUACAO_ATUAL": 1, "SITUACAO_FUTURA": 999,
                       "IND_QUERY": "N", "IND_ATIVO": "S"})),
        );
        assert!(matches!(
            dao.initial_flow(217).await,
            Err(SieError::AmbiguousInitialFlow { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn create_and_route_discards_document_on_failure() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let new = dao.initial_document(217, (&user).into()).await.unwrap();

        api.fail_next(Method::Put, ROUTING_STEPS);
        assert!(dao.create_and_route(new.clone(), "x", &NoResolver).await.is_err());
        assert!(api.rows(DOCUMENTS).is_empty());
        assert!(api.rows(ROUTING_STEPS).is_empty());

        let (document, audit) = dao.create_and_route(new, "x", &NoResolver).await.unwrap();
        assert_eq!(audit.status_after, 10);
        assert_eq!(
            document.process_number,
            Some(format!("P0001/{}", dates::today().year()))
        );
    }

    #[tokio::test]
    async fn create_and_route_failure_keeps_counter_for_supplied_number() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let year = dates::today().year();
        let first = created(&api, &user).await;
        assert_eq!(first.process_number, Some(format!("P0001/{year}")));

        let mut new = dao.initial_document(217, (&user).into()).await.unwrap();
        new.process_number = Some("P9999/2010".into());
        api.fail_next(Method::Put, ROUTING_STEPS);
        assert!(dao.create_and_route(new, "x", &NoResolver).await.is_err());
        assert_eq!(api.rows(PROCESS_COUNTERS)[0]["NUM_ULTIMO_DOC"], json!(1));

        let next = created(&api, &user).await;
        assert_eq!(next.process_number, Some(format!("P0002/{year}")));
    }

    #[tokio::test]
    async fn out_of_range_archive_time_is_an_error() {
        let api = seeded();
        let user = user();
        api.seed(
            SUBJECTS,
            row(json!({"ID_ASSUNTO": 9, "DESCR_ASSUNTO": "Eterno", "TEMPO_ARQUIVAMENTO": 999_999_999_999i64})),
        );
        api.seed(
            DOCUMENT_TYPES,
            row(json!({"ID_TIPO_DOC": 218, "IND_NUMERACAO_SUP": "N",
                       "MASCARA_TIPO_DOC": "NNNN/AAAA", "ID_ASSUNTO_PADRAO": 9})),
        );
        let dao = DocumentDao::new(&api, &user);

        let err = dao.initial_document(218, (&user).into()).await.unwrap_err();
        assert!(matches!(
            err,
            SieError::ArchiveDeadlineOutOfRange {
                subject_id: 9,
                days: 999_999_999_999,
            }
        ));
    }

    #[tokio::test]
    async fn out_of_range_flow_deadline_discards_new_document() {
        let api = seeded();
        let user = user();
        api.seed(
            DOCUMENT_TYPES,
            row(json!({"ID_TIPO_DOC": 218, "IND_NUMERACAO_SUP": "N", "MASCARA_TIPO_DOC": "NNNN/AAAA"})),
        );
        api.seed(
            FLOWS,
            row(json!({"ID_FLUXO": 7, "ID_TIPO_DOC": 218, "SITUACAO_ATUAL": 1, "SITUACAO_FUTURA": 10,
                       "TIPO_DESTINO": 20, "ID_DESTINO": 90, "NUM_DIAS": 999_999_999_999i64,
                       "IND_QUERY": "N", "IND_ATIVO": "S"})),
        );
        let dao = DocumentDao::new(&api, &user);
        let new = dao.initial_document(218, (&user).into()).await.unwrap();

        let err = dao.create_and_route(new, "x", &NoResolver).await.unwrap_err();
        assert!(matches!(
            err,
            SieError::Routing(RoutingError::DeadlineOutOfRange { flow_id: 7, .. })
        ));
        assert!(api.rows(DOCUMENTS).is_empty());
        assert_eq!(api.rows(PROCESS_COUNTERS)[0]["NUM_ULTIMO_DOC"], json!(0));
    }

    #[tokio::test]
    async fn remove_and_list_documents() {
        let api = seeded();
        let user = user();
        let dao = DocumentDao::new(&api, &user);
        let a = created(&api, &user).await;
        let _b = created(&api, &user).await;

        let listed = dao.documents_of_type(217, Query::new()).await.unwrap();
        assert_eq!(listed.len(), 2);
        let filtered = dao
            .documents_of_type(217, Query::new().eq("ID_DOCUMENTO", a.id))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        dao.remove_document(&a).await.unwrap();
        assert!(matches!(
            dao.get_document(a.id).await,
            Err(SieError::DocumentNotFound(_))
        ));
        assert!(dao.steps(a.id).await.unwrap().is_empty());
        assert_eq!(dao.remove_steps(a.id).await.unwrap(), 0);
    }
}
