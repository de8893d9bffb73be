use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::state::{ReturnIndicator, RoutingStatus};
use crate::dates::{sie_date, sie_time};

/// Tabela estruturada de prioridades de tramitação.
pub const PRIORITY_TABLE: i64 = 5101;
pub const PRIORITY_NORMAL: i64 = 2;
/// Restrição de tramitação por usuário (`TIPO_DESTINO`/`TIPO_PROPRIETARIO`).
pub const OWNER_TYPE_USER: i64 = 20;

/// Custodiante de um documento ou destino de um passo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub kind: i64,
    pub id: i64,
}

impl Destination {
    pub fn user(id: i64) -> Self {
        Self {
            kind: OWNER_TYPE_USER,
            id,
        }
    }
}

/// Linha de `TRAMITACOES`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingStep {
    #[serde(rename = "ID_TRAMITACAO")]
    pub id: i64,
    #[serde(rename = "ID_DOCUMENTO")]
    pub document_id: i64,
    #[serde(rename = "SEQUENCIA")]
    pub sequence: i64,
    #[serde(rename = "TIPO_ORIGEM", default)]
    pub origin_type: Option<i64>,
    #[serde(rename = "ID_ORIGEM", default)]
    pub origin_id: Option<i64>,
    #[serde(rename = "TIPO_DESTINO", default)]
    pub destination_type: Option<i64>,
    #[serde(rename = "ID_DESTINO", default)]
    pub destination_id: Option<i64>,
    #[serde(rename = "SITUACAO_TRAMIT")]
    pub status: RoutingStatus,
    #[serde(rename = "IND_RETORNO_OBRIG", default)]
    pub return_indicator: Option<ReturnIndicator>,
    #[serde(rename = "ID_FLUXO", default)]
    pub flow_id: Option<i64>,
    #[serde(rename = "DT_ENVIO", default, with = "sie_date")]
    pub sent_on: Option<NaiveDate>,
    #[serde(rename = "DT_VALIDADE", default, with = "sie_date")]
    pub valid_until: Option<NaiveDate>,
    #[serde(rename = "DT_RECEBIMENTO", default, with = "sie_date")]
    pub received_on: Option<NaiveDate>,
    #[serde(rename = "DESPACHO", default)]
    pub dispatch: Option<String>,
    #[serde(rename = "CONCORRENCIA", default)]
    pub concurrency: i64,
}

impl RoutingStep {
    pub fn destination(&self) -> Option<Destination> {
        Some(Destination {
            kind: self.destination_type?,
            id: self.destination_id?,
        })
    }
}

/// Novo passo AWAITING, com origem e destino no custodiante atual.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRoutingStep {
    #[serde(rename = "SEQUENCIA")]
    pub sequence: i64,
    #[serde(rename = "ID_DOCUMENTO")]
    pub document_id: i64,
    #[serde(rename = "TIPO_ORIGEM")]
    pub origin_type: i64,
    #[serde(rename = "ID_ORIGEM")]
    pub origin_id: i64,
    #[serde(rename = "TIPO_DESTINO")]
    pub destination_type: i64,
    #[serde(rename = "ID_DESTINO")]
    pub destination_id: i64,
    #[serde(rename = "DT_ENVIO", with = "sie_date")]
    pub sent_on: Option<NaiveDate>,
    #[serde(rename = "SITUACAO_TRAMIT")]
    pub status: RoutingStatus,
    #[serde(rename = "IND_RETORNO_OBRIG")]
    pub return_indicator: ReturnIndicator,
    #[serde(rename = "DT_ALTERACAO", with = "sie_date")]
    pub changed_on: Option<NaiveDate>,
    #[serde(rename = "HR_ALTERACAO", with = "sie_time")]
    pub changed_at: Option<NaiveTime>,
    #[serde(rename = "PRIORIDADE_TAB")]
    pub priority_table: i64,
    #[serde(rename = "PRIORIDADE_ITEM")]
    pub priority_item: i64,
}

impl NewRoutingStep {
    pub fn awaiting(document_id: i64, sequence: i64, owner: Destination, now: NaiveDateTime) -> Self {
        Self {
            sequence,
            document_id,
            origin_type: owner.kind,
            origin_id: owner.id,
            destination_type: owner.kind,
            destination_id: owner.id,
            sent_on: Some(now.date()),
            status: RoutingStatus::Awaiting,
            return_indicator: ReturnIndicator::No,
            changed_on: Some(now.date()),
            changed_at: Some(now.time()),
            priority_table: PRIORITY_TABLE,
            priority_item: PRIORITY_NORMAL,
        }
    }
}

/// Atualização de um passo despachado.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    #[serde(rename = "ID_TRAMITACAO")]
    pub step_id: i64,
    #[serde(rename = "TIPO_DESTINO")]
    pub destination_type: i64,
    #[serde(rename = "ID_DESTINO")]
    pub destination_id: i64,
    #[serde(rename = "DT_ENVIO", with = "sie_date")]
    pub sent_on: Option<NaiveDate>,
    #[serde(rename = "DT_VALIDADE", with = "sie_date")]
    pub valid_until: Option<NaiveDate>,
    #[serde(rename = "DESPACHO")]
    pub dispatch: String,
    #[serde(rename = "DESPACHO_RTF")]
    pub dispatch_rtf: String,
    #[serde(rename = "SITUACAO_TRAMIT")]
    pub status: RoutingStatus,
    #[serde(rename = "IND_RETORNO_OBRIG")]
    pub return_indicator: ReturnIndicator,
    #[serde(rename = "ID_FLUXO")]
    pub flow_id: i64,
    #[serde(rename = "DT_ALTERACAO", with = "sie_date")]
    pub changed_on: Option<NaiveDate>,
    #[serde(rename = "HR_ALTERACAO", with = "sie_time")]
    pub changed_at: Option<NaiveTime>,
    #[serde(rename = "CONCORRENCIA")]
    pub concurrency: i64,
    #[serde(rename = "ID_USUARIO_INFO")]
    pub informed_by: i64,
    #[serde(rename = "DT_DESPACHO", with = "sie_date")]
    pub dispatched_on: Option<NaiveDate>,
    #[serde(rename = "HR_DESPACHO", with = "sie_time")]
    pub dispatched_at: Option<NaiveTime>,
    #[serde(rename = "ID_APLIC_ACAO", skip_serializing_if = "Option::is_none")]
    pub action_id: Option<i64>,
}

/// Atualização de um passo aberto pelo destino.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reception {
    #[serde(rename = "ID_TRAMITACAO")]
    pub step_id: i64,
    #[serde(rename = "SITUACAO_TRAMIT")]
    pub status: RoutingStatus,
    #[serde(rename = "DT_RECEBIMENTO", with = "sie_date")]
    pub received_on: Option<NaiveDate>,
    #[serde(rename = "HR_RECEBIMENTO", with = "sie_time")]
    pub received_at: Option<NaiveTime>,
    #[serde(skip)]
    pub new_owner: Destination,
}

/// Troca apenas a situação de um passo (arquivamento).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepStatusUpdate {
    #[serde(rename = "ID_TRAMITACAO")]
    pub step_id: i64,
    #[serde(rename = "SITUACAO_TRAMIT")]
    pub status: RoutingStatus,
}

/// Linha de `FLUXOS`: transição permitida para um tipo de documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(rename = "ID_FLUXO")]
    pub id: i64,
    #[serde(rename = "ID_TIPO_DOC")]
    pub doc_type: i64,
    #[serde(rename = "SITUACAO_ATUAL")]
    pub from_status: i64,
    #[serde(rename = "SITUACAO_FUTURA")]
    pub to_status: i64,
    #[serde(rename = "TIPO_DESTINO", default)]
    pub destination_type: Option<i64>,
    #[serde(rename = "ID_DESTINO", default)]
    pub destination_id: Option<i64>,
    #[serde(rename = "NUM_DIAS", default)]
    pub days: Option<i64>,
    #[serde(rename = "IND_QUERY", default)]
    pub query_flag: String,
    #[serde(rename = "IND_ATIVO", default)]
    pub active: Option<String>,
    #[serde(rename = "ID_APLIC_ACAO", default)]
    pub action_id: Option<i64>,
}

impl Flow {
    /// `IND_QUERY = 'S'`: destination comes from an external lookup.
    pub fn destination_resolved_by_query(&self) -> bool {
        self.query_flag.trim() == "S"
    }

    pub fn destination(&self) -> Option<Destination> {
        Some(Destination {
            kind: self.destination_type?,
            id: self.destination_id?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{from_row, to_row};
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 1, 4)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn step_reads_padded_codes_and_blank_dates() {
        let row = json!({
            "ID_TRAMITACAO": 9, "ID_DOCUMENTO": 3, "SEQUENCIA": 2,
            "TIPO_DESTINO": 20, "ID_DESTINO": 44,
            "SITUACAO_TRAMIT": "E ", "IND_RETORNO_OBRIG": "F",
            "DT_ENVIO": "2016-01-04", "DT_RECEBIMENTO": " ", "CONCORRENCIA": 1
        });
        let step: RoutingStep = serde_json::from_value(row).unwrap();
        assert_eq!(step.status, RoutingStatus::Delivered);
        assert_eq!(step.return_indicator, Some(ReturnIndicator::PerFlow));
        assert_eq!(step.received_on, None);
        assert_eq!(step.destination(), Some(Destination::user(44)));
    }

    #[test]
    fn new_step_row_carries_priority_and_owner() {
        let step = NewRoutingStep::awaiting(3, 1, Destination::user(12), now());
        let row = to_row(&step).unwrap();
        assert_eq!(row["SITUACAO_TRAMIT"], json!("T"));
        assert_eq!(row["IND_RETORNO_OBRIG"], json!("N"));
        assert_eq!(row["PRIORIDADE_TAB"], json!(5101));
        assert_eq!(row["PRIORIDADE_ITEM"], json!(2));
        assert_eq!(row["ID_ORIGEM"], row["ID_DESTINO"]);
        assert_eq!(row["DT_ENVIO"], json!("2016-01-04"));
        assert_eq!(row["HR_ALTERACAO"], json!("08:00:00"));
    }

    #[test]
    fn reception_row_omits_new_owner() {
        let reception = Reception {
            step_id: 1,
            status: RoutingStatus::Received,
            received_on: Some(now().date()),
            received_at: Some(now().time()),
            new_owner: Destination::user(5),
        };
        let row = to_row(&reception).unwrap();
        assert_eq!(row.len(), 4);
        assert_eq!(row["SITUACAO_TRAMIT"], json!("R"));
    }

    #[test]
    fn flow_query_flag_is_trimmed() {
        let flow: Flow = from_row(
            json!({
                "ID_FLUXO": 1, "ID_TIPO_DOC": 217, "SITUACAO_ATUAL": 1,
                "SITUACAO_FUTURA": 10, "IND_QUERY": "S  "
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
        .unwrap();
        assert!(flow.destination_resolved_by_query());
        assert_eq!(flow.destination(), None);
    }
}
