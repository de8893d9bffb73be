use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::SessionUser;
use crate::dates::{sie_date, sie_time};
use crate::routing::{Destination, OWNER_TYPE_USER};

/// Situação de todo documento recém-criado.
pub const INITIAL_STATUS: i64 = 1;
/// Procedência/interessado do tipo servidor.
pub const PARTY_STAFF: &str = "S";
pub const FLAG_NO: &str = "N";

/// Linha de `DOCUMENTOS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "ID_DOCUMENTO")]
    pub id: i64,
    #[serde(rename = "ID_TIPO_DOC")]
    pub doc_type: i64,
    #[serde(rename = "NUM_PROCESSO", default)]
    pub process_number: Option<String>,
    #[serde(rename = "SITUACAO_ATUAL")]
    pub status: i64,
    #[serde(rename = "TIPO_PROPRIETARIO", default)]
    pub owner_type: Option<i64>,
    #[serde(rename = "ID_PROPRIETARIO", default)]
    pub owner_id: Option<i64>,
    #[serde(rename = "ID_CRIADOR", default)]
    pub creator_id: Option<i64>,
    #[serde(rename = "ID_ASSUNTO", default)]
    pub subject_id: Option<i64>,
    #[serde(rename = "DT_LIMITE_ARQ", default, with = "sie_date")]
    pub archive_deadline: Option<NaiveDate>,
    #[serde(rename = "DT_ARQUIVAMENTO", default, with = "sie_date")]
    pub archived_on: Option<NaiveDate>,
}

impl Document {
    pub fn owner(&self) -> Option<Destination> {
        Some(Destination {
            kind: self.owner_type?,
            id: self.owner_id?,
        })
    }

    pub fn is_archived(&self) -> bool {
        self.archived_on.is_some()
    }
}

/// Who a new document belongs to: the owning user and the HR contract
/// recorded as provenance and interested party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentOwner {
    pub user_id: i64,
    pub hr_contract_id: i64,
}

impl From<&SessionUser> for DocumentOwner {
    fn from(user: &SessionUser) -> Self {
        Self {
            user_id: user.user_id,
            hr_contract_id: user.hr_contract_id,
        }
    }
}

/// Documento a inserir em `DOCUMENTOS`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDocument {
    #[serde(rename = "ID_TIPO_DOC")]
    pub doc_type: i64,
    #[serde(rename = "NUM_PROCESSO", skip_serializing_if = "Option::is_none")]
    pub process_number: Option<String>,
    #[serde(rename = "ID_PROCEDENCIA")]
    pub provenance_id: i64,
    #[serde(rename = "TIPO_PROCEDENCIA")]
    pub provenance_type: String,
    #[serde(rename = "ID_INTERESSADO")]
    pub interested_id: i64,
    #[serde(rename = "TIPO_INTERESSADO")]
    pub interested_type: String,
    #[serde(rename = "ID_PROPRIETARIO")]
    pub owner_id: i64,
    #[serde(rename = "TIPO_PROPRIETARIO")]
    pub owner_type: i64,
    #[serde(rename = "ID_CRIADOR")]
    pub creator_id: i64,
    #[serde(rename = "SITUACAO_ATUAL")]
    pub status: i64,
    #[serde(rename = "DT_CRIACAO", with = "sie_date")]
    pub created_on: Option<NaiveDate>,
    #[serde(rename = "HR_CRIACAO", with = "sie_time")]
    pub created_at: Option<NaiveTime>,
    #[serde(rename = "IND_ELIMINADO")]
    pub eliminated: String,
    #[serde(rename = "IND_AGENDAMENTO")]
    pub scheduled: String,
    #[serde(rename = "IND_RESERVADO")]
    pub reserved: String,
    #[serde(rename = "IND_EXTRAVIADO")]
    pub lost: String,
    #[serde(rename = "TEMPO_ESTIMADO")]
    pub estimated_time: i64,
    #[serde(rename = "ID_ASSUNTO", skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(rename = "RESUMO_ASSUNTO", skip_serializing_if = "Option::is_none")]
    pub subject_summary: Option<String>,
    #[serde(rename = "DT_LIMITE_ARQ", with = "sie_date")]
    pub archive_deadline: Option<NaiveDate>,
}

impl NewDocument {
    /// Template with the fixed indicators every new document carries.
    pub fn template(doc_type: i64, owner: DocumentOwner, creator_id: i64, now: NaiveDateTime) -> Self {
        Self {
            doc_type,
            process_number: None,
            provenance_id: owner.hr_contract_id,
            provenance_type: PARTY_STAFF.to_string(),
            interested_id: owner.hr_contract_id,
            interested_type: PARTY_STAFF.to_string(),
            owner_id: owner.user_id,
            owner_type: OWNER_TYPE_USER,
            creator_id,
            status: INITIAL_STATUS,
            created_on: Some(now.date()),
            created_at: Some(now.time()),
            eliminated: FLAG_NO.to_string(),
            scheduled: FLAG_NO.to_string(),
            reserved: FLAG_NO.to_string(),
            lost: FLAG_NO.to_string(),
            estimated_time: 1,
            subject_id: None,
            subject_summary: None,
            archive_deadline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StatusUpdate {
    #[serde(rename = "ID_DOCUMENTO")]
    pub id: i64,
    #[serde(rename = "SITUACAO_ATUAL")]
    pub status: i64,
    #[serde(rename = "DT_ALTERACAO", with = "sie_date")]
    pub changed_on: Option<NaiveDate>,
    #[serde(rename = "HR_ALTERACAO", with = "sie_time")]
    pub changed_at: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OwnerUpdate {
    #[serde(rename = "ID_DOCUMENTO")]
    pub id: i64,
    #[serde(rename = "TIPO_PROPRIETARIO")]
    pub owner_type: i64,
    #[serde(rename = "ID_PROPRIETARIO")]
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ArchiveUpdate {
    #[serde(rename = "ID_DOCUMENTO")]
    pub id: i64,
    #[serde(rename = "DT_ARQUIVAMENTO", with = "sie_date")]
    pub archived_on: Option<NaiveDate>,
}

/// Linha de `ESTADOS_DOCUMENTOS` que torna o documento visível nas caixas postais.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Activation {
    #[serde(rename = "ID_DOCUMENTO")]
    pub document_id: i64,
    #[serde(rename = "COD_SITUACAO_TAB")]
    pub situation_table: i64,
    #[serde(rename = "COD_SITUACAO_ITEM")]
    pub situation_item: i64,
}
