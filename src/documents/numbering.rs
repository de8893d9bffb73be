//! Tipos de documento, assuntos e numeração de processos.
//!
//! Cada tipo de documento tem uma máscara (`MASCARA_TIPO_DOC`) e um contador
//! anual em `NUMEROS_TIPO_DOC`. Um tipo pode delegar a numeração ao tipo
//! superior (`IND_NUMERACAO_SUP = 'S'`).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{Query, SieApi, from_row, to_row};
use crate::dates::{self, sie_date, sie_time};
use crate::error::{Result, SieError};

pub const DOCUMENT_TYPES: &str = "TIPOS_DOCUMENTOS";
pub const SUBJECTS: &str = "ASSUNTOS";
pub const PROCESS_COUNTERS: &str = "NUMEROS_TIPO_DOC";

const DELEGATES_TO_PARENT: &str = "S";
const LEGACY_PROJECT_MASK: &str = "pNNNN/AAAA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentType {
    #[serde(rename = "ID_TIPO_DOC")]
    pub id: i64,
    #[serde(rename = "IND_NUMERACAO_SUP", default)]
    pub numbering_flag: Option<String>,
    #[serde(rename = "ID_TIPO_DOC_SUP", default)]
    pub parent_id: Option<i64>,
    #[serde(rename = "MASCARA_TIPO_DOC", default)]
    pub mask: Option<String>,
    #[serde(rename = "ID_ASSUNTO_PADRAO", default)]
    pub default_subject: Option<i64>,
}

impl DocumentType {
    pub fn delegates_numbering(&self) -> bool {
        self.numbering_flag.as_deref().map(str::trim) == Some(DELEGATES_TO_PARENT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "ID_ASSUNTO")]
    pub id: i64,
    #[serde(rename = "DESCR_ASSUNTO", default)]
    pub description: Option<String>,
    /// Dias até o arquivamento.
    #[serde(rename = "TEMPO_ARQUIVAMENTO", default)]
    pub archive_days: Option<i64>,
}

pub struct DocumentTypeDao<'a, A: SieApi> {
    api: &'a A,
}

impl<'a, A: SieApi> DocumentTypeDao<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn parameters(&self, doc_type: i64) -> Result<DocumentType> {
        let query = Query::new().eq("ID_TIPO_DOC", doc_type);
        match self.api.get_optional(DOCUMENT_TYPES, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("document type", doc_type)),
        }
    }

    /// Type that owns the process counter for `doc_type`.
    pub async fn counter_owner(&self, doc_type: i64) -> Result<i64> {
        let mut seen = HashSet::new();
        let mut current = self.parameters(doc_type).await?;
        while current.delegates_numbering() {
            if !seen.insert(current.id) {
                return Err(SieError::NumberingCycle(doc_type));
            }
            let parent = current
                .parent_id
                .ok_or_else(|| SieError::not_found("parent document type", current.id))?;
            current = self.parameters(parent).await?;
        }
        Ok(current.id)
    }

    /// Máscara sem os espaços que o SIE acrescenta no fim.
    pub async fn mask(&self, doc_type: i64) -> Result<String> {
        let params = self.parameters(doc_type).await?;
        Ok(params.mask.unwrap_or_default().trim().to_string())
    }
}

pub struct SubjectDao<'a, A: SieApi> {
    api: &'a A,
}

impl<'a, A: SieApi> SubjectDao<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Subject>> {
        let query = Query::new().eq("ID_ASSUNTO", id);
        match self.api.get_optional(SUBJECTS, &query).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MaskPart {
    Literal(String),
    Counter(usize),
    Year(usize),
}

/// Parsed `MASCARA_TIPO_DOC`: one run of `N` is the zero-padded counter,
/// one run of `A` the year, everything else is copied as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMask {
    parts: Vec<MaskPart>,
}

impl ProcessMask {
    pub fn parse(mask: &str) -> Result<Self> {
        let mask = mask.trim();
        let unsupported = || SieError::UnsupportedMask(mask.to_string());

        let mut parts: Vec<MaskPart> = Vec::new();
        let mut chars = mask.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                'N' | 'A' => {
                    let mut width = 1;
                    while chars.peek() == Some(&c) {
                        chars.next();
                        width += 1;
                    }
                    let part = if c == 'N' {
                        MaskPart::Counter(width)
                    } else {
                        MaskPart::Year(width)
                    };
                    let duplicated = parts
                        .iter()
                        .any(|p| std::mem::discriminant(p) == std::mem::discriminant(&part));
                    if duplicated {
                        return Err(unsupported());
                    }
                    parts.push(part);
                }
                other => match parts.last_mut() {
                    Some(MaskPart::Literal(text)) => text.push(other),
                    _ => parts.push(MaskPart::Literal(other.to_string())),
                },
            }
        }

        if !parts.iter().any(|p| matches!(p, MaskPart::Counter(_))) {
            return Err(unsupported());
        }

        // Legacy research projects are numbered "P0001/2016".
        if mask == LEGACY_PROJECT_MASK
            && let Some(MaskPart::Literal(prefix)) = parts.first_mut()
        {
            *prefix = prefix.to_uppercase();
        }

        Ok(Self { parts })
    }

    pub fn render(&self, number: i64, year: i32) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                MaskPart::Literal(text) => out.push_str(text),
                MaskPart::Counter(width) => out.push_str(&format!("{number:0width$}")),
                MaskPart::Year(width) => {
                    let year = year.to_string();
                    let start = year.len().saturating_sub(*width);
                    out.push_str(&year[start..]);
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ProcessCounter {
    #[serde(rename = "ID_NUMERO_TIPO_DOC")]
    id: i64,
    #[serde(rename = "NUM_ULTIMO_DOC")]
    last_number: i64,
}

#[derive(Debug, Serialize)]
struct NewProcessCounter {
    #[serde(rename = "ID_TIPO_DOC")]
    doc_type: i64,
    #[serde(rename = "ANO_TIPO_DOC")]
    year: i32,
    #[serde(rename = "IND_DEFAULT")]
    default_flag: &'static str,
    #[serde(rename = "NUM_ULTIMO_DOC")]
    last_number: i64,
}

#[derive(Debug, Serialize)]
struct CounterUpdate {
    #[serde(rename = "ID_NUMERO_TIPO_DOC")]
    id: i64,
    #[serde(rename = "NUM_ULTIMO_DOC")]
    last_number: i64,
    #[serde(rename = "DT_ALTERACAO", with = "sie_date")]
    changed_on: Option<chrono::NaiveDate>,
    #[serde(rename = "HR_ALTERACAO", with = "sie_time")]
    changed_at: Option<chrono::NaiveTime>,
}

/// Gera e reverte números de processo de um tipo de documento em um ano.
pub struct ProcessNumberDao<'a, A: SieApi> {
    api: &'a A,
    doc_type: i64,
    year: i32,
}

impl<'a, A: SieApi> ProcessNumberDao<'a, A> {
    pub fn new(api: &'a A, doc_type: i64, year: i32) -> Self {
        Self {
            api,
            doc_type,
            year,
        }
    }

    async fn counter_query(&self) -> Result<Query> {
        let owner = DocumentTypeDao::new(self.api).counter_owner(self.doc_type).await?;
        Ok(Query::new()
            .eq("ID_TIPO_DOC", owner)
            .eq("ANO_TIPO_DOC", self.year))
    }

    async fn counter(&self) -> Result<Option<ProcessCounter>> {
        let query = self
            .counter_query()
            .await?
            .fields(&["ID_NUMERO_TIPO_DOC", "NUM_ULTIMO_DOC"]);
        match self.api.get_optional(PROCESS_COUNTERS, &query).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Next process number, formatted with the type's mask.
    pub async fn generate(&self) -> Result<String> {
        let mask = DocumentTypeDao::new(self.api).mask(self.doc_type).await?;
        let mask = ProcessMask::parse(&mask)?;

        let number = match self.counter().await? {
            Some(counter) => {
                let next = counter.last_number + 1;
                self.set_last_number(counter.id, next).await?;
                next
            }
            None => {
                self.reset_default_flags().await?;
                self.create_counter().await?
            }
        };

        let rendered = mask.render(number, self.year);
        info!(doc_type = self.doc_type, number = %rendered, "process number generated");
        Ok(rendered)
    }

    /// Undo the last [`generate`](Self::generate).
    pub async fn revert(&self) -> Result<()> {
        let counter = self.counter().await?.ok_or(SieError::NoProcessCounter {
            doc_type: self.doc_type,
            year: self.year,
        })?;
        self.set_last_number(counter.id, counter.last_number - 1).await?;
        info!(doc_type = self.doc_type, "process number reverted");
        Ok(())
    }

    /// Marks every counter of the owning type as non-default.
    pub async fn reset_default_flags(&self) -> Result<()> {
        let owner = DocumentTypeDao::new(self.api).counter_owner(self.doc_type).await?;
        let query = Query::new()
            .eq("ID_TIPO_DOC", owner)
            .fields(&["ID_NUMERO_TIPO_DOC"]);
        for row in self.api.get_all(PROCESS_COUNTERS, &query).await? {
            let Some(id) = row.get("ID_NUMERO_TIPO_DOC").cloned() else {
                continue;
            };
            let mut update = crate::api::Row::new();
            update.insert("ID_NUMERO_TIPO_DOC".into(), id);
            update.insert("IND_DEFAULT".into(), "N".into());
            self.api.put(PROCESS_COUNTERS, &update).await?;
        }
        Ok(())
    }

    /// Creates this year's counter already holding 1.
    pub async fn create_counter(&self) -> Result<i64> {
        let owner = DocumentTypeDao::new(self.api).counter_owner(self.doc_type).await?;
        let counter = NewProcessCounter {
            doc_type: owner,
            year: self.year,
            default_flag: "S",
            last_number: 1,
        };
        debug!(doc_type = owner, year = self.year, "creating process counter");
        self.api.post(PROCESS_COUNTERS, &to_row(&counter)?).await?;
        Ok(counter.last_number)
    }

    async fn set_last_number(&self, counter_id: i64, value: i64) -> Result<()> {
        let now = dates::now();
        let update = CounterUpdate {
            id: counter_id,
            last_number: value,
            changed_on: Some(now.date()),
            changed_at: Some(now.time()),
        };
        self.api.put(PROCESS_COUNTERS, &to_row(&update)?).await?;
        Ok(())
    }
}
