use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{Query, SieApi, from_row, to_row};
use crate::dates::sie_date;
use crate::error::Result;

pub const EVALUATIONS: &str = "AVALIACOES_PROJ";
/// Tabela/item de tipo de avaliação "avaliação de projeto".
pub const EVALUATION_TYPE_TABLE: i64 = 6016;
pub const EVALUATION_TYPE_PROJECT: i64 = 1;
/// Tabela estruturada das situações de projeto.
pub const PROJECT_SITUATION_TABLE: i64 = 6011;

/// Período de referência de um relatório: ano e item da tabela de períodos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub year: i32,
    pub table: Option<i64>,
    pub item: Option<i64>,
}

/// Linha de `AVALIACOES_PROJ`, criada quando o docente envia o relatório.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Evaluation {
    #[serde(rename = "ID_AVALIACAO_PROJ")]
    pub id: i64,
    #[serde(rename = "ID_PROJETO")]
    pub project_id: i64,
    #[serde(rename = "ID_DOCUMENTO", default)]
    pub document_id: Option<i64>,
    #[serde(rename = "SITUACAO_ITEM", default)]
    pub situation: Option<i64>,
    /// Nova data de conclusão pedida no relatório.
    #[serde(rename = "DT_CONCLUSAO", default, with = "sie_date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationUpdate {
    #[serde(rename = "ID_AVALIACAO_PROJ")]
    pub id: i64,
    #[serde(rename = "ID_CONTRATO_RH", skip_serializing_if = "Option::is_none")]
    pub evaluator_contract_id: Option<i64>,
    #[serde(rename = "ID_UNIDADE", skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i64>,
    #[serde(rename = "SITUACAO_ITEM", skip_serializing_if = "Option::is_none")]
    pub situation: Option<i64>,
}

/// Linha nova de `AVALIACOES_PROJ`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvaluation {
    #[serde(rename = "ID_PROJETO")]
    pub project_id: i64,
    #[serde(rename = "ID_DOCUMENTO")]
    pub document_id: i64,
    #[serde(rename = "NUM_PROCESSO", skip_serializing_if = "Option::is_none")]
    pub process_number: Option<String>,
    #[serde(rename = "ANO_REF")]
    pub year: i32,
    #[serde(rename = "PERIODO_REF_TAB", skip_serializing_if = "Option::is_none")]
    pub period_table: Option<i64>,
    #[serde(rename = "PERIODO_REF_ITEM", skip_serializing_if = "Option::is_none")]
    pub period_item: Option<i64>,
    #[serde(rename = "TIPO_AVAL_TAB")]
    pub type_table: i64,
    #[serde(rename = "TIPO_AVAL_ITEM")]
    pub type_item: i64,
    #[serde(rename = "SITUACAO_TAB")]
    pub situation_table: i64,
    #[serde(rename = "SITUACAO_ITEM", skip_serializing_if = "Option::is_none")]
    pub situation: Option<i64>,
    #[serde(
        rename = "DT_CONCLUSAO",
        with = "sie_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "ID_CONTRATO_RH")]
    pub evaluator_contract_id: i64,
    #[serde(rename = "ID_UNIDADE")]
    pub unit_id: i64,
    #[serde(rename = "OBS_PRORROGACAO", skip_serializing_if = "Option::is_none")]
    pub renewal_notes: Option<String>,
}

impl NewEvaluation {
    /// Evaluation of `period` for a project, of the project type and in
    /// the project's situation table.
    pub fn for_period(project_id: i64, document_id: i64, period: ReportPeriod) -> Self {
        Self {
            project_id,
            document_id,
            process_number: None,
            year: period.year,
            period_table: period.table,
            period_item: period.item,
            type_table: EVALUATION_TYPE_TABLE,
            type_item: EVALUATION_TYPE_PROJECT,
            situation_table: PROJECT_SITUATION_TABLE,
            situation: None,
            end_date: None,
            evaluator_contract_id: 0,
            unit_id: 0,
            renewal_notes: None,
        }
    }
}

pub struct EvaluationDao<'a, A: SieApi> {
    api: &'a A,
}

impl<'a, A: SieApi> EvaluationDao<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn by_document(&self, document_id: i64) -> Result<Option<Evaluation>> {
        let query = Query::new().eq("ID_DOCUMENTO", document_id);
        match self.api.get_optional(EVALUATIONS, &query).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    /// The evaluation already sent for `project_id` in `period`, if any.
    pub async fn for_period(&self, project_id: i64, period: ReportPeriod) -> Result<Option<Evaluation>> {
        let mut query = Query::new()
            .eq("ID_PROJETO", project_id)
            .eq("ANO_REF", period.year);
        if let Some(table) = period.table {
            query = query.eq("PERIODO_REF_TAB", table);
        }
        if let Some(item) = period.item {
            query = query.eq("PERIODO_REF_ITEM", item);
        }
        match self.api.get_optional(EVALUATIONS, &query).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Inserts `new` and reads the stored row back.
    pub async fn create(&self, new: &NewEvaluation) -> Result<Evaluation> {
        let id = self.api.post(EVALUATIONS, &to_row(new)?).await?;
        let row = self
            .api
            .get_single(EVALUATIONS, &Query::new().eq("ID_AVALIACAO_PROJ", id))
            .await?;
        info!(evaluation = id, project = new.project_id, year = new.year, "evaluation created");
        Ok(from_row(row)?)
    }

    pub async fn update(&self, update: &EvaluationUpdate) -> Result<bool> {
        let affected = self.api.put(EVALUATIONS, &to_row(update)?).await?;
        Ok(affected == 1)
    }
}
