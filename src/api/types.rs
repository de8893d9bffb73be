//! Tipos de dados trocados com a API do SIE.
//!
//! Uma linha de tabela ou view é um [`Row`] (mapa JSON coluna → valor).
//! Consultas são montadas com [`Query`], que conhece as chaves reservadas
//! da API (`LMIN`, `LMAX`, `ORDERBY`, `SORT` e o sufixo `_SET`).

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

/// Uma linha de tabela/view, com os nomes de coluna do SIE.
pub type Row = serde_json::Map<String, Value>;

pub const LMIN: &str = "LMIN";
pub const LMAX: &str = "LMAX";
pub const ORDERBY: &str = "ORDERBY";
pub const SORT: &str = "SORT";
/// Sufixo de coluna que transforma o filtro em "pertence a".
pub const SET_SUFFIX: &str = "_SET";

/// Janela usada pelas listagens que querem "todas" as linhas.
pub const MAX_ROWS: i64 = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Asc => "ASC",
            Sort::Desc => "DESC",
        }
    }
}

/// Parâmetros de uma consulta GET/DELETE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: BTreeMap<String, Value>,
    fields: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filtro de igualdade em uma coluna.
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.params.insert(column.to_string(), value.into());
        self
    }

    /// Filtro `column IN (values)`, enviado como `<COLUMN>_SET`.
    pub fn one_of<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let list = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        self.params
            .insert(format!("{column}{SET_SUFFIX}"), Value::Array(list));
        self
    }

    pub fn order_by(mut self, column: &str, sort: Sort) -> Self {
        self.params.insert(ORDERBY.to_string(), column.into());
        self.params.insert(SORT.to_string(), sort.as_str().into());
        self
    }

    pub fn limits(mut self, lmin: i64, lmax: i64) -> Self {
        self.params.insert(LMIN.to_string(), lmin.into());
        self.params.insert(LMAX.to_string(), lmax.into());
        self
    }

    /// Restringe as colunas retornadas.
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Acrescenta todos os filtros de `other`, sobrescrevendo chaves repetidas.
    pub fn merge(mut self, other: Query) -> Self {
        self.params.extend(other.params);
        if !other.fields.is_empty() {
            self.fields = other.fields;
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn field_list(&self) -> &[String] {
        &self.fields
    }

    /// Pares chave/valor no formato de query string da API.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .filter_map(|(k, v)| param_value(v).map(|s| (k.clone(), s)))
            .collect();
        if !self.fields.is_empty() {
            pairs.push(("FIELDS".to_string(), self.fields.join(",")));
        }
        pairs
    }
}

/// Converte um valor JSON para o texto enviado à API. `null` não é enviado.
pub fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "S" } else { "N" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(param_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Pares de formulário para POST/PUT.
pub fn row_to_pairs(row: &Row) -> Vec<(String, String)> {
    row.iter()
        .filter_map(|(k, v)| param_value(v).map(|s| (k.clone(), s)))
        .collect()
}

/// Desserializa uma linha em um tipo de domínio.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| ApiError::Decode(e.to_string()))
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, ApiError> {
    rows.into_iter().map(from_row).collect()
}

/// Serializa um tipo de domínio em uma linha.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, ApiError> {
    match serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))? {
        Value::Object(row) => Ok(row),
        other => Err(ApiError::Decode(format!("expected an object, got {other}"))),
    }
}

/// Corpo de resposta de um GET.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetEnvelope {
    #[serde(default)]
    pub content: Vec<Row>,
}

/// Corpo de resposta de um POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEnvelope {
    #[serde(rename = "insertId")]
    pub insert_id: i64,
}

/// Corpo de resposta de PUT e DELETE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectedEnvelope {
    #[serde(rename = "affectedRows")]
    pub affected_rows: u64,
}
