//! Implementação em memória de [`SieApi`].
//!
//! Guarda cada tabela/view como uma lista de linhas e reproduz a semântica
//! de consulta da API remota: filtros de igualdade, `_SET`, `ORDERBY`/`SORT`,
//! janela `LMIN`/`LMAX` e projeção de colunas. Usada nos testes e no comando
//! `demo`. Falhas podem ser injetadas por método/tabela para exercitar os
//! caminhos de compensação.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use super::SieApi;
use super::error::ApiError;
use super::types::{LMAX, LMIN, ORDERBY, Query, Row, SET_SUFFIX, SORT};

/// Chave primária das tabelas em que este crate escreve.
const PRIMARY_KEYS: &[(&str, &str)] = &[
    ("DOCUMENTOS", "ID_DOCUMENTO"),
    ("TRAMITACOES", "ID_TRAMITACAO"),
    ("FLUXOS", "ID_FLUXO"),
    ("ESTADOS_DOCUMENTOS", "ID_ESTADO_DOCUMENTO"),
    ("TIPOS_DOCUMENTOS", "ID_TIPO_DOC"),
    ("NUMEROS_TIPO_DOC", "ID_NUMERO_TIPO_DOC"),
    ("ASSUNTOS", "ID_ASSUNTO"),
    ("PROJETOS", "ID_PROJETO"),
    ("AVALIACOES_PROJ", "ID_AVALIACAO_PROJ"),
    ("CANDIDATOS_BOLSISTA", "ID_CANDIDATOS_BOLSISTA"),
    ("ARQUIVOS_PROJ", "ID_ARQUIVO_PROJ"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

#[derive(Debug, Default)]
struct Store {
    tables: HashMap<String, Table>,
    faults: HashSet<(Method, String)>,
    calls: Vec<(Method, String)>,
}

#[derive(Debug, Default)]
pub struct InMemorySie {
    store: Mutex<Store>,
}

fn primary_key(path: &str) -> Option<&'static str> {
    PRIMARY_KEYS
        .iter()
        .find(|(table, _)| *table == path)
        .map(|(_, pk)| *pk)
}

/// Compara valores como a API compara parâmetros: pelo texto, sem espaços.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (as_text(a), as_text(b)) {
        (Some(x), Some(y)) => x == y,
        (None, None) => true,
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => {
            let x = a.and_then(as_text).unwrap_or_default();
            let y = b.and_then(as_text).unwrap_or_default();
            x.cmp(&y)
        }
    }
}

fn matches(row: &Row, query: &Query) -> bool {
    query.params().iter().all(|(key, expected)| {
        if [LMIN, LMAX, ORDERBY, SORT].contains(&key.as_str()) {
            return true;
        }
        if let Some(column) = key.strip_suffix(SET_SUFFIX) {
            let actual = row.get(column).unwrap_or(&Value::Null);
            return match expected {
                Value::Array(options) => options.iter().any(|o| loose_eq(actual, o)),
                single => loose_eq(actual, single),
            };
        }
        loose_eq(row.get(key).unwrap_or(&Value::Null), expected)
    })
}

fn window(query: &Query) -> (usize, Option<usize>) {
    let lmin = query
        .get(LMIN)
        .and_then(Value::as_i64)
        .unwrap_or(0)
        .max(0) as usize;
    let lmax = query.get(LMAX).and_then(Value::as_i64).map(|v| v.max(0) as usize);
    (lmin, lmax)
}

impl InMemorySie {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insere uma linha diretamente (sem passar pelas falhas injetadas).
    /// Retorna a chave primária da linha, gerada se ausente.
    pub fn seed(&self, path: &str, row: Row) -> i64 {
        let mut store = self.lock();
        Self::insert(&mut store, path, row)
    }

    /// Cópia das linhas atuais de uma tabela.
    pub fn rows(&self, path: &str) -> Vec<Row> {
        self.lock()
            .tables
            .get(path)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Faz a próxima chamada `method` em `path` falhar com HTTP 500.
    pub fn fail_next(&self, method: Method, path: &str) {
        self.lock().faults.insert((method, path.to_string()));
    }

    /// Chamadas recebidas desde a criação ou o último [`clear_calls`](Self::clear_calls), em ordem.
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn insert(store: &mut Store, path: &str, mut row: Row) -> i64 {
        let table = store.tables.entry(path.to_string()).or_default();
        let pk = primary_key(path).unwrap_or("ID");
        let id = match row.get(pk).and_then(Value::as_i64) {
            Some(id) => id,
            None => {
                let id = table.next_id + 1;
                row.insert(pk.to_string(), Value::from(id));
                id
            }
        };
        table.next_id = table.next_id.max(id);
        table.rows.push(row);
        id
    }

    fn enter(&self, method: Method, path: &str) -> Result<std::sync::MutexGuard<'_, Store>, ApiError> {
        let mut store = self.lock();
        store.calls.push((method, path.to_string()));
        if store.faults.remove(&(method, path.to_string())) {
            return Err(ApiError::Status {
                path: path.to_string(),
                status: 500,
                message: format!("injected failure on {method:?} {path}"),
            });
        }
        Ok(store)
    }
}

impl SieApi for InMemorySie {
    async fn get(&self, path: &str, query: &Query) -> Result<Vec<Row>, ApiError> {
        let store = self.enter(Method::Get, path)?;
        let mut rows: Vec<Row> = store
            .tables
            .get(path)
            .map(|t| t.rows.iter().filter(|r| matches(r, query)).cloned().collect())
            .unwrap_or_default();

        if let Some(column) = query.get(ORDERBY).and_then(Value::as_str) {
            let descending = query.get(SORT).and_then(Value::as_str) == Some("DESC");
            rows.sort_by(|a, b| {
                let ord = compare(a.get(column), b.get(column));
                if descending { ord.reverse() } else { ord }
            });
        }

        let (lmin, lmax) = window(query);
        let take = lmax.map(|max| max.saturating_sub(lmin)).unwrap_or(usize::MAX);
        let fields = query.field_list();
        let rows: Vec<Row> = rows
            .into_iter()
            .skip(lmin)
            .take(take)
            .map(|row| {
                if fields.is_empty() {
                    row
                } else {
                    row.into_iter().filter(|(k, _)| fields.contains(k)).collect()
                }
            })
            .collect();

        if rows.is_empty() {
            return Err(ApiError::no_content(path));
        }
        Ok(rows)
    }

    async fn post(&self, path: &str, row: &Row) -> Result<i64, ApiError> {
        let mut store = self.enter(Method::Post, path)?;
        Ok(Self::insert(&mut store, path, row.clone()))
    }

    async fn put(&self, path: &str, row: &Row) -> Result<u64, ApiError> {
        let mut store = self.enter(Method::Put, path)?;
        let pk = primary_key(path).ok_or_else(|| ApiError::Status {
            path: path.to_string(),
            status: 400,
            message: format!("{path} does not accept updates"),
        })?;
        let key = row.get(pk).cloned().ok_or_else(|| ApiError::Status {
            path: path.to_string(),
            status: 400,
            message: format!("missing {pk} for update on {path}"),
        })?;

        let Some(table) = store.tables.get_mut(path) else {
            return Ok(0);
        };
        let mut affected = 0;
        for existing in table
            .rows
            .iter_mut()
            .filter(|r| loose_eq(r.get(pk).unwrap_or(&Value::Null), &key))
        {
            for (column, value) in row {
                existing.insert(column.clone(), value.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, path: &str, query: &Query) -> Result<u64, ApiError> {
        let mut store = self.enter(Method::Delete, path)?;
        let Some(table) = store.tables.get_mut(path) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|r| !matches(r, query));
        Ok((before - table.rows.len()) as u64)
    }
}
