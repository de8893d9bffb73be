pub mod client;
pub mod error;
pub mod memory;
pub mod types;

pub use client::HttpSieApi;
pub use error::ApiError;
pub use memory::{InMemorySie, Method};
pub use types::{MAX_ROWS, Query, Row, Sort, from_row, from_rows, to_row};

/// Acesso genérico às tabelas e views do SIE.
///
/// `get` sinaliza resultado vazio com [`ApiError::NoContent`]; as variantes
/// `get_optional` e `get_all` tratam esse caso como ausência de linhas.
#[allow(async_fn_in_trait)]
pub trait SieApi {
    async fn get(&self, path: &str, query: &Query) -> Result<Vec<Row>, ApiError>;

    /// Insere uma linha e retorna o id gerado.
    async fn post(&self, path: &str, row: &Row) -> Result<i64, ApiError>;

    /// Atualiza pela chave primária contida em `row`; retorna as linhas afetadas.
    async fn put(&self, path: &str, row: &Row) -> Result<u64, ApiError>;

    async fn delete(&self, path: &str, query: &Query) -> Result<u64, ApiError>;

    async fn get_single(&self, path: &str, query: &Query) -> Result<Row, ApiError> {
        self.get(path, query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::no_content(path))
    }

    async fn get_optional(&self, path: &str, query: &Query) -> Result<Option<Row>, ApiError> {
        match self.get_single(path, query).await {
            Ok(row) => Ok(Some(row)),
            Err(e) if e.is_no_content() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_all(&self, path: &str, query: &Query) -> Result<Vec<Row>, ApiError> {
        match self.get(path, query).await {
            Ok(rows) => Ok(rows),
            Err(e) if e.is_no_content() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
