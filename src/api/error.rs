//! Falhas ao ler ou gravar tabelas do SIE.
//!
//! A API responde 204 quando um filtro não casa com nenhuma linha; isso vira
//! [`ApiError::NoContent`], que os DAOs tratam como "ausente" quando faz
//! sentido. Qualquer outra resposta fora de 2xx guarda a tabela consultada.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Nenhuma linha casou com o filtro.
    #[error("no rows in {path} match the filter")]
    NoContent { path: String },

    /// SIE refused the request, e.g. a revoked `API_KEY` or a bad column.
    #[error("SIE refused the request on {path} (HTTP {status}): {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("could not reach the SIE API: {0}")]
    Network(#[from] reqwest::Error),

    /// A row or envelope did not have the expected columns or types.
    #[error("malformed SIE row: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn no_content(path: &str) -> Self {
        ApiError::NoContent {
            path: path.to_string(),
        }
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, ApiError::NoContent { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_names_the_table() {
        let err = ApiError::no_content("TRAMITACOES");
        assert_eq!(err.to_string(), "no rows in TRAMITACOES match the filter");
        assert!(err.is_no_content());
    }

    #[test]
    fn refused_request_names_table_and_status() {
        let err = ApiError::Status {
            path: "PROJETOS".into(),
            status: 403,
            message: "ID_PROJETO is read-only".into(),
        };
        assert_eq!(
            err.to_string(),
            "SIE refused the request on PROJETOS (HTTP 403): ID_PROJETO is read-only"
        );
        assert!(!err.is_no_content());
    }

    #[test]
    fn malformed_rows_are_not_empty_results() {
        let err = ApiError::Decode("missing field `ID_DOCUMENTO`".into());
        assert!(err.to_string().starts_with("malformed SIE row"));
        assert!(!err.is_no_content());
    }
}
