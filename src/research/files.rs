use serde::{Deserialize, Serialize};

use crate::api::{Query, SieApi, from_row, to_row};
use crate::error::{Result, SieError};

pub const PROJECT_FILES: &str = "ARQUIVOS_PROJ";

/// Itens de tipo de arquivo para pareceres de câmara.
pub const OPINION_PROJECT_REGISTRATION: i64 = 22;
pub const OPINION_TEACHING_REPORT: i64 = 23;
pub const OPINION_STUDY_PLAN: i64 = 24;

/// Linha de `ARQUIVOS_PROJ`, sem o conteúdo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectFile {
    #[serde(rename = "ID_ARQUIVO_PROJ")]
    pub id: i64,
    #[serde(rename = "ID_PROJETO", default)]
    pub project_id: Option<i64>,
    #[serde(rename = "ID_AVALIACAO_PROJ", default)]
    pub evaluation_id: Option<i64>,
    #[serde(rename = "TIPO_ARQUIVO_ITEM", default)]
    pub file_type: Option<i64>,
    #[serde(rename = "NOME_ARQUIVO", default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct EvaluationLink {
    #[serde(rename = "ID_ARQUIVO_PROJ")]
    id: i64,
    #[serde(rename = "ID_AVALIACAO_PROJ")]
    evaluation_id: i64,
}

pub struct ProjectFileDao<'a, A: SieApi> {
    api: &'a A,
}

impl<'a, A: SieApi> ProjectFileDao<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn get(&self, id: i64) -> Result<ProjectFile> {
        let query = Query::new()
            .eq("ID_ARQUIVO_PROJ", id)
            .fields(&[
                "ID_ARQUIVO_PROJ",
                "ID_PROJETO",
                "ID_AVALIACAO_PROJ",
                "TIPO_ARQUIVO_ITEM",
                "NOME_ARQUIVO",
            ]);
        match self.api.get_optional(PROJECT_FILES, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("project file", id)),
        }
    }

    /// Links an opinion file to a project evaluation.
    pub async fn attach_to_evaluation(&self, file_id: i64, evaluation_id: i64) -> Result<bool> {
        let link = EvaluationLink {
            id: file_id,
            evaluation_id,
        };
        let affected = self.api.put(PROJECT_FILES, &to_row(&link)?).await?;
        Ok(affected == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemorySie;
    use serde_json::json;

    #[tokio::test]
    async fn attach_sets_evaluation() {
        let api = InMemorySie::new();
        let id = api.seed(
            PROJECT_FILES,
            json!({"ID_PROJETO": 3, "TIPO_ARQUIVO_ITEM": OPINION_TEACHING_REPORT,
                   "NOME_ARQUIVO": "parecer.pdf", "CONTEUDO_ARQUIVO": "..."})
            .as_object()
            .cloned()
            .unwrap(),
        );
        let files = ProjectFileDao::new(&api);

        assert!(files.attach_to_evaluation(id, 40).await.unwrap());
        let file = files.get(id).await.unwrap();
        assert_eq!(file.evaluation_id, Some(40));
        assert_eq!(file.name.as_deref(), Some("parecer.pdf"));

        assert!(!files.attach_to_evaluation(999, 40).await.unwrap());
        assert!(files.get(999).await.is_err());
    }
}
