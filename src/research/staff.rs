use serde::Deserialize;

use crate::api::{Query, SieApi, from_row};
use crate::error::{Result, SieError};

pub const STAFF: &str = "V_FUNCIONARIOS";
pub const STAFF_IDS: &str = "V_FUNCIONARIO_IDS";

/// Linha de `V_FUNCIONARIOS`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Staff {
    #[serde(rename = "ID_USUARIO")]
    pub user_id: i64,
    #[serde(rename = "ID_CONTRATO_RH", default)]
    pub hr_contract_id: Option<i64>,
    #[serde(rename = "NOME_FUNCIONARIO", alias = "NOME", default)]
    pub name: Option<String>,
}

/// Identificadores de um servidor em `V_FUNCIONARIO_IDS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StaffIds {
    #[serde(rename = "ID_USUARIO")]
    pub user_id: i64,
    #[serde(rename = "ID_CONTRATO_RH")]
    pub hr_contract_id: i64,
}

pub struct StaffDao<'a, A: SieApi> {
    api: &'a A,
}

impl<'a, A: SieApi> StaffDao<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn by_cpf(&self, cpf: &str) -> Result<Staff> {
        let query = Query::new().eq("CPF", cpf);
        match self.api.get_optional(STAFF, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("staff member with CPF", cpf)),
        }
    }

    pub async fn ids_by_cpf(&self, cpf: &str) -> Result<StaffIds> {
        let query = Query::new().eq("CPF", cpf);
        match self.api.get_optional(STAFF_IDS, &query).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SieError::not_found("staff ids with CPF", cpf)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemorySie;
    use serde_json::json;

    #[tokio::test]
    async fn lookup_by_cpf() {
        let api = InMemorySie::new();
        api.seed(
            STAFF,
            json!({"CPF": "01234567890", "ID_USUARIO": 55, "NOME": "Ana"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        api.seed(
            STAFF_IDS,
            json!({"CPF": "01234567890", "ID_USUARIO": 55, "ID_CONTRATO_RH": 901})
                .as_object()
                .cloned()
                .unwrap(),
        );

        let staff = StaffDao::new(&api);
        let member = staff.by_cpf("01234567890").await.unwrap();
        assert_eq!(member.user_id, 55);
        assert_eq!(member.name.as_deref(), Some("Ana"));
        assert_eq!(
            staff.ids_by_cpf("01234567890").await.unwrap(),
            StaffIds {
                user_id: 55,
                hr_contract_id: 901
            }
        );
        assert!(matches!(
            staff.by_cpf("999").await,
            Err(SieError::NotFound { .. })
        ));
    }
}
