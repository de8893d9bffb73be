//! Configuração do cliente SIE carregada a partir de `sie.toml`.
//!
//! A struct [`SieConfig`] contém a chave e o endereço da API, os timeouts
//! HTTP e o usuário da sessão em nome de quem os documentos são criados e
//! tramitados. Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `SIE_API_KEY` e `SIE_BASE_URL` têm precedência
//! sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "sie.toml";

/// Usuário em nome de quem as operações são feitas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    /// `ID_USUARIO`: dono e criador dos documentos.
    #[serde(default)]
    pub user_id: i64,

    /// `ID_CONTRATO_RH`: procedência/interessado e avaliador.
    #[serde(default)]
    pub hr_contract_id: i64,

    /// `ID_LOT_OFICIAL`: unidade registrada nas avaliações.
    #[serde(default)]
    pub official_unit_id: i64,
}

/// Configuração de nível superior carregada de `sie.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SieConfig {
    /// Chave da API do SIE.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout de conexão em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout total de cada requisição em segundos.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub user: SessionUser,
}

// Valor padrão para a API: servidor de produção da UNIRIO.
fn default_base_url() -> String {
    "https://sistemas.unirio.br/api".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for SieConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            user: SessionUser::default(),
        }
    }
}

impl SieConfig {
    /// Carrega `sie.toml` do diretório atual, ou `path` quando informado.
    /// Sem caminho explícito, usa valores padrão se o arquivo não existir;
    /// um caminho explícito inexistente é erro.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str::<SieConfig>(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    // Variáveis de ambiente têm precedência sobre o arquivo de configuração.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("SIE_API_KEY")
            && !key.is_empty()
        {
            self.api_key = key;
        }
        if let Some(url) = var("SIE_BASE_URL")
            && !url.is_empty()
        {
            self.base_url = url;
        }
    }
}
