//! Interface de linha de comando do `sie` baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (document, history,
//! flows, mailbox, route, demo) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Tramitação de documentos de pesquisa no SIE.
#[derive(Debug, Parser)]
#[command(name = "sie", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: ./sie.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita logs detalhados.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Tipo de trâmite, mapeado para um [`Workflow`](sie_dao::mailbox::Workflow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// Cadastro de projetos de pesquisa.
    Registration,
    /// Avaliação de relatório docente.
    TeachingReport,
    /// Plano de estudos de candidato a bolsista.
    Scholarship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MailboxName {
    Inbox,
    Sent,
    Approved,
    Committee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RouteAction {
    /// Para a DPq.
    Dpq,
    /// Para um membro da câmara (exige --professor).
    Committee,
    /// De volta ao docente coordenador.
    Return,
    Approve,
    Reject,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mostra um documento e seus passos de tramitação.
    Document { id: i64 },

    /// Histórico de um documento na view do tipo de trâmite.
    History {
        #[arg(value_enum)]
        kind: Kind,
        document: i64,
    },

    /// Fluxos ativos que saem da situação atual do documento.
    Flows { document: i64 },

    /// Lista uma caixa postal.
    Mailbox {
        #[arg(value_enum)]
        kind: Kind,

        #[arg(value_enum)]
        name: MailboxName,

        /// Usuário da câmara (padrão: usuário da sessão).
        #[arg(long)]
        user_id: Option<i64>,

        /// Lista a câmara inteira.
        #[arg(long, default_value_t = false)]
        admin: bool,
    },

    /// Recebe e tramita um documento.
    Route {
        #[arg(value_enum)]
        kind: Kind,

        #[arg(value_enum)]
        action: RouteAction,

        document: i64,

        /// Texto do despacho.
        #[arg(long, short, default_value = "")]
        dispatch: String,

        /// Membro da câmara de destino.
        #[arg(long)]
        professor: Option<i64>,
    },

    /// Executa a demonstração embutida sobre dados em memória.
    Demo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_route_subcommand() {
        let cli = Cli::parse_from([
            "sie",
            "route",
            "registration",
            "committee",
            "42",
            "--dispatch",
            "Para parecer",
            "--professor",
            "44",
        ]);
        match cli.command {
            Command::Route {
                kind,
                action,
                document,
                dispatch,
                professor,
            } => {
                assert_eq!(kind, Kind::Registration);
                assert_eq!(action, RouteAction::Committee);
                assert_eq!(document, 42);
                assert_eq!(dispatch, "Para parecer");
                assert_eq!(professor, Some(44));
            }
            _ => panic!("expected Route command"),
        }
    }

    #[test]
    fn cli_parses_mailbox_with_global_flags() {
        let cli = Cli::parse_from([
            "sie",
            "--config",
            "/tmp/sie.toml",
            "--verbose",
            "mailbox",
            "teaching-report",
            "committee",
            "--admin",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sie.toml")));
        match cli.command {
            Command::Mailbox {
                kind,
                name,
                user_id,
                admin,
            } => {
                assert_eq!(kind, Kind::TeachingReport);
                assert_eq!(name, MailboxName::Committee);
                assert!(user_id.is_none());
                assert!(admin);
            }
            _ => panic!("expected Mailbox command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["sie", "history", "thesis", "1"]).is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
