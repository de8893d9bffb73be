//! Acesso à API do SIE: documentos eletrônicos, sua tramitação por fluxos
//! e as caixas postais dos processos de pesquisa.

pub mod api;
pub mod config;
pub mod dates;
pub mod demo;
pub mod documents;
pub mod error;
pub mod mailbox;
pub mod research;
pub mod routing;
pub mod ui;
