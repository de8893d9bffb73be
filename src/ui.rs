//! Saída de terminal do `sie`: spinner durante chamadas à API e resultados
//! coloridos.
//!
//! Usa `indicatif` para o spinner e `console` para cores. Registros de
//! auditoria são impressos como JSON formatado.

use std::fmt::Display;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::documents::Document;
use crate::mailbox::MailboxLine;
use crate::routing::{Flow, RoutingAudit, RoutingStep};

/// Spinner shown while a remote operation runs.
pub struct Progress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    dim: Style,
}

impl Progress {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    pub fn step(&self, message: &str) {
        self.pb.println(format!("  {} {message}", self.dim.apply_to("·")));
    }

    pub fn success(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn failure(&self, error: &impl Display) {
        self.pb.finish_and_clear();
        println!("  {} {error}", self.red.apply_to("✗"));
    }

    /// Clears the spinner and reports `result`, passing it through.
    pub fn finish<T, E: Display>(&self, result: Result<T, E>, done: &str) -> Result<T, E> {
        match &result {
            Ok(_) => self.success(done),
            Err(e) => self.failure(e),
        }
        result
    }
}

fn print_json(title: &str, style: &Style, value: &impl Serialize) {
    println!();
    println!("{}", style.apply_to(format!("─── {title} ───")));
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

pub fn print_audit(audit: &RoutingAudit) {
    print_json("Routing audit", &Style::new().green(), audit);
}

pub fn print_document(document: &Document, steps: &[RoutingStep]) {
    let bold = Style::new().bold();
    println!(
        "{} {} (type {}, status {})",
        bold.apply_to(format!("Document {}", document.id)),
        document.process_number.as_deref().unwrap_or("-"),
        document.doc_type,
        document.status,
    );
    if document.is_archived() {
        println!("  {}", Style::new().yellow().apply_to("archived"));
    }
    for step in steps {
        let destination = step
            .destination()
            .map(|d| format!("{}/{}", d.kind, d.id))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{:<3} {:<10} → {:<12} flow {}",
            step.sequence,
            step.status.to_string(),
            destination,
            step.flow_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        );
    }
}

pub fn print_flows(flows: &[Flow]) {
    if flows.is_empty() {
        println!("  {}", Style::new().dim().apply_to("no active flows"));
    }
    for flow in flows {
        let query = if flow.destination_resolved_by_query() { " (query)" } else { "" };
        println!(
            "  flow {:<6} {} → {}{query}",
            flow.id, flow.from_status, flow.to_status
        );
    }
}

pub fn print_lines(lines: &[MailboxLine]) {
    let dim = Style::new().dim();
    if lines.is_empty() {
        println!("  {}", dim.apply_to("empty"));
        return;
    }
    for line in lines {
        println!(
            "  doc {:<8} {:<14} status {:<4} {}",
            line.document_id,
            line.process_number.as_deref().map(str::trim).unwrap_or("-"),
            line.status,
            dim.apply_to(line.title.as_deref().map(str::trim).unwrap_or("")),
        );
    }
    println!("  {}", dim.apply_to(format!("{} line(s)", lines.len())));
}
