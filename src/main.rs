mod cli;

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli::{Cli, Command, Kind, MailboxName, RouteAction};
use sie_dao::api::{HttpSieApi, SieApi};
use sie_dao::config::{SessionUser, SieConfig};
use sie_dao::documents::DocumentDao;
use sie_dao::mailbox::{Mailbox, MailboxLine, ProjectRegistration, ScholarshipCandidate, TeachingReport, Workflow};
use sie_dao::routing::RoutingAudit;
use sie_dao::{demo, ui};

fn init_tracing(verbose: bool) {
    let default = if verbose { "sie_dao=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn connect(config: &SieConfig) -> Result<HttpSieApi> {
    if config.api_key.is_empty() {
        bail!("no API key: set api_key in sie.toml or SIE_API_KEY");
    }
    let api = HttpSieApi::with_timeouts(
        config.api_key.clone(),
        config.base_url.clone(),
        Duration::from_secs(config.connect_timeout_secs),
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(api)
}

async fn list<A: SieApi, W: Workflow>(
    api: &A,
    user: &SessionUser,
    name: MailboxName,
    user_id: Option<i64>,
    admin: bool,
) -> Result<Vec<MailboxLine>> {
    let mailbox = Mailbox::<_, W>::new(api, user);
    let lines = match name {
        MailboxName::Inbox => mailbox.inbox().await?,
        MailboxName::Sent => mailbox.sent().await?,
        MailboxName::Approved => mailbox.approved().await?,
        MailboxName::Committee => {
            mailbox
                .committee(user_id.unwrap_or(user.user_id), admin)
                .await?
        }
    };
    Ok(lines)
}

async fn history<A: SieApi, W: Workflow>(api: &A, user: &SessionUser, document: i64) -> Result<Vec<MailboxLine>> {
    Ok(Mailbox::<_, W>::new(api, user).history(document).await?)
}

async fn route<A: SieApi, W: Workflow>(
    api: &A,
    user: &SessionUser,
    action: RouteAction,
    document: i64,
    dispatch: &str,
    professor: Option<i64>,
) -> Result<RoutingAudit> {
    let mailbox = Mailbox::<_, W>::new(api, user);
    let audit = match action {
        RouteAction::Dpq => mailbox.route_to_dpq(document, dispatch).await?,
        RouteAction::Return => mailbox.return_to_origin(document, dispatch).await?,
        RouteAction::Approve => mailbox.approve(document, dispatch).await?,
        RouteAction::Reject => mailbox.reject(document, dispatch).await?,
        RouteAction::Committee => {
            let professor = professor.context("--professor is required to route to a committee")?;
            mailbox.route_to_committee(document, dispatch, professor).await?
        }
    };
    Ok(audit)
}

async fn execute<A: SieApi>(api: &A, user: &SessionUser, command: Command) -> Result<()> {
    match command {
        Command::Document { id } => {
            let progress = ui::Progress::start(&format!("fetching document {id}"));
            let documents = DocumentDao::new(api, user);
            let fetched = async {
                let document = documents.get_document(id).await?;
                let steps = documents.steps(id).await?;
                Ok::<_, sie_dao::error::SieError>((document, steps))
            }
            .await;
            let (document, steps) = progress.finish(fetched, "fetched")?;
            ui::print_document(&document, &steps);
        }
        Command::Flows { document } => {
            let documents = DocumentDao::new(api, user);
            let progress = ui::Progress::start(&format!("fetching flows of document {document}"));
            let fetched = async {
                let document = documents.get_document(document).await?;
                documents.valid_next_flows(&document).await
            }
            .await;
            let flows = progress.finish(fetched, "fetched")?;
            ui::print_flows(&flows);
        }
        Command::History { kind, document } => {
            let progress = ui::Progress::start(&format!("fetching history of document {document}"));
            let lines = match kind {
                Kind::Registration => history::<_, ProjectRegistration>(api, user, document).await,
                Kind::TeachingReport => history::<_, TeachingReport>(api, user, document).await,
                Kind::Scholarship => history::<_, ScholarshipCandidate>(api, user, document).await,
            };
            let lines = progress.finish(lines, "fetched")?;
            ui::print_lines(&lines);
        }
        Command::Mailbox {
            kind,
            name,
            user_id,
            admin,
        } => {
            let progress = ui::Progress::start(&format!("listing {name:?}"));
            let lines = match kind {
                Kind::Registration => list::<_, ProjectRegistration>(api, user, name, user_id, admin).await,
                Kind::TeachingReport => list::<_, TeachingReport>(api, user, name, user_id, admin).await,
                Kind::Scholarship => list::<_, ScholarshipCandidate>(api, user, name, user_id, admin).await,
            };
            let lines = progress.finish(lines, "listed")?;
            ui::print_lines(&lines);
        }
        Command::Route {
            kind,
            action,
            document,
            dispatch,
            professor,
        } => {
            let progress = ui::Progress::start(&format!("routing document {document} ({action:?})"));
            let audit = match kind {
                Kind::Registration => {
                    route::<_, ProjectRegistration>(api, user, action, document, &dispatch, professor).await
                }
                Kind::TeachingReport => {
                    route::<_, TeachingReport>(api, user, action, document, &dispatch, professor).await
                }
                Kind::Scholarship => {
                    route::<_, ScholarshipCandidate>(api, user, action, document, &dispatch, professor).await
                }
            };
            let audit = progress.finish(audit, "routed")?;
            ui::print_audit(&audit);
        }
        Command::Demo => run_demo().await?,
    }
    Ok(())
}

async fn run_demo() -> Result<()> {
    let api = demo::seeded_store();
    let user = SessionUser {
        user_id: 12,
        hr_contract_id: 340,
        official_unit_id: 77,
    };
    let progress = ui::Progress::start("running project registration demo");
    let report = demo::run(&api, &user, |msg| progress.step(msg)).await;
    let report = progress.finish(report, "project approved")?;

    for audit in &report.audits {
        ui::print_audit(audit);
    }
    println!();
    println!(
        "project {} situation {:?}, {} routing step(s)",
        report.project.id,
        report.project.situation,
        report.steps.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Demo => run_demo().await,
        command => {
            let config = SieConfig::load(cli.config.as_deref())?;
            let api = connect(&config)?;
            execute(&api, &config.user, command).await
        }
    }
}
