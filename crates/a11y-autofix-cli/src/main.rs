//! A11y Autofix - accessibility remediation requestor
//!
//! The `a11y-autofix` command resolves accessibility suggestions for a site,
//! batches them into work items, stages a snapshot of the local source tree
//! and, after one confirmation, publishes the work items to the remediation
//! worker's queue.
//!
//! ## Selectors
//!
//! - `--name <text>`: site whose base URL contains the text
//! - `--site-id <id>` [`--opportunity-id <id>`]
//! - `--site-id <id> --opportunity-id <id> --suggestion-id <id>`
//! - `--site-id <id> --opportunity-id <id> --suggestion-ids <id>...`
//!
//! ## Exit codes
//!
//! Zero on full success or when the confirmation is declined, one on any
//! error or when at least one message failed to publish.

mod config;
mod terminal;

use std::process::ExitCode;
use std::sync::Arc;

use a11y_autofix_core::telemetry::init_tracing;
use a11y_autofix_core::{
    validate_selection, AutofixError, Collaborators, PublishOutcome, RemediationPipeline, RunReport,
    SelectorFlags,
};
use a11y_autofix_gateway::{S3ObjectStore, SpacecatDirectory, SqsWorkQueue, TarGzArchiveBuilder};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use crate::config::Settings;
use crate::terminal::TerminalPrompter;

#[derive(Parser, Debug)]
#[command(name = "a11y-autofix")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send accessibility suggestions to the autofix worker", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and a JSON run report
    #[arg(long, global = true)]
    json: bool,

    /// Site name or URL fragment to search for
    #[arg(long)]
    name: Option<String>,

    /// Site id
    #[arg(long)]
    site_id: Option<String>,

    /// Accessibility opportunity id (needs --site-id)
    #[arg(long)]
    opportunity_id: Option<String>,

    /// Single suggestion id (needs --site-id and --opportunity-id)
    #[arg(long)]
    suggestion_id: Option<String>,

    /// Several suggestion ids, space and/or comma separated; one message each
    #[arg(long, num_args = 1..)]
    suggestion_ids: Option<Vec<String>>,

    /// Send every suggestion sharing the chosen suggestion's aggregation key
    #[arg(long)]
    send_all_issues: bool,

    /// Pick an issue type; one message per aggregation key of that type
    #[arg(long)]
    send_by_issue_type: bool,

    /// Pick an aggregation key; all its suggestions go in one message
    #[arg(long)]
    send_by_aggregation_key: bool,

    /// Use an existing snapshot archive under tmp/codefix/source/
    #[arg(long)]
    archive: Option<String>,

    /// Build and upload a fresh snapshot even if one exists
    #[arg(long)]
    force_upload: bool,
}

impl Cli {
    fn selector_flags(&self) -> SelectorFlags {
        SelectorFlags {
            name: self.name.clone(),
            site_id: self.site_id.clone(),
            opportunity_id: self.opportunity_id.clone(),
            suggestion_id: self.suggestion_id.clone(),
            suggestion_ids: self.suggestion_ids.clone(),
            send_all_issues: self.send_all_issues,
            send_by_issue_type: self.send_by_issue_type,
            send_by_aggregation_key: self.send_by_aggregation_key,
            archive: self.archive.clone(),
            force_upload: self.force_upload,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(hint) = usage_hint(&e) {
                eprintln!("{hint}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Follow-up line for errors caught before any network call.
fn usage_hint(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<AutofixError>() {
        Some(AutofixError::Configuration(_)) => {
            Some("Set the missing keys in the environment or in a .env file next to the binary.")
        }
        Some(e) if e.is_usage_error() => {
            Some("Run `a11y-autofix --help` for the accepted flag combinations.")
        }
        _ => None,
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    config::load_dotenv();

    let selection = validate_selection(&cli.selector_flags(), config::archive_override().as_deref())?;
    let settings = Settings::from_env()?;

    let directory = SpacecatDirectory::new(settings.spacecat.clone())
        .context("Failed to create catalog client")?;
    let sdk_config = settings.aws.load().await;
    info!(bucket = %settings.bucket, region = %settings.aws.region, "using object store");

    let pipeline = RemediationPipeline::new(Collaborators {
        directory: Arc::new(directory),
        store: Arc::new(S3ObjectStore::new(&sdk_config, &settings.bucket)),
        queue: Arc::new(SqsWorkQueue::new(&sdk_config, &settings.queue_url)),
        archiver: Arc::new(TarGzArchiveBuilder::new()),
        prompter: Arc::new(TerminalPrompter::detect()),
    });

    let report = pipeline.run(&selection, &settings.repo_path).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&report));
    }

    Ok(if report.exit_code() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render_report(report: &RunReport) -> String {
    let mut lines = vec![format!("Site: {} ({})", report.site_url, report.site_id)];

    let snapshot = &report.snapshot;
    lines.push(format!(
        "Snapshot: s3://{}/{} ({}, {} bytes)",
        snapshot.bucket,
        snapshot.object_key,
        if snapshot.already_existed {
            "reused"
        } else {
            "uploaded"
        },
        snapshot.size_bytes
    ));

    let dispatch = &report.dispatch;
    if dispatch.is_aborted() {
        lines.push("Cancelled. No messages were sent.".to_string());
    } else {
        for record in &dispatch.records {
            match &record.outcome {
                PublishOutcome::Sent { message_id } => lines.push(format!(
                    "  sent   {} [{}] -> {}",
                    record.aggregation_key,
                    record.suggestion_ids.join(", "),
                    message_id
                )),
                PublishOutcome::Failed { error } => lines.push(format!(
                    "  failed {} [{}]: {}",
                    record.aggregation_key,
                    record.suggestion_ids.join(", "),
                    error
                )),
            }
        }
        lines.push(format!(
            "Sent {} of {} messages ({} failed).",
            dispatch.sent(),
            dispatch.records.len(),
            dispatch.failed()
        ));
    }

    if !report.warnings.is_empty() {
        lines.push("Warnings:".to_string());
        lines.extend(report.warnings.iter().map(|w| format!("  - {w}")));
    }

    lines.join("\n")
}
