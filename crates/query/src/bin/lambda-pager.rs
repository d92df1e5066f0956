//! lambda-pager — runs a query lambda asynchronously and pages through the
//! full result set, once per run, with randomly chosen parameters.
//!
//! Reads `ROCKSET_APISERVER` / `ROCKSET_APIKEY` (optionally from `.env`).
//! Any failure aborts the remaining runs and exits with status 1.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use lambda_params::ParameterCatalog;
use lambda_query::config::page_size_from_env;
use lambda_query::{
    HttpTransport, QueryErrorPolicy, QuerySession, QuerySpec, ServiceConfig, SessionOptions,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Execute a query lambda and paginate its results.
#[derive(Parser, Debug)]
#[command(name = "lambda-pager", version, about)]
struct Cli {
    /// Parameter catalog (JSON array of `{"parameters": [...]}` records).
    #[arg(long, env = "LAMBDA_PARAMETERS", default_value = "./parameters.json")]
    parameters: PathBuf,

    #[arg(long, env = "LAMBDA_WORKSPACE", default_value = "taxi")]
    workspace: String,

    /// Query lambda name.
    #[arg(long, env = "LAMBDA_NAME", default_value = "limit-offset-test")]
    lambda: String,

    /// Tag to execute (defaults to `latest` when no version is given).
    #[arg(long, conflicts_with = "lambda_version")]
    tag: Option<String>,

    /// Version to execute.
    #[arg(long)]
    lambda_version: Option<String>,

    /// Number of sequential sessions.
    #[arg(long, default_value_t = 2)]
    runs: usize,

    /// Documents per page; falls back to `LAMBDA_PAGE_SIZE`.
    #[arg(long)]
    page_size: Option<u32>,

    /// Fail as soon as the service reports query errors.
    #[arg(long)]
    terminate_on_query_error: bool,

    /// Give up waiting for completion after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Abort pagination after this many pages.
    #[arg(long)]
    max_pages: Option<usize>,

    /// Stop after COMPLETED without fetching pages.
    #[arg(long)]
    no_paginate: bool,
}

impl Cli {
    fn session_options(&self) -> anyhow::Result<SessionOptions> {
        let mut opts = SessionOptions::from_env().context("invalid session settings")?;
        if self.terminate_on_query_error {
            opts.error_policy = QueryErrorPolicy::TerminateOnError;
        }
        if let Some(secs) = self.deadline_secs {
            opts.deadline = Some(Duration::from_secs(secs));
        }
        if self.max_pages.is_some() {
            opts.max_pages = self.max_pages;
        }
        if self.no_paginate {
            opts.paginate = false;
        }
        Ok(opts)
    }

    fn spec_builder(&self) -> anyhow::Result<lambda_query::spec::QuerySpecBuilder> {
        let page_size = match self.page_size {
            Some(size) => size,
            None => page_size_from_env()?,
        };
        let builder = QuerySpec::builder(&self.workspace, &self.lambda).page_size(page_size);
        Ok(match (&self.tag, &self.lambda_version) {
            (_, Some(version)) => builder.version(version),
            (Some(tag), None) => builder.tag(tag),
            (None, None) => builder.tag("latest"),
        })
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let service = ServiceConfig::from_env().context("failed to load service configuration")?;
    let options = cli.session_options()?;
    let catalog = ParameterCatalog::load(&cli.parameters)?;
    let transport = HttpTransport::new(&service)?;

    for run in 1..=cli.runs {
        let params = catalog.random_parameter_set()?;
        let spec = cli
            .spec_builder()?
            .parameters(params.parameters.clone())
            .build()?;

        info!(run, of = cli.runs, "starting session");
        let mut session = QuerySession::new(spec, &transport, &service, options.clone());
        let report = match session.run().await {
            Ok(report) => report,
            Err(err) => {
                error!(run, of = cli.runs, error = %err, "aborting remaining runs");
                std::process::exit(err.exit_code());
            }
        };
        info!(
            run,
            query_id = %report.query_id,
            total = ?report.total_result_count,
            pages = report.pages_fetched,
            total_time_ms = report.total_time.as_millis() as u64,
            "session finished"
        );
    }

    info!("lambda-pager exited cleanly");
    Ok(())
}
