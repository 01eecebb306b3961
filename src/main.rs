use chrono::Local;
use clap::Parser;
use jira_bulk::backend::JiraClient;
use jira_bulk::cli::Cli;
use jira_bulk::config::{self, Credentials, RunOptions};
use jira_bulk::driver::Driver;
use jira_bulk::logging::init_logging;
use jira_bulk::output::OutputContext;
use jira_bulk::util::should_show_progress;
use jira_bulk::{BulkError, StructuredError};
use std::io::{self, IsTerminal};
use tracing::debug;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Err(e) = run(&cli) {
        handle_error(&e, cli.json);
    }
}

fn run(cli: &Cli) -> jira_bulk::Result<()> {
    let scope = cli.scope()?;
    let filters = cli.filters()?;
    let actions = cli.actions();

    let cwd = std::env::current_dir()?;
    let path = config::resolve_credentials_path(cli.credentials.as_deref(), &cwd);
    let credentials = Credentials::load(&path)?;

    let out = OutputContext::from_flags(cli.json, cli.quiet, cli.no_color);
    let options = RunOptions::new(Local::now().date_naive())
        .dry_run(cli.dry_run)
        .due_from(cli.due_from.into())
        .show_progress(out.is_human() && should_show_progress());
    debug!(?options, %scope, "Starting run");

    let client = JiraClient::new(&credentials)?;
    let report = Driver::new(&client, options).run(&scope, &filters, &actions, &out)?;
    out.json_pretty(&report)
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &BulkError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}
