//! Binary entry point

use aurup::cli::{CliArgs, OutputFormat};
use aurup::config::BuildConfig;
use aurup::orchestrator::Orchestrator;
use aurup::output::create_formatter;
use aurup::process::SystemRunner;
use aurup::logging;
use aurup::registry::{AurClient, HttpClient};
use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    logging::init(args.debug);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Runs the batch; `Ok(false)` means it completed but at least one package
/// failed
async fn run(args: CliArgs) -> anyhow::Result<bool> {
    let config = BuildConfig::from_args(&args)?;
    let runner = SystemRunner::new();
    let registry = AurClient::new(HttpClient::new()?);

    let orchestrator = Orchestrator::new(&config, &runner, &registry);
    let show_progress = args.format == OutputFormat::Text;
    let result = orchestrator.run(show_progress).await?;

    let formatter = create_formatter(args.format, config.dry_run);
    let mut stdout = std::io::stdout();
    formatter
        .render(&result, &mut stdout)
        .context("failed to write summary")?;

    Ok(!result.summary.has_failures() && result.critical_errors.is_empty())
}
