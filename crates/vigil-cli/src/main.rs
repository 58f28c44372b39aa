//! Vigil CLI: run the gallery verification suite
//!
//! ## Usage
//!
//! ```bash
//! vigil run                                    # Run all cases against localhost:8090
//! vigil run --base-url https://staging.example.com --format junit -o report.xml
//! vigil run --intent negative --filter image   # Subset of the suite
//! vigil list                                   # Show the cases
//! vigil config                                 # Show the effective configuration
//! ```
//!
//! Exit status is 0 when every selected case passed, 1 when any failed or
//! errored (or the run was aborted), and 2 when the run could not happen.

use clap::Parser;
use std::process::ExitCode;
use vigil::gallery_suite;
use vigil_cli::{
    emit_report, logging, render_report, resolve_run_config, select_cases, Cli, CliConfig,
    CliResult, ColorChoice, Commands, ConfigArgs, ListArgs, RunArgs, TestRunner, Verbosity,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(&config);

    let result = match cli.command {
        Commands::Run(args) => run_suite(config, &args).await,
        Commands::List(args) => run_list(&args).map(|()| ExitCode::SUCCESS),
        Commands::Config(args) => run_config(&args).map(|()| ExitCode::SUCCESS),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
        .with_log_format(cli.log_format)
}

fn current_dir() -> CliResult<std::path::PathBuf> {
    Ok(std::env::current_dir()?)
}

fn run_list(args: &ListArgs) -> CliResult<()> {
    let suite = select_cases(&gallery_suite()?, &args.cases);
    for case in suite.cases() {
        println!("{:>2}. [{}] {}", case.ordinal(), case.intent(), case.name());
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let run_config = resolve_run_config(&args.overrides, &current_dir()?)?;
    print!("{}", run_config.to_yaml()?);
    Ok(())
}

async fn run_suite(config: CliConfig, args: &RunArgs) -> CliResult<ExitCode> {
    let run_config = resolve_run_config(&args.overrides, &current_dir()?)?;
    let suite = select_cases(&gallery_suite()?, &args.cases);
    let runner = TestRunner::new(config, run_config);

    let abort = runner.abort_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; finishing current case and closing the browser");
            abort.abort();
        }
    });

    let launcher = launcher()?;
    let report = match runner.run(launcher.as_ref(), &suite).await {
        Ok(report) => report,
        Err((err, Some(report))) => {
            emit_report(&render_report(&report, args.format)?, args.output.as_deref())?;
            return Err(err);
        }
        Err((err, None)) => return Err(err),
    };

    emit_report(&render_report(&report, args.format)?, args.output.as_deref())?;
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(feature = "browser")]
#[allow(clippy::unnecessary_wraps)]
fn launcher() -> CliResult<Box<dyn vigil::SessionLauncher>> {
    Ok(Box::new(vigil::ChromiumLauncher::new()))
}

#[cfg(not(feature = "browser"))]
fn launcher() -> CliResult<Box<dyn vigil::SessionLauncher>> {
    Err(vigil_cli::CliError::test_execution(
        "browser support not enabled. Rebuild with --features browser",
    ))
}
