//! Vigil CLI Library
//!
//! Command-line front end for the Vigil harness: configuration layering,
//! progress output, report emission.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;

pub use commands::{
    CaseFilter, Cli, ColorArg, Commands, ConfigArgs, ConfigOverrides, IntentArg, ListArgs,
    LogFormat, ReportFormat, RunArgs,
};
pub use config::{resolve_run_config, CliConfig, ColorChoice, Verbosity, DEFAULT_CONFIG_FILE};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use runner::{emit_report, render_report, select_cases, TestRunner};
