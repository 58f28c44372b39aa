//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Vigil: end-to-end browser verification for the gallery application
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "pretty", global = true, env = "VIGIL_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the verification suite against a deployment
    Run(RunArgs),

    /// List the cases of the suite without running them
    List(ListArgs),

    /// Show the effective run configuration
    Config(ConfigArgs),
}

/// Overrides layered on top of `vigil.yaml`
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Configuration file (YAML)
    #[arg(short, long, env = "VIGIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the application under test
    #[arg(long, env = "VIGIL_BASE_URL")]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long, env = "VIGIL_HEADED")]
    pub headed: bool,

    /// Window size as WIDTHxHEIGHT
    #[arg(long, env = "VIGIL_WINDOW_SIZE")]
    pub window_size: Option<String>,

    /// Default wait timeout in milliseconds
    #[arg(long, env = "VIGIL_TIMEOUT_MS")]
    pub timeout: Option<u64>,

    /// Wait engine poll interval in milliseconds
    #[arg(long, env = "VIGIL_POLL_INTERVAL_MS")]
    pub poll_interval: Option<u64>,

    /// Per-case time budget in milliseconds
    #[arg(long, env = "VIGIL_CASE_TIMEOUT_MS")]
    pub case_timeout: Option<u64>,

    /// Whole-run time budget in milliseconds
    #[arg(long, env = "VIGIL_SUITE_TIMEOUT_MS")]
    pub suite_timeout: Option<u64>,

    /// Browser executable
    #[arg(long, env = "VIGIL_CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Extra browser flag (repeatable)
    #[arg(long = "browser-flag", value_name = "FLAG", allow_hyphen_values = true)]
    pub browser_flags: Vec<String>,
}

/// Case selection shared by `run` and `list`
#[derive(Args, Debug, Clone, Default)]
pub struct CaseFilter {
    /// Only cases with this intent
    #[arg(long)]
    pub intent: Option<IntentArg>,

    /// Only cases whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration overrides
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Case selection
    #[command(flatten)]
    pub cases: CaseFilter,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Case selection
    #[command(flatten)]
    pub cases: CaseFilter,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration overrides
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Report output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable table
    #[default]
    Text,
    /// JSON document
    Json,
    /// JUnit XML
    Junit,
}

/// Case intent filter
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentArg {
    /// Happy-path cases
    Positive,
    /// Resilience and edge-case cases
    Negative,
}

impl From<IntentArg> for vigil::Intent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Positive => Self::Positive,
            IntentArg::Negative => Self::Negative,
        }
    }
}

/// Log line format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
