//! CLI configuration
//!
//! Run settings are resolved in layers: built-in defaults, then `vigil.yaml`
//! (explicit `--config` path or the one in the working directory), then
//! command-line flags and `VIGIL_*` environment variables.

use crate::commands::{ConfigOverrides, LogFormat};
use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vigil::{parse_window_size, RunConfig};

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "vigil.yaml";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Derive from `-q` and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter directive when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "vigil=info,warn",
            Self::Debug => "vigil=debug,info",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stderr().features().colors_supported(),
        }
    }
}

/// Presentation settings for one CLI invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log line format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

/// Config file to load: explicit path, else `vigil.yaml` in `cwd` if present
fn config_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = cwd.join(DEFAULT_CONFIG_FILE);
            candidate.is_file().then_some(candidate)
        }
    }
}

/// Build the effective run configuration
///
/// # Errors
///
/// The config file cannot be read or parsed, an override is malformed, or the
/// result fails [`RunConfig::validate`].
pub fn resolve_run_config(overrides: &ConfigOverrides, cwd: &Path) -> CliResult<RunConfig> {
    let mut config = match config_path(overrides.config.as_deref(), cwd) {
        Some(path) => RunConfig::from_file(&path)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?,
        None => RunConfig::default(),
    };

    if let Some(ref url) = overrides.base_url {
        config = config.with_base_url(url.clone());
    }
    if overrides.headed {
        config = config.with_headless(false);
    }
    if let Some(ref size) = overrides.window_size {
        let (width, height) = parse_window_size(size)
            .map_err(|e| CliError::invalid_argument(format!("--window-size: {e}")))?;
        config = config.with_window_size(width, height);
    }
    if let Some(timeout) = overrides.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(poll) = overrides.poll_interval {
        config = config.with_poll_interval(poll);
    }
    if let Some(budget) = overrides.case_timeout {
        config = config.with_case_timeout(budget);
    }
    if let Some(budget) = overrides.suite_timeout {
        config = config.with_suite_timeout(budget);
    }
    if let Some(ref path) = overrides.chromium_path {
        config = config.with_chromium_path(path.display().to_string());
    }
    for flag in &overrides.browser_flags {
        config = config.with_flag(flag.clone());
    }

    config
        .validate()
        .map_err(|e| CliError::config(e.to_string()))?;
    Ok(config)
}
