//! Suite execution and report emission

use crate::commands::{CaseFilter, ReportFormat};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use vigil::{AbortSignal, RunConfig, RunReport, SessionLauncher, TestHarness, TestSuite, VigilError};

/// Narrow `suite` to the requested cases
#[must_use]
pub fn select_cases(suite: &TestSuite, filter: &CaseFilter) -> TestSuite {
    let mut selected = suite.clone();
    if let Some(intent) = filter.intent {
        selected = selected.filter_intent(intent.into());
    }
    if let Some(ref needle) = filter.filter {
        selected = selected.filter_name(needle);
    }
    selected
}

/// Render a finished report
///
/// # Errors
///
/// JSON serialization failure.
pub fn render_report(report: &RunReport, format: ReportFormat) -> CliResult<String> {
    match format {
        ReportFormat::Text => Ok(report.render_text()),
        ReportFormat::Json => report
            .render_json()
            .map_err(|e| CliError::report_generation(e.to_string())),
        ReportFormat::Junit => Ok(report.render_junit()),
    }
}

/// Write a rendered report to `output`, or stdout when absent
///
/// # Errors
///
/// The output file cannot be written.
pub fn emit_report(rendered: &str, output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, rendered)?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Runs one suite with progress output
#[derive(Debug)]
pub struct TestRunner {
    config: CliConfig,
    run_config: RunConfig,
    abort: AbortSignal,
}

impl TestRunner {
    /// Create a new test runner
    #[must_use]
    pub fn new(config: CliConfig, run_config: RunConfig) -> Self {
        Self {
            config,
            run_config,
            abort: AbortSignal::new(),
        }
    }

    /// Signal that stops the run between cases
    #[must_use]
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Effective run configuration
    #[must_use]
    pub const fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    /// Run `suite` on a session from `launcher`.
    ///
    /// A failed teardown still yields the collected report alongside the
    /// error so it can be emitted.
    ///
    /// # Errors
    ///
    /// Session start failure, or teardown failure (with its report).
    pub async fn run(
        &self,
        launcher: &dyn SessionLauncher,
        suite: &TestSuite,
    ) -> Result<RunReport, (CliError, Option<RunReport>)> {
        if suite.is_empty() {
            return Err((
                CliError::invalid_argument("no cases match the given filters"),
                None,
            ));
        }

        let mut reporter = ProgressReporter::new(
            self.config.color.should_color(),
            self.config.verbosity.is_quiet(),
        );
        reporter.header(&format!(
            "{} suite against {}",
            suite.name(),
            self.run_config.base_url
        ));
        reporter.start_progress(suite.len() as u64, suite.name());
        let reporter = Arc::new(reporter);
        let observer = Arc::clone(&reporter);

        let mut harness = TestHarness::new(self.run_config.clone())
            .with_abort_signal(self.abort.clone())
            .with_observer(move |result| observer.case_finished(result));

        let outcome = harness.run(launcher, suite).await;
        reporter.finish();

        match outcome {
            Ok(report) => {
                reporter.summary(&report);
                Ok(report)
            }
            Err(VigilError::Teardown { message, report }) => {
                warn!(%message, "browser teardown failed");
                reporter.summary(&report);
                Err((
                    CliError::test_execution(format!("browser teardown failed: {message}")),
                    Some(*report),
                ))
            }
            Err(err) => Err((err.into(), None)),
        }
    }
}
