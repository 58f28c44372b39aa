//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use vigil::{Outcome, RunReport, TestResult};

/// Live progress for a run, driven by the harness observer
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar for `total` cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// One line per finished case, above the bar
    pub fn case_finished(&self, result: &TestResult) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
            pb.set_message(result.name.clone());
        }
        if self.quiet && !result.outcome.is_failure() {
            return;
        }
        let line = self.case_line(result);
        match self.progress_bar {
            Some(ref pb) => pb.println(line),
            None => {
                let _ = self.term.write_line(&line);
            }
        }
    }

    /// Render the per-case line
    #[must_use]
    pub fn case_line(&self, result: &TestResult) -> String {
        let tag = format!("{:<5}", result.outcome);
        let tag = if self.use_color {
            let styled = match result.outcome {
                Outcome::Passed => style(tag).green().bold(),
                Outcome::Failed => style(tag).red().bold(),
                Outcome::Errored => style(tag).magenta().bold(),
                Outcome::Skipped => style(tag).yellow(),
            };
            styled.to_string()
        } else {
            tag
        };
        format!(
            "{tag} {:>2}. [{}] {} ({}ms) - {}",
            result.ordinal, result.intent, result.name, result.duration_ms, result.detail
        )
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the run summary
    pub fn summary(&self, report: &RunReport) {
        let failed = report.failed_count();
        if self.quiet && failed == 0 && !report.aborted {
            return;
        }

        let _ = self.term.write_line("");
        let passed = report.passed_count();
        let skipped = report.skipped_count();
        let secs = report.total_duration().as_secs_f64();
        let verdict = if report.is_success() { "PASSED" } else { "FAILED" };

        let line = if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();
            let status = if report.is_success() {
                passed_style.apply_to(verdict)
            } else {
                failed_style.apply_to(verdict)
            };
            format!(
                "{status} {} cases in {secs:.2}s ({} passed, {} failed, {} skipped)",
                report.total_count(),
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            )
        } else {
            format!(
                "{verdict} {} cases in {secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)",
                report.total_count()
            )
        };
        let _ = self.term.write_line(&line);
        if report.aborted {
            let _ = self.term.write_line("run aborted before all cases finished");
        }
    }
}
