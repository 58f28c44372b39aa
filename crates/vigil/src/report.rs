//! Run reports: per-case results, aggregate counts and renderers.

use crate::harness::{Intent, TestCase};
use crate::result::{VigilError, VigilResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Verification succeeded
    Passed,
    /// A verification did not hold (assertion, timeout, script, missing element)
    Failed,
    /// Infrastructure problem, panic or time budget exceeded
    Errored,
    /// Never started because the run was aborted
    Skipped,
}

impl Outcome {
    /// Check if passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Failed or errored
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Errored)
    }

    /// Outcome for a case body that returned `err`
    #[must_use]
    pub const fn from_error(err: &VigilError) -> Self {
        if err.is_verification_failure() {
            Self::Failed
        } else {
            Self::Errored
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Errored => "ERROR",
            Self::Skipped => "SKIP",
        })
    }
}

/// Result of one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Position in the suite
    pub ordinal: u32,
    /// Display name
    pub name: String,
    /// Positive or negative path
    pub intent: Intent,
    /// Outcome
    pub outcome: Outcome,
    /// Human-readable explanation
    pub detail: String,
    /// Wall time spent in the case
    pub duration_ms: u64,
}

#[allow(clippy::cast_possible_truncation)]
const fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

impl TestResult {
    fn for_case(case: &TestCase, outcome: Outcome, detail: String, duration: Duration) -> Self {
        Self {
            ordinal: case.ordinal(),
            name: case.name().to_string(),
            intent: case.intent(),
            outcome,
            detail,
            duration_ms: millis(duration),
        }
    }

    /// Passed with a detail message
    #[must_use]
    pub fn passed(case: &TestCase, detail: impl Into<String>, duration: Duration) -> Self {
        Self::for_case(case, Outcome::Passed, detail.into(), duration)
    }

    /// Failed or errored depending on `err`
    #[must_use]
    pub fn from_error(case: &TestCase, err: &VigilError, duration: Duration) -> Self {
        Self::for_case(case, Outcome::from_error(err), err.to_string(), duration)
    }

    /// Errored with a detail message
    #[must_use]
    pub fn errored(case: &TestCase, detail: impl Into<String>, duration: Duration) -> Self {
        Self::for_case(case, Outcome::Errored, detail.into(), duration)
    }

    /// Skipped because the run was aborted
    #[must_use]
    pub fn skipped(case: &TestCase) -> Self {
        Self::for_case(
            case,
            Outcome::Skipped,
            "run aborted before this case started".to_string(),
            Duration::ZERO,
        )
    }

    /// Wall time as Duration
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Report for one suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Suite name
    pub suite: String,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Results in execution order
    pub results: Vec<TestResult>,
    /// Whether the run was cut short
    pub aborted: bool,
    /// Total wall time
    pub duration_ms: u64,
}

impl RunReport {
    /// Start an empty report
    #[must_use]
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            suite: suite.into(),
            started_at: Utc::now(),
            results: Vec::new(),
            aborted: false,
            duration_ms: 0,
        }
    }

    /// Append a result
    pub fn record(&mut self, result: TestResult) {
        self.results.push(result);
    }

    /// Seal the report
    pub fn finish(&mut self, aborted: bool, duration: Duration) {
        self.aborted = aborted;
        self.duration_ms = millis(duration);
    }

    /// Results in execution order
    #[must_use]
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Result for `ordinal`, if recorded
    #[must_use]
    pub fn result(&self, ordinal: u32) -> Option<&TestResult> {
        self.results.iter().find(|r| r.ordinal == ordinal)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Get passed count
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(Outcome::Passed)
    }

    /// Failed plus errored
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_failure()).count()
    }

    /// Get errored count
    #[must_use]
    pub fn errored_count(&self) -> usize {
        self.count(Outcome::Errored)
    }

    /// Get skipped count
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// Get total count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// True iff nothing failed or errored and the run was not aborted
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.aborted && self.failed_count() == 0
    }

    /// Failed and errored results
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_failure())
            .collect()
    }

    /// Get total duration
    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} passed, {} failed ({} errored), {} skipped in {:.2}s",
            self.passed_count(),
            self.failed_count(),
            self.errored_count(),
            self.skipped_count(),
            self.total_duration().as_secs_f64()
        );
        if self.aborted {
            line.push_str(" [aborted]");
        }
        line
    }

    /// Plain-text report, one line per case
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!("Suite: {} (run {})\n", self.suite, self.run_id);
        for r in &self.results {
            let _ = writeln!(
                out,
                "{:>3}. [{:<5}] {} ({}, {}ms): {}",
                r.ordinal, r.outcome, r.name, r.intent, r.duration_ms, r.detail
            );
        }
        out.push_str(&self.summary());
        out.push('\n');
        out
    }

    /// Pretty JSON
    pub fn render_json(&self) -> VigilResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JUnit XML
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" skipped="{}" time="{:.3}" timestamp="{}">"#,
            escape_xml(&self.suite),
            self.total_count(),
            self.count(Outcome::Failed),
            self.errored_count(),
            self.skipped_count(),
            self.total_duration().as_secs_f64(),
            self.started_at.to_rfc3339()
        );

        for result in &self.results {
            let _ = writeln!(
                xml,
                r#"  <testcase name="{:02} {}" classname="{}.{}" time="{:.3}">"#,
                result.ordinal,
                escape_xml(&result.name),
                escape_xml(&self.suite),
                result.intent,
                result.duration().as_secs_f64()
            );
            let detail = escape_xml(&result.detail);
            match result.outcome {
                Outcome::Passed => {}
                Outcome::Failed => {
                    let _ = writeln!(xml, r#"    <failure message="{detail}">{detail}</failure>"#);
                }
                Outcome::Errored => {
                    let _ = writeln!(xml, r#"    <error message="{detail}">{detail}</error>"#);
                }
                Outcome::Skipped => {
                    let _ = writeln!(xml, r#"    <skipped message="{detail}"/>"#);
                }
            }
            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
