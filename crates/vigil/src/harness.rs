//! Test harness for running test suites.
//!
//! The harness owns one [`Session`] for the whole run: it opens the session,
//! runs every case in ascending ordinal order with the session lent out
//! mutably, turns each case's error or panic into a [`TestResult`], and
//! closes the session exactly once at the end.
//!
//! ```text
//! NotStarted ──open──► SessionOpen ──► Running ──close──► SessionClosed
//!      │                                  │
//!      └── SessionStart error             └── abort: remaining cases Skipped
//! ```

use crate::config::RunConfig;
use crate::driver::SessionLauncher;
use crate::report::{RunReport, TestResult};
use crate::result::{VigilError, VigilResult};
use crate::session::Session;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Whether a case exercises the happy path or an error path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Expected-success path
    Positive,
    /// Error or edge path
    Negative,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        })
    }
}

impl std::str::FromStr for Intent {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            other => Err(VigilError::invalid_state(format!(
                "unknown intent {other:?} (expected positive or negative)"
            ))),
        }
    }
}

/// Body of a test case.
///
/// Returns a detail message on success. Any function item of the shape
/// `fn(&mut Session) -> BoxFuture<'_, VigilResult<String>>` is a body.
#[async_trait]
pub trait CaseBody: Send + Sync {
    /// Run against the shared session
    async fn run(&self, session: &mut Session) -> VigilResult<String>;
}

#[async_trait]
impl<F> CaseBody for F
where
    F: for<'a> Fn(&'a mut Session) -> BoxFuture<'a, VigilResult<String>> + Send + Sync,
{
    async fn run(&self, session: &mut Session) -> VigilResult<String> {
        self(session).await
    }
}

/// A single test case
#[derive(Clone)]
pub struct TestCase {
    ordinal: u32,
    name: String,
    intent: Intent,
    timeout: Option<Duration>,
    body: Arc<dyn CaseBody>,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("ordinal", &self.ordinal)
            .field("name", &self.name)
            .field("intent", &self.intent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TestCase {
    /// Create a new test case
    #[must_use]
    pub fn new(
        ordinal: u32,
        name: impl Into<String>,
        intent: Intent,
        body: impl CaseBody + 'static,
    ) -> Self {
        Self {
            ordinal,
            name: name.into(),
            intent,
            timeout: None,
            body: Arc::new(body),
        }
    }

    /// Set a time budget overriding the harness default
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Position in the suite
    #[must_use]
    pub const fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intent tag
    #[must_use]
    pub const fn intent(&self) -> Intent {
        self.intent
    }

    /// Own time budget, if any
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// An ordered set of test cases
#[derive(Debug, Clone)]
pub struct TestSuite {
    name: String,
    cases: Vec<TestCase>,
}

impl TestSuite {
    /// Create a new test suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Build a suite from a list, rejecting duplicate ordinals
    pub fn from_cases(name: impl Into<String>, cases: Vec<TestCase>) -> VigilResult<Self> {
        let mut suite = Self::new(name);
        for case in cases {
            suite.add(case)?;
        }
        Ok(suite)
    }

    /// Add a case, keeping ascending ordinal order
    ///
    /// # Errors
    ///
    /// [`VigilError::InvalidState`] if the ordinal is already taken.
    pub fn add(&mut self, case: TestCase) -> VigilResult<()> {
        match self
            .cases
            .binary_search_by_key(&case.ordinal, TestCase::ordinal)
        {
            Ok(_) => Err(VigilError::invalid_state(format!(
                "duplicate case ordinal {} ({:?})",
                case.ordinal, case.name
            ))),
            Err(pos) => {
                self.cases.insert(pos, case);
                Ok(())
            }
        }
    }

    /// Suite name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cases in execution order
    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Get the number of cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Only cases with the given intent
    #[must_use]
    pub fn filter_intent(&self, intent: Intent) -> Self {
        self.retain(|case| case.intent == intent)
    }

    /// Only cases whose name contains `needle` (case-insensitive)
    #[must_use]
    pub fn filter_name(&self, needle: &str) -> Self {
        let needle = needle.to_lowercase();
        self.retain(|case| case.name.to_lowercase().contains(&needle))
    }

    fn retain(&self, keep: impl Fn(&TestCase) -> bool) -> Self {
        Self {
            name: self.name.clone(),
            cases: self.cases.iter().filter(|c| keep(c)).cloned().collect(),
        }
    }
}

/// Cooperative cancellation flag, checked between cases
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// Create an unset signal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop before the next case
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if abort was requested
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Harness lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarnessState {
    /// Nothing launched yet
    NotStarted,
    /// Session launched, no case started
    SessionOpen,
    /// Cases executing
    Running,
    /// Session released
    SessionClosed,
}

type Observer = Arc<dyn Fn(&TestResult) + Send + Sync>;

/// Runs suites against one browser session
pub struct TestHarness {
    config: RunConfig,
    abort: AbortSignal,
    observer: Option<Observer>,
    state: HarnessState,
}

impl std::fmt::Debug for TestHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHarness")
            .field("config", &self.config)
            .field("abort", &self.abort)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TestHarness {
    /// Create a new test harness
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            abort: AbortSignal::new(),
            observer: None,
            state: HarnessState::NotStarted,
        }
    }

    /// Use an externally owned abort signal
    #[must_use]
    pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort = signal;
        self
    }

    /// Call `observer` after every recorded result
    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(&TestResult) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Signal that aborts this harness
    #[must_use]
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> HarnessState {
        self.state
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run `suite` on a fresh session from `launcher`.
    ///
    /// # Errors
    ///
    /// - [`VigilError::InvalidState`] for an invalid configuration
    /// - [`VigilError::SessionStart`] if the browser cannot be launched
    /// - [`VigilError::Teardown`] if the session cannot be closed; the
    ///   completed report is carried inside
    pub async fn run(
        &mut self,
        launcher: &dyn SessionLauncher,
        suite: &TestSuite,
    ) -> VigilResult<RunReport> {
        self.config.validate()?;
        self.state = HarnessState::NotStarted;
        let span = info_span!("suite", suite = %suite.name(), cases = suite.len());

        async {
            let opened = Session::open(
                launcher,
                &self.config.session_config(),
                self.config.base_url.clone(),
                self.config.wait_options(),
            )
            .await;
            let mut session = match opened {
                Ok(session) => session,
                Err(err) => {
                    error!(error = %err, "could not open browser session");
                    return Err(err);
                }
            };
            self.state = HarnessState::SessionOpen;

            let report = self.run_cases(&mut session, suite).await;

            let closed = session.close().await;
            self.state = HarnessState::SessionClosed;
            info!(summary = %report.summary(), "suite finished");
            match closed {
                Ok(()) => Ok(report),
                Err(err) => Err(VigilError::Teardown {
                    message: err.to_string(),
                    report: Box::new(report),
                }),
            }
        }
        .instrument(span)
        .await
    }

    async fn run_cases(&mut self, session: &mut Session, suite: &TestSuite) -> RunReport {
        self.state = HarnessState::Running;
        let started = Instant::now();
        let deadline = self.config.suite_timeout().map(|budget| started + budget);
        let mut report = RunReport::new(suite.name());
        let mut aborted = false;

        for case in suite.cases() {
            if !aborted {
                if self.abort.is_aborted() {
                    warn!(ordinal = case.ordinal(), "abort requested; skipping remaining cases");
                    aborted = true;
                } else if deadline.is_some_and(|d| Instant::now() >= d) {
                    warn!(ordinal = case.ordinal(), "suite time budget exhausted; skipping remaining cases");
                    aborted = true;
                }
            }

            let result = if aborted {
                TestResult::skipped(case)
            } else {
                self.run_case(session, case).await
            };
            if let Some(observer) = &self.observer {
                observer(&result);
            }
            report.record(result);
        }

        report.finish(aborted, started.elapsed());
        report
    }

    async fn run_case(&self, session: &mut Session, case: &TestCase) -> TestResult {
        let span = info_span!("case", ordinal = case.ordinal(), name = %case.name());
        async {
            info!(intent = %case.intent(), "running");
            session.note(format!("case {} started: {}", case.ordinal(), case.name()));
            let start = Instant::now();
            let body = AssertUnwindSafe(case.body.run(session)).catch_unwind();
            let outcome = match case.timeout().or_else(|| self.config.case_timeout()) {
                Some(budget) => match tokio::time::timeout(budget, body).await {
                    Ok(outcome) => outcome,
                    Err(_) => Ok(Err(VigilError::CaseTimeout { budget })),
                },
                None => body.await,
            };
            let duration = start.elapsed();

            let result = match outcome {
                Ok(Ok(detail)) => TestResult::passed(case, detail, duration),
                Ok(Err(err)) => TestResult::from_error(case, &err, duration),
                Err(panic) => {
                    TestResult::errored(case, format!("panicked: {}", panic_message(&*panic)), duration)
                }
            };
            if result.outcome.is_failure() {
                warn!(outcome = %result.outcome, detail = %result.detail, "case did not pass");
            } else {
                debug!(duration_ms = result.duration_ms, "case passed");
            }
            session.note(format!("case {} finished: {}", case.ordinal(), result.outcome));
            result
        }
        .instrument(span)
        .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Run several independent harnesses concurrently, each on its own session.
///
/// Results come back in input order.
pub async fn run_parallel(
    runs: Vec<(TestHarness, &dyn SessionLauncher, &TestSuite)>,
) -> Vec<VigilResult<RunReport>> {
    info!(runs = runs.len(), "starting parallel runs");
    futures::future::join_all(runs.into_iter().map(|(mut harness, launcher, suite)| async move {
        harness.run(launcher, suite).await
    }))
    .await
}
