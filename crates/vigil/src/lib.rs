//! Vigil: End-to-End Browser Verification for Web Applications
//!
//! Drives a real browser against a running deployment, waits for observable
//! page conditions instead of sleeping, and runs an ordered suite of
//! positive and negative cases into a machine-readable run report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    VIGIL Architecture                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ TestSuite  │    │ Harness    │    │ Session    │            │
//! │   │ (ordered   │───►│ (budgets,  │───►│ + Waiter   │──► driver  │
//! │   │  cases)    │    │  abort)    │    │ Conditions │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           ▼                                     │
//! │                     RunReport (text / JSON / JUnit)             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil::{gallery_suite, ChromiumLauncher, RunConfig, TestHarness};
//!
//! let suite = gallery_suite()?;
//! let mut harness = TestHarness::new(RunConfig::default());
//! let report = harness.run(&ChromiumLauncher::new(), &suite).await?;
//! println!("{}", report.render_text());
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod browser;
mod config;
mod driver;
mod harness;
mod report;
mod result;
mod selector;
mod session;

/// Observable page conditions evaluated by the wait engine
pub mod condition;

/// In-memory scripted browser backend
///
/// Used by unit and integration tests in place of a real browser.
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod mock;

/// Primary/fallback interaction and bounded command retry
pub mod strategy;

/// The gallery application's verification suite
pub mod suite;

/// Polling wait engine
pub mod wait;

pub use browser::{console_level, render_console_args};
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumLauncher};
pub use condition::{Condition, Probe};
pub use config::{parse_window_size, RunConfig, DEFAULT_BASE_URL};
pub use driver::{
    BrowserDriver, ConsoleEntry, LogLevel, SessionConfig, SessionLauncher, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH,
};
pub use harness::{
    run_parallel, AbortSignal, CaseBody, HarnessState, Intent, TestCase, TestHarness, TestSuite,
};
pub use report::{Outcome, RunReport, TestResult};
pub use result::{ensure, VigilError, VigilResult};
pub use selector::{ElementRef, ElementSnapshot, Selector};
pub use session::{Session, SessionState};
pub use strategy::{retry_command, with_fallback, RetryConfig, Route, Routed};
pub use suite::gallery_suite;
pub use wait::{WaitOptions, WaitResult, Waiter};

/// Prelude for writing cases
pub mod prelude {
    pub use super::condition::{
        document_ready, element_clickable, element_present, script_truthy, text_equals,
        title_present, url_contains, viewport_is,
    };
    pub use super::{
        ensure, with_fallback, Intent, Outcome, RunConfig, RunReport, Selector, Session,
        TestCase, TestHarness, TestSuite, VigilError, VigilResult, WaitOptions,
    };
    pub use futures::future::BoxFuture;
}
