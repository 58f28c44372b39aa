//! Result and error types for Vigil.

use std::time::Duration;
use thiserror::Error;

use crate::report::RunReport;

/// Result type for Vigil operations
pub type VigilResult<T> = Result<T, VigilError>;

/// Errors that can occur in Vigil
#[derive(Debug, Error)]
pub enum VigilError {
    /// Browser process could not be launched or connected to
    #[error("Failed to start browser session: {message}")]
    SessionStart {
        /// Error message
        message: String,
    },

    /// A condition did not match before its deadline
    #[error("Timed out after {}ms waiting for {condition} (last state: {last_state})", elapsed.as_millis())]
    WaitTimeout {
        /// Name of the condition that was polled
        condition: String,
        /// Time spent polling
        elapsed: Duration,
        /// Last observed state, for diagnostics
        last_state: String,
    },

    /// Script raised an exception in page context
    #[error("Script execution failed: {message}")]
    ScriptExecution {
        /// Error message
        message: String,
    },

    /// Expected-vs-actual mismatch
    #[error("Assertion failed: {message} (expected {expected}, got {actual})")]
    Assertion {
        /// What was being checked
        message: String,
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },

    /// Element lookup came back empty
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// Navigation request was rejected
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Transient remote-side error reported by the driver
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// A case exceeded its time budget
    #[error("Case exceeded its {}ms budget", budget.as_millis())]
    CaseTimeout {
        /// Budget that was exceeded
        budget: Duration,
    },

    /// Session could not be released during final teardown
    #[error("Failed to close browser session: {message}")]
    Teardown {
        /// Error message
        message: String,
        /// Report of the run that completed before teardown failed
        report: Box<RunReport>,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl VigilError {
    /// Create a session start error
    #[must_use]
    pub fn session_start(message: impl Into<String>) -> Self {
        Self::SessionStart {
            message: message.into(),
        }
    }

    /// Create a script execution error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::ScriptExecution {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create an element-not-found error
    #[must_use]
    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an assertion error recording both values
    #[must_use]
    pub fn assertion(
        message: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::Assertion {
            message: message.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether a fallback strategy may take over after this error.
    ///
    /// Only a timed-out wait or an empty lookup qualifies; everything else
    /// propagates.
    #[must_use]
    pub const fn permits_fallback(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. } | Self::ElementNotFound { .. })
    }

    /// Whether this error is a genuine verification failure rather than an
    /// infrastructure problem.
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::WaitTimeout { .. }
                | Self::ScriptExecution { .. }
                | Self::Assertion { .. }
                | Self::ElementNotFound { .. }
        )
    }

    /// Whether this error may clear up on a later poll
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Driver { .. } | Self::ElementNotFound { .. } | Self::ScriptExecution { .. }
        )
    }
}

/// Fail with an [`VigilError::Assertion`] unless `condition` holds
pub fn ensure(
    condition: bool,
    message: impl Into<String>,
    expected: impl std::fmt::Display,
    actual: impl std::fmt::Display,
) -> VigilResult<()> {
    if condition {
        Ok(())
    } else {
        Err(VigilError::assertion(message, expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_timeout_message_names_condition_and_elapsed() {
        let err = VigilError::WaitTimeout {
            condition: "element-present(button)".to_string(),
            elapsed: Duration::from_millis(10_000),
            last_state: "0 elements".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("element-present(button)"));
        assert!(msg.contains("10000ms"));
        assert!(msg.contains("0 elements"));
    }

    #[test]
    fn test_assertion_records_expected_and_actual() {
        let err = VigilError::assertion("js arithmetic", 4, 5);
        let msg = err.to_string();
        assert!(msg.contains("expected 4"));
        assert!(msg.contains("got 5"));
    }

    #[test]
    fn test_fallback_classification() {
        assert!(VigilError::not_found("a").permits_fallback());
        assert!(VigilError::WaitTimeout {
            condition: String::new(),
            elapsed: Duration::ZERO,
            last_state: String::new(),
        }
        .permits_fallback());
        assert!(!VigilError::driver("socket closed").permits_fallback());
        assert!(!VigilError::script("boom").permits_fallback());
    }

    #[test]
    fn test_verification_failure_classification() {
        assert!(VigilError::assertion("x", 1, 2).is_verification_failure());
        assert!(VigilError::script("ReferenceError").is_verification_failure());
        assert!(!VigilError::driver("gone").is_verification_failure());
        assert!(!VigilError::CaseTimeout {
            budget: Duration::from_secs(1)
        }
        .is_verification_failure());
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "ok", 1, 1).is_ok());
        let err = ensure(false, "count", "> 0", 0).unwrap_err();
        assert!(matches!(err, VigilError::Assertion { .. }));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VigilError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
