//! Recovery strategies for test cases: a primary/fallback pair and bounded
//! retry of a single flaky remote command.

use crate::result::{VigilError, VigilResult};
use crate::session::Session;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Which strategy produced the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    /// The preferred interaction succeeded
    Primary,
    /// The primary failed recoverably and the alternative succeeded
    Fallback,
}

/// Value produced by [`with_fallback`]
#[derive(Debug)]
pub struct Routed<T> {
    /// Extracted value
    pub value: T,
    /// Path that produced it
    pub route: Route,
    /// Why the primary was abandoned, if it was
    pub primary_error: Option<VigilError>,
}

/// Run `primary`; if it fails with a timed-out wait or a missing element,
/// run `fallback` instead. Any other primary error propagates unchanged.
///
/// Both strategies are function items over the session:
///
/// ```rust,ignore
/// fn via_link(s: &mut Session) -> BoxFuture<'_, VigilResult<String>> { ... }
/// fn via_url(s: &mut Session) -> BoxFuture<'_, VigilResult<String>> { ... }
///
/// let routed = with_fallback(session, via_link, via_url).await?;
/// ```
pub async fn with_fallback<T, P, F>(
    session: &mut Session,
    primary: P,
    fallback: F,
) -> VigilResult<Routed<T>>
where
    P: for<'a> FnOnce(&'a mut Session) -> BoxFuture<'a, VigilResult<T>>,
    F: for<'a> FnOnce(&'a mut Session) -> BoxFuture<'a, VigilResult<T>>,
{
    let attempt = primary(session).await;
    match attempt {
        Ok(value) => Ok(Routed {
            value,
            route: Route::Primary,
            primary_error: None,
        }),
        Err(err) if err.permits_fallback() => {
            info!(error = %err, "primary strategy failed; using fallback");
            session.note(format!("fallback after: {err}"));
            let value = fallback(session).await?;
            Ok(Routed {
                value,
                route: Route::Fallback,
                primary_error: Some(err),
            })
        }
        Err(err) => Err(err),
    }
}

/// Bounds for [`retry_command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Create a retry config
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Set maximum attempts
    #[must_use]
    pub const fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Set the delay between attempts
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Only remote-side hiccups are worth repeating
const fn is_retryable(err: &VigilError) -> bool {
    matches!(err, VigilError::Driver { .. } | VigilError::Navigation { .. })
}

/// Retry `op` on driver or navigation errors, at most
/// `config.max_attempts` times in total. Other errors return immediately.
///
/// ```rust,ignore
/// let source = retry_command(RetryConfig::default(), move || session.page_source()).await?;
/// ```
///
/// # Errors
///
/// The last error once attempts are exhausted; [`VigilError::InvalidState`]
/// if `max_attempts` is zero.
pub async fn retry_command<T, Op, Fut>(config: RetryConfig, mut op: Op) -> VigilResult<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = VigilResult<T>>,
{
    if config.max_attempts == 0 {
        return Err(VigilError::invalid_state("max_attempts must be at least 1"));
    }
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) && attempt < config.max_attempts => {
                debug!(attempt, max = config.max_attempts, error = %err, "retrying command");
                attempt += 1;
                tokio::time::sleep(config.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
