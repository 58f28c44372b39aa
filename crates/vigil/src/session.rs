//! Remote session handle.
//!
//! A [`Session`] owns one launched browser for the lifetime of a run. Test
//! cases borrow it mutably and in sequence; only the harness closes it.
//! Every operation on a closed session fails with
//! [`VigilError::InvalidState`].

use crate::condition::Condition;
use crate::driver::{BrowserDriver, ConsoleEntry, SessionConfig, SessionLauncher};
use crate::result::{VigilError, VigilResult};
use crate::selector::{ElementRef, Selector};
use crate::wait::{WaitOptions, WaitResult, Waiter};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Browser is live
    Open,
    /// Browser has been released
    Closed,
}

/// Handle to one live browser
pub struct Session {
    driver: Box<dyn BrowserDriver>,
    base_url: String,
    viewport: Option<(u32, u32)>,
    state: SessionState,
    waiter: Waiter,
    diagnostics: Vec<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("viewport", &self.viewport)
            .field("state", &self.state)
            .field("waiter", &self.waiter)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Launch a browser and open a session on it.
    ///
    /// # Errors
    ///
    /// [`VigilError::SessionStart`] if the browser cannot be launched;
    /// [`VigilError::InvalidState`] if the wait options are invalid.
    pub async fn open(
        launcher: &dyn SessionLauncher,
        config: &SessionConfig,
        base_url: impl Into<String>,
        wait: WaitOptions,
    ) -> VigilResult<Self> {
        let waiter = Waiter::new(wait)?;
        let base_url = base_url.into();
        info!(
            %base_url,
            headless = config.headless,
            width = config.window_size.0,
            height = config.window_size.1,
            "launching browser"
        );
        let driver = launcher.launch(config).await?;
        Ok(Self {
            driver,
            base_url,
            viewport: Some(config.window_size),
            state: SessionState::Open,
            waiter,
            diagnostics: Vec::new(),
        })
    }

    /// Wrap an already-launched driver
    pub fn from_driver(
        driver: Box<dyn BrowserDriver>,
        base_url: impl Into<String>,
        wait: WaitOptions,
    ) -> VigilResult<Self> {
        Ok(Self {
            driver,
            base_url: base_url.into(),
            viewport: None,
            state: SessionState::Open,
            waiter: Waiter::new(wait)?,
            diagnostics: Vec::new(),
        })
    }

    /// Base URL of the application under test
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path` under the base URL
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            format!("{base}/")
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the browser is still live
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Last requested viewport size, if known
    #[must_use]
    pub const fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    /// Default wait options
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        self.waiter.options()
    }

    /// Diagnostic breadcrumbs recorded so far
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Record a diagnostic breadcrumb
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "session note");
        self.diagnostics.push(message);
    }

    fn ensure_open(&self, operation: &str) -> VigilResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(VigilError::invalid_state(format!(
                "cannot {operation}: session is closed"
            )))
        }
    }

    /// Request a page load. Completion is observed with [`Self::wait_for`].
    pub async fn navigate(&mut self, url: &str) -> VigilResult<()> {
        self.ensure_open("navigate")?;
        debug!(%url, "navigate");
        self.diagnostics.push(format!("navigate {url}"));
        self.driver.navigate(url).await
    }

    /// Navigate to `path` under the base URL
    pub async fn navigate_path(&mut self, path: &str) -> VigilResult<()> {
        let url = self.url_for(path);
        self.navigate(&url).await
    }

    /// Current page URL
    pub async fn current_url(&self) -> VigilResult<String> {
        self.ensure_open("read url")?;
        self.driver.current_url().await
    }

    /// Current document title
    pub async fn title(&self) -> VigilResult<String> {
        self.ensure_open("read title")?;
        self.driver.title().await
    }

    /// Serialized DOM of the current document
    pub async fn page_source(&self) -> VigilResult<String> {
        self.ensure_open("read page source")?;
        self.driver.page_source().await
    }

    /// Every element currently matching `selector`; may be empty
    pub async fn find_all(&self, selector: &Selector) -> VigilResult<Vec<ElementRef>> {
        self.ensure_open("find elements")?;
        let snapshots = self.driver.find_all(selector).await?;
        Ok(snapshots
            .into_iter()
            .map(|snapshot| ElementRef::new(selector.clone(), snapshot))
            .collect())
    }

    /// First element matching `selector`
    ///
    /// # Errors
    ///
    /// [`VigilError::ElementNotFound`] if nothing matches right now.
    pub async fn find(&self, selector: &Selector) -> VigilResult<ElementRef> {
        self.find_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VigilError::not_found(selector.to_string()))
    }

    /// Click a previously located element
    pub async fn click(&mut self, element: &ElementRef) -> VigilResult<()> {
        self.ensure_open("click")?;
        debug!(selector = %element.selector, index = element.snapshot.index, "click");
        self.diagnostics.push(format!(
            "click {}[{}]",
            element.selector, element.snapshot.index
        ));
        self.driver
            .click(&element.selector, element.snapshot.index)
            .await
    }

    /// Evaluate script in page context
    pub async fn execute(&self, script: &str) -> VigilResult<serde_json::Value> {
        self.ensure_open("execute script")?;
        self.driver.execute(script).await
    }

    /// Resize the viewport. Layout may lag; wait on
    /// [`crate::condition::viewport_is`] before relying on it.
    pub async fn resize(&mut self, width: u32, height: u32) -> VigilResult<()> {
        self.ensure_open("resize")?;
        if width == 0 || height == 0 {
            return Err(VigilError::invalid_state(format!(
                "viewport must be positive, got {width}x{height}"
            )));
        }
        debug!(width, height, "resize");
        self.diagnostics.push(format!("resize {width}x{height}"));
        self.driver.resize(width, height).await?;
        self.viewport = Some((width, height));
        Ok(())
    }

    /// Viewport size as the page currently reports it
    pub async fn reported_viewport(&self) -> VigilResult<(u32, u32)> {
        self.ensure_open("read viewport")?;
        self.driver.viewport().await
    }

    /// `document.readyState`
    pub async fn ready_state(&self) -> VigilResult<String> {
        self.ensure_open("read ready state")?;
        self.driver.ready_state().await
    }

    /// Console entries since the last navigation
    pub async fn console_logs(&self) -> VigilResult<Vec<ConsoleEntry>> {
        self.ensure_open("read console")?;
        self.driver.console_logs().await
    }

    /// Wait for `condition` with the session's default options
    pub async fn wait_for<C: Condition>(&self, condition: C) -> VigilResult<C::Output> {
        Ok(self.wait_for_result(&condition, self.waiter).await?.value)
    }

    /// Wait for `condition` with an explicit timeout
    pub async fn wait_for_within<C: Condition>(
        &self,
        condition: C,
        timeout: Duration,
    ) -> VigilResult<C::Output> {
        Ok(self
            .wait_for_result(&condition, self.waiter.with_timeout(timeout))
            .await?
            .value)
    }

    /// Wait and keep timing details
    pub async fn wait_for_result<C: Condition + ?Sized>(
        &self,
        condition: &C,
        waiter: Waiter,
    ) -> VigilResult<WaitResult<C::Output>> {
        self.ensure_open("wait")?;
        waiter.wait_for(self, condition).await
    }

    /// Release the browser. Idempotent: only the first call reaches the
    /// driver.
    pub(crate) async fn close(&mut self) -> VigilResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        self.state = SessionState::Closed;
        info!(base_url = %self.base_url, "closing browser session");
        self.driver.quit().await.map_err(|err| {
            warn!(error = %err, "browser did not shut down cleanly");
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{document_ready, element_present, viewport_is};
    use crate::mock::{MockElement, MockHandle, MockLauncher, MockPage, MockSite};

    async fn open(site: MockSite) -> (Session, MockHandle) {
        let launcher = MockLauncher::new(site);
        let handle = launcher.handle();
        let session = Session::open(
            &launcher,
            &SessionConfig::default(),
            "http://localhost:8090",
            WaitOptions::default(),
        )
        .await
        .unwrap();
        (session, handle)
    }

    mod lifecycle_tests {
        use super::*;

        #[tokio::test]
        async fn test_open_records_window_size() {
            let (session, handle) = open(MockSite::new()).await;
            assert!(session.is_open());
            assert_eq!(session.viewport(), Some((1920, 1080)));
            assert_eq!(handle.launch_count(), 1);
        }

        #[tokio::test]
        async fn test_open_failure() {
            let launcher = MockLauncher::new(MockSite::new().fail_launch("chromium not found"));
            let result = Session::open(
                &launcher,
                &SessionConfig::default(),
                "http://localhost:8090",
                WaitOptions::default(),
            )
            .await;
            assert!(matches!(result, Err(VigilError::SessionStart { .. })));
        }

        #[tokio::test]
        async fn test_close_is_idempotent() {
            let (mut session, handle) = open(MockSite::new()).await;
            session.close().await.unwrap();
            session.close().await.unwrap();
            assert_eq!(handle.quit_count(), 1);
            assert_eq!(session.state(), SessionState::Closed);
        }

        #[tokio::test]
        async fn test_failed_close_still_marks_closed() {
            let (mut session, handle) = open(MockSite::new().fail_quit("browser hung")).await;
            assert!(session.close().await.is_err());
            assert!(session.close().await.is_ok());
            assert_eq!(handle.quit_count(), 1);
        }

        #[tokio::test]
        async fn test_operations_after_close_fail() {
            let (mut session, _) = open(MockSite::new()).await;
            session.close().await.unwrap();
            assert!(matches!(
                session.navigate_path("/").await,
                Err(VigilError::InvalidState { .. })
            ));
            assert!(matches!(
                session.title().await,
                Err(VigilError::InvalidState { .. })
            ));
            assert!(matches!(
                session.wait_for(element_present("body")).await,
                Err(VigilError::InvalidState { .. })
            ));
        }
    }

    mod navigation_tests {
        use super::*;

        #[test]
        fn test_url_for() {
            let (driver, _) = crate::mock::MockDriver::new(MockSite::new());
            let session =
                Session::from_driver(Box::new(driver), "http://localhost:8090/", WaitOptions::default())
                    .unwrap();
            assert_eq!(session.url_for("/"), "http://localhost:8090/");
            assert_eq!(session.url_for(""), "http://localhost:8090/");
            assert_eq!(session.url_for("/gallery"), "http://localhost:8090/gallery");
            assert_eq!(session.url_for("gallery"), "http://localhost:8090/gallery");
        }

        #[tokio::test]
        async fn test_navigate_path_and_find() {
            let site = MockSite::new().route(
                "/gallery",
                MockPage::new()
                    .with_title("Gallery")
                    .with_element(MockElement::button("All")),
            );
            let (mut session, handle) = open(site).await;
            session.navigate_path("/gallery").await.unwrap();
            assert_eq!(handle.navigations(), vec!["http://localhost:8090/gallery"]);
            assert_eq!(session.title().await.unwrap(), "Gallery");

            let button = session.find(&Selector::css("button")).await.unwrap();
            assert_eq!(button.text(), "All");
            assert!(matches!(
                session.find(&Selector::css("input")).await,
                Err(VigilError::ElementNotFound { .. })
            ));
            assert!(session.diagnostics()[0].starts_with("navigate"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_navigate_returns_before_load_completes() {
            let site = MockSite::new().route(
                "/",
                MockPage::new()
                    .with_element(MockElement::new("body"))
                    .ready_after(Duration::from_secs(3)),
            );
            let (mut session, _) = open(site).await;
            let start = tokio::time::Instant::now();
            session.navigate_path("/").await.unwrap();
            assert_eq!(start.elapsed(), Duration::ZERO);
            assert_eq!(session.ready_state().await.unwrap(), "loading");
            session.wait_for(document_ready()).await.unwrap();
            assert_eq!(start.elapsed(), Duration::from_secs(3));
        }

        #[tokio::test]
        async fn test_page_source_is_full_markup() {
            let site = MockSite::new().route(
                "/",
                MockPage::new().with_source("<html><script>onerror = log;</script></html>"),
            );
            let (mut session, _) = open(site).await;
            session.navigate_path("/").await.unwrap();
            assert!(session.page_source().await.unwrap().contains("onerror"));
        }

        #[tokio::test]
        async fn test_click_uses_element_position() {
            let site = MockSite::new().route(
                "/",
                MockPage::new()
                    .with_element(MockElement::button("All"))
                    .with_element(MockElement::button("Characters")),
            );
            let (mut session, handle) = open(site).await;
            session.navigate_path("/").await.unwrap();
            let buttons = session.find_all(&Selector::css("button")).await.unwrap();
            session.click(&buttons[1]).await.unwrap();
            assert!(handle.calls().contains(&"click:button[1]".to_string()));
        }
    }

    mod viewport_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_resize_then_wait_for_layout() {
            let (mut session, handle) =
                open(MockSite::new().resize_lag(Duration::from_millis(400))).await;
            session.resize(375, 667).await.unwrap();
            assert_eq!(session.viewport(), Some((375, 667)));
            assert_eq!(handle.viewport(), (1920, 1080));
            let size = session.wait_for(viewport_is(375, 667)).await.unwrap();
            assert_eq!(size, (375, 667));
        }

        #[tokio::test]
        async fn test_resize_rejects_zero() {
            let (mut session, _) = open(MockSite::new()).await;
            assert!(session.resize(0, 667).await.is_err());
            assert_eq!(session.viewport(), Some((1920, 1080)));
        }
    }

    mod wait_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_within_overrides_timeout() {
            let site = MockSite::new().route(
                "/",
                MockPage::new().with_element(
                    MockElement::new("main").appears_after(Duration::from_secs(15)),
                ),
            );
            let (mut session, _) = open(site).await;
            session.navigate_path("/").await.unwrap();
            assert!(session.wait_for(element_present("main")).await.is_err());

            session.navigate_path("/").await.unwrap();
            let main = session
                .wait_for_within(element_present("main"), Duration::from_secs(30))
                .await
                .unwrap();
            assert_eq!(main.tag(), "main");
        }
    }
}
