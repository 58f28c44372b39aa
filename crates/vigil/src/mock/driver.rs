//! In-memory browser driver.
//!
//! State lives behind an `Arc<Mutex<_>>` shared by the [`MockLauncher`], every
//! [`MockDriver`] it hands out, and any [`MockHandle`] a test keeps, so a test
//! can inspect what the harness did after the driver itself is gone.
//! Page evolution is measured on `tokio::time`, which keeps paused-clock tests
//! deterministic.

use super::page::MockPage;
use crate::driver::{BrowserDriver, ConsoleEntry, SessionConfig, SessionLauncher};
use crate::result::{VigilError, VigilResult};
use crate::selector::{ElementSnapshot, Selector};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Site definition: pages by path plus failure injection
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    routes: HashMap<String, MockPage>,
    fallback: Option<MockPage>,
    scripts: Vec<(String, Result<serde_json::Value, String>)>,
    resize_lag: Duration,
    transient_failures: usize,
    fail_launch: Option<String>,
    fail_quit: Option<String>,
}

impl MockSite {
    /// Create an empty site
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` at `path`
    #[must_use]
    pub fn route(mut self, path: impl Into<String>, page: MockPage) -> Self {
        self.routes.insert(normalize_path(&path.into()), page);
        self
    }

    /// Serve `page` for every unknown path
    #[must_use]
    pub fn fallback(mut self, page: MockPage) -> Self {
        self.fallback = Some(page);
        self
    }

    /// Answer scripts containing `needle` with `value`
    #[must_use]
    pub fn script(mut self, needle: impl Into<String>, value: serde_json::Value) -> Self {
        self.scripts.push((needle.into(), Ok(value)));
        self
    }

    /// Make scripts containing `needle` throw
    #[must_use]
    pub fn script_error(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts.push((needle.into(), Err(message.into())));
        self
    }

    /// Delay between a resize and the page reporting the new viewport
    #[must_use]
    pub const fn resize_lag(mut self, lag: Duration) -> Self {
        self.resize_lag = lag;
        self
    }

    /// Fail the next `count` element lookups with a driver error
    #[must_use]
    pub const fn transient_failures(mut self, count: usize) -> Self {
        self.transient_failures = count;
        self
    }

    /// Refuse to launch
    #[must_use]
    pub fn fail_launch(mut self, message: impl Into<String>) -> Self {
        self.fail_launch = Some(message.into());
        self
    }

    /// Fail when the browser is quit
    #[must_use]
    pub fn fail_quit(mut self, message: impl Into<String>) -> Self {
        self.fail_quit = Some(message.into());
        self
    }
}

#[derive(Debug)]
struct MockState {
    site: MockSite,
    current_url: String,
    current_page: Option<MockPage>,
    navigated_at: Instant,
    viewport: (u32, u32),
    pending_viewport: Option<((u32, u32), Instant)>,
    transient_failures: usize,
    calls: Vec<String>,
    launches: usize,
    quits: usize,
}

impl MockState {
    fn new(site: MockSite) -> Self {
        let transient_failures = site.transient_failures;
        Self {
            site,
            current_url: "about:blank".to_string(),
            current_page: None,
            navigated_at: Instant::now(),
            viewport: (0, 0),
            pending_viewport: None,
            transient_failures,
            calls: Vec::new(),
            launches: 0,
            quits: 0,
        }
    }

    fn elapsed(&self) -> Duration {
        self.navigated_at.elapsed()
    }

    /// Serve the page for `url`, following a scripted redirect
    fn load(&mut self, url: &str) {
        let page = self
            .site
            .routes
            .get(&path_of(url))
            .or(self.site.fallback.as_ref())
            .cloned();
        let (url, page) = match page.as_ref().and_then(|p| p.redirect_to.clone()) {
            Some(target) => {
                let target = normalize_path(&target);
                let redirected = self.site.routes.get(&target).cloned();
                (format!("{}{target}", origin_of(url)), redirected)
            }
            None => (url.to_string(), page),
        };
        self.current_url = url;
        self.current_page = Some(page.unwrap_or_default());
        self.navigated_at = Instant::now();
    }

    fn settle_viewport(&mut self) {
        if let Some((size, at)) = self.pending_viewport {
            if Instant::now() >= at {
                self.viewport = size;
                self.pending_viewport = None;
            }
        }
    }
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Path component of an absolute URL
fn path_of(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.find('/')
        .map_or_else(|| "/".to_string(), |i| normalize_path(&rest[i..]))
}

/// Scheme and authority of an absolute URL
fn origin_of(url: &str) -> &str {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let end = rest.find('/').unwrap_or(rest.len());
            &url[..scheme.len() + 3 + end]
        }
        None => "",
    }
}

/// Test-side view of the mock browser
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Shared,
}

impl MockHandle {
    /// Every driver call in order (`"navigate:<url>"`, `"resize:375x667"`, ...)
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        lock(&self.state).calls.iter().any(|c| c.starts_with(method))
    }

    /// URLs navigated to, in order
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|c| c.strip_prefix("navigate:").map(str::to_string))
            .collect()
    }

    /// Number of launches
    #[must_use]
    pub fn launch_count(&self) -> usize {
        lock(&self.state).launches
    }

    /// Number of times the browser was quit
    #[must_use]
    pub fn quit_count(&self) -> usize {
        lock(&self.state).quits
    }

    /// Viewport the page currently reports
    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        let mut state = lock(&self.state);
        state.settle_viewport();
        state.viewport
    }
}

/// Launcher for [`MockDriver`]s over one [`MockSite`]
#[derive(Debug, Clone)]
pub struct MockLauncher {
    state: Shared,
}

impl MockLauncher {
    /// Create a launcher serving `site`
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new(site))),
        }
    }

    /// Handle for inspecting the browser after a run
    #[must_use]
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    async fn launch(&self, config: &SessionConfig) -> VigilResult<Box<dyn BrowserDriver>> {
        let mut state = lock(&self.state);
        state.calls.push(format!("launch:{}", config.args().join(" ")));
        if let Some(message) = &state.site.fail_launch {
            return Err(VigilError::session_start(message.clone()));
        }
        state.launches += 1;
        state.viewport = config.window_size;
        Ok(Box::new(MockDriver {
            state: Arc::clone(&self.state),
        }))
    }
}

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    state: Shared,
}

impl MockDriver {
    /// Driver over `site` without going through a launcher
    #[must_use]
    pub fn new(site: MockSite) -> (Self, MockHandle) {
        let launcher = MockLauncher::new(site);
        let handle = launcher.handle();
        (
            Self {
                state: launcher.state,
            },
            handle,
        )
    }

    fn with_page<T>(&self, f: impl FnOnce(&MockPage, Duration) -> T) -> Option<T> {
        let state = lock(&self.state);
        let elapsed = state.elapsed();
        state.current_page.as_ref().map(|page| f(page, elapsed))
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> VigilResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(format!("navigate:{url}"));
        state.load(url);
        Ok(())
    }

    async fn current_url(&self) -> VigilResult<String> {
        Ok(lock(&self.state).current_url.clone())
    }

    async fn title(&self) -> VigilResult<String> {
        Ok(self.with_page(|page, _| page.title.clone()).unwrap_or_default())
    }

    async fn page_source(&self) -> VigilResult<String> {
        Ok(self
            .with_page(MockPage::render_source)
            .unwrap_or_else(|| "<html><head></head><body></body></html>".to_string()))
    }

    async fn find_all(&self, selector: &Selector) -> VigilResult<Vec<ElementSnapshot>> {
        {
            let mut state = lock(&self.state);
            state.calls.push(format!("find_all:{selector}"));
            if state.transient_failures > 0 {
                state.transient_failures -= 1;
                return Err(VigilError::driver("node is detached from document"));
            }
        }
        Ok(self
            .with_page(|page, elapsed| {
                page.elements
                    .iter()
                    .filter(|e| e.appears_after <= elapsed && e.matches(selector))
                    .enumerate()
                    .map(|(index, e)| {
                        let mut snapshot = e.snapshot.clone();
                        snapshot.index = index;
                        if snapshot.tag == "body" && snapshot.text.is_empty() {
                            snapshot.text = page.body_text(elapsed);
                        }
                        snapshot
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn click(&self, selector: &Selector, index: usize) -> VigilResult<()> {
        let target = self.find_all(selector).await?.into_iter().nth(index);
        let mut state = lock(&self.state);
        state.calls.push(format!("click:{selector}[{index}]"));
        let Some(target) = target else {
            return Err(VigilError::not_found(selector.to_string()));
        };
        if target.tag == "a" {
            if let Some(href) = target.attributes.get("href") {
                let url = if href.contains("://") {
                    href.clone()
                } else {
                    format!("{}{}", origin_of(&state.current_url), normalize_path(href))
                };
                state.load(&url);
            }
        }
        Ok(())
    }

    async fn execute(&self, script: &str) -> VigilResult<serde_json::Value> {
        let mut state = lock(&self.state);
        state.calls.push(format!("execute:{script}"));
        match state
            .site
            .scripts
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
        {
            Some((_, Ok(value))) => Ok(value.clone()),
            Some((_, Err(message))) => Err(VigilError::script(message.clone())),
            None => Ok(serde_json::Value::Null),
        }
    }

    async fn resize(&mut self, width: u32, height: u32) -> VigilResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(format!("resize:{width}x{height}"));
        let lag = state.site.resize_lag;
        if lag.is_zero() {
            state.viewport = (width, height);
            state.pending_viewport = None;
        } else {
            state.pending_viewport = Some(((width, height), Instant::now() + lag));
        }
        Ok(())
    }

    async fn viewport(&self) -> VigilResult<(u32, u32)> {
        let mut state = lock(&self.state);
        state.settle_viewport();
        Ok(state.viewport)
    }

    async fn ready_state(&self) -> VigilResult<String> {
        Ok(self
            .with_page(|page, elapsed| {
                if elapsed >= page.ready_after {
                    "complete".to_string()
                } else {
                    "loading".to_string()
                }
            })
            .unwrap_or_else(|| "complete".to_string()))
    }

    async fn console_logs(&self) -> VigilResult<Vec<ConsoleEntry>> {
        Ok(self
            .with_page(|page, _| page.console.clone())
            .unwrap_or_default())
    }

    async fn quit(&mut self) -> VigilResult<()> {
        let mut state = lock(&self.state);
        state.calls.push("quit".to_string());
        state.quits += 1;
        match &state.site.fail_quit {
            Some(message) => Err(VigilError::driver(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockElement;

    #[test]
    fn test_path_of() {
        assert_eq!(path_of("http://localhost:8090"), "/");
        assert_eq!(path_of("http://localhost:8090/"), "/");
        assert_eq!(path_of("http://localhost:8090/gallery"), "/gallery");
        assert_eq!(path_of("http://localhost:8090/gallery/?q=1"), "/gallery");
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(origin_of("http://localhost:8090/a/b"), "http://localhost:8090");
        assert_eq!(origin_of("http://localhost:8090"), "http://localhost:8090");
    }

    #[tokio::test]
    async fn test_navigate_serves_route() {
        let site = MockSite::new().route("/", MockPage::new().with_title("Home"));
        let (mut driver, handle) = MockDriver::new(site);
        driver.navigate("http://localhost:8090").await.unwrap();
        assert_eq!(driver.title().await.unwrap(), "Home");
        assert_eq!(handle.navigations(), vec!["http://localhost:8090"]);
    }

    #[tokio::test]
    async fn test_unknown_route_uses_fallback() {
        let site = MockSite::new().fallback(MockPage::new().with_title("Not Found"));
        let (mut driver, _) = MockDriver::new(site);
        driver.navigate("http://host/nope").await.unwrap();
        assert_eq!(driver.title().await.unwrap(), "Not Found");
    }

    #[tokio::test]
    async fn test_redirect_updates_url() {
        let site = MockSite::new()
            .route("/old", MockPage::new().redirect_to("/gallery"))
            .route("/gallery", MockPage::new().with_title("Gallery"));
        let (mut driver, _) = MockDriver::new(site);
        driver.navigate("http://host:1/old").await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "http://host:1/gallery");
        assert_eq!(driver.title().await.unwrap(), "Gallery");
    }

    #[tokio::test(start_paused = true)]
    async fn test_elements_attach_after_delay() {
        let site = MockSite::new().route(
            "/",
            MockPage::new().with_element(
                MockElement::button("All").appears_after(Duration::from_secs(2)),
            ),
        );
        let (mut driver, _) = MockDriver::new(site);
        driver.navigate("http://host/").await.unwrap();
        let button = Selector::css("button");
        assert!(driver.find_all(&button).await.unwrap().is_empty());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(driver.find_all(&button).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_then_recover() {
        let site = MockSite::new().transient_failures(2);
        let (driver, _) = MockDriver::new(site);
        let body = Selector::css("body");
        assert!(driver.find_all(&body).await.is_err());
        assert!(driver.find_all(&body).await.is_err());
        assert!(driver.find_all(&body).await.is_ok());
    }

    #[tokio::test]
    async fn test_scripts() {
        let site = MockSite::new()
            .script("2 + 2", serde_json::json!(4))
            .script_error("throw", "Error: boom");
        let (driver, _) = MockDriver::new(site);
        assert_eq!(driver.execute("2 + 2").await.unwrap(), 4);
        assert!(matches!(
            driver.execute("throw new Error()").await,
            Err(VigilError::ScriptExecution { .. })
        ));
        assert_eq!(driver.execute("1").await.unwrap(), serde_json::Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_lag() {
        let site = MockSite::new().resize_lag(Duration::from_millis(300));
        let launcher = MockLauncher::new(site);
        let mut driver = launcher
            .launch(&SessionConfig::default())
            .await
            .unwrap();
        driver.resize(375, 667).await.unwrap();
        assert_eq!(driver.viewport().await.unwrap(), (1920, 1080));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(driver.viewport().await.unwrap(), (375, 667));
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let launcher = MockLauncher::new(MockSite::new().fail_launch("no chromium"));
        let result = launcher.launch(&SessionConfig::default()).await;
        assert!(matches!(result, Err(VigilError::SessionStart { .. })));
        assert_eq!(launcher.handle().launch_count(), 0);
    }

    #[tokio::test]
    async fn test_clicking_link_follows_href() {
        let site = MockSite::new()
            .route("/", MockPage::new().with_element(MockElement::link("Gallery", "/gallery")))
            .route("/gallery", MockPage::new().with_title("Gallery"));
        let (mut driver, _) = MockDriver::new(site);
        driver.navigate("http://host:1/").await.unwrap();
        driver.click(&Selector::link_text("Gallery"), 0).await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "http://host:1/gallery");
        assert_eq!(driver.title().await.unwrap(), "Gallery");
    }

    #[tokio::test]
    async fn test_click_missing_element() {
        let (driver, handle) = MockDriver::new(MockSite::new());
        let result = driver.click(&Selector::css("button"), 0).await;
        assert!(matches!(result, Err(VigilError::ElementNotFound { .. })));
        assert!(handle.was_called("click"));
    }
}
