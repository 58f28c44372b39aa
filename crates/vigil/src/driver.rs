//! BrowserDriver - Abstract Browser Automation Trait
//!
//! The harness never talks to a concrete browser. Everything goes through
//! [`BrowserDriver`] (one live page) and [`SessionLauncher`] (process
//! startup), so the Chromium backend and the in-memory [`crate::mock`]
//! backend are interchangeable.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SessionLauncher ──launch(SessionConfig)──► BrowserDriver     │
//! │                                                              │
//! │  ┌─────────────────────┐        ┌─────────────────────┐      │
//! │  │  ChromiumDriver     │        │  MockDriver         │      │
//! │  │  (feature browser)  │        │  (unit tests)       │      │
//! │  │  CDP/chromiumoxide  │        │  scripted pages     │      │
//! │  └─────────────────────┘        └─────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::result::VigilResult;
use crate::selector::{ElementSnapshot, Selector};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default window width
pub const DEFAULT_WINDOW_WIDTH: u32 = 1920;

/// Default window height
pub const DEFAULT_WINDOW_HEIGHT: u32 = 1080;

/// Options used to launch one browser instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Initial window size (width, height)
    pub window_size: (u32, u32),
    /// Pass `--disable-gpu`
    pub disable_gpu: bool,
    /// Pass `--no-sandbox` (containers/CI)
    pub no_sandbox: bool,
    /// Additional command-line flags
    pub extra_flags: BTreeSet<String>,
    /// Browser executable override
    pub chromium_path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
            disable_gpu: true,
            no_sandbox: true,
            extra_flags: BTreeSet::from(["--disable-dev-shm-usage".to_string()]),
            chromium_path: None,
        }
    }
}

impl SessionConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set window dimensions
    #[must_use]
    pub const fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Toggle `--disable-gpu`
    #[must_use]
    pub const fn disable_gpu(mut self, disable: bool) -> Self {
        self.disable_gpu = disable;
        self
    }

    /// Toggle `--no-sandbox`
    #[must_use]
    pub const fn no_sandbox(mut self, no_sandbox: bool) -> Self {
        self.no_sandbox = no_sandbox;
        self
    }

    /// Add an extra browser flag
    #[must_use]
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.extra_flags.insert(flag.into());
        self
    }

    /// Set browser executable path
    #[must_use]
    pub fn chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Full argument list handed to the browser process
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless".to_string());
        }
        if self.no_sandbox {
            args.push("--no-sandbox".to_string());
        }
        if self.disable_gpu {
            args.push("--disable-gpu".to_string());
        }
        args.push(format!(
            "--window-size={},{}",
            self.window_size.0, self.window_size.1
        ));
        args.extend(self.extra_flags.iter().cloned());
        args
    }
}

/// Severity of a browser console entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    /// Informational output (`console.log`, `console.info`, `console.debug`)
    Info,
    /// `console.warn`
    Warning,
    /// `console.error` and uncaught exceptions
    Severe,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Severe => write!(f, "SEVERE"),
        }
    }
}

/// One entry of the browser console log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
}

impl ConsoleEntry {
    /// Create a console entry
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Capability interface over one live browser page.
///
/// `navigate` only requests a load; completion is observed through
/// conditions. Query methods return snapshots.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Request a page load. Returns once the navigation is committed, without
    /// waiting for the load event.
    async fn navigate(&mut self, url: &str) -> VigilResult<()>;

    /// Current page URL
    async fn current_url(&self) -> VigilResult<String>;

    /// Current document title (empty if none)
    async fn title(&self) -> VigilResult<String>;

    /// Serialized DOM of the current document
    async fn page_source(&self) -> VigilResult<String>;

    /// Snapshot of every element matching `selector`, possibly empty
    async fn find_all(&self, selector: &Selector) -> VigilResult<Vec<ElementSnapshot>>;

    /// Click the `index`-th match of `selector`
    async fn click(&self, selector: &Selector, index: usize) -> VigilResult<()>;

    /// Evaluate script in page context
    async fn execute(&self, script: &str) -> VigilResult<serde_json::Value>;

    /// Resize the viewport; acknowledged before layout settles
    async fn resize(&mut self, width: u32, height: u32) -> VigilResult<()>;

    /// Viewport size as currently reported by the page
    async fn viewport(&self) -> VigilResult<(u32, u32)>;

    /// `document.readyState`
    async fn ready_state(&self) -> VigilResult<String>;

    /// Console entries recorded since the last navigation
    async fn console_logs(&self) -> VigilResult<Vec<ConsoleEntry>>;

    /// Release the browser process
    async fn quit(&mut self) -> VigilResult<()>;
}

/// Starts browser instances
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Launch one browser and return a driver for its page
    async fn launch(&self, config: &SessionConfig) -> VigilResult<Box<dyn BrowserDriver>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod session_config_tests {
        use super::*;

        #[test]
        fn test_config_default() {
            let config = SessionConfig::default();
            assert!(config.headless);
            assert_eq!(config.window_size, (1920, 1080));
            assert!(config.disable_gpu);
            assert!(config.extra_flags.contains("--disable-dev-shm-usage"));
        }

        #[test]
        fn test_config_builder() {
            let config = SessionConfig::new()
                .headless(false)
                .window_size(800, 600)
                .disable_gpu(false)
                .flag("--remote-allow-origins=*")
                .chromium_path("/usr/bin/chromium");

            assert!(!config.headless);
            assert_eq!(config.window_size, (800, 600));
            assert!(!config.disable_gpu);
            assert!(config.extra_flags.contains("--remote-allow-origins=*"));
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }

        #[test]
        fn test_args() {
            let args = SessionConfig::default().args();
            assert!(args.contains(&"--headless".to_string()));
            assert!(args.contains(&"--no-sandbox".to_string()));
            assert!(args.contains(&"--disable-gpu".to_string()));
            assert!(args.contains(&"--window-size=1920,1080".to_string()));
            assert!(args.contains(&"--disable-dev-shm-usage".to_string()));
        }

        #[test]
        fn test_args_headed_without_gpu_flag() {
            let args = SessionConfig::new()
                .headless(false)
                .disable_gpu(false)
                .args();
            assert!(!args.contains(&"--headless".to_string()));
            assert!(!args.contains(&"--disable-gpu".to_string()));
        }
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Severe > LogLevel::Warning);
        assert!(LogLevel::Warning > LogLevel::Info);
        assert_eq!(LogLevel::Severe.to_string(), "SEVERE");
    }
}
