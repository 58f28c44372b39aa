//! Run configuration.
//!
//! Loaded from YAML (`vigil.yaml`) and then overridden field by field by the
//! CLI. Every consumer goes through [`RunConfig::validate`] first.

use crate::driver::{SessionConfig, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};
use crate::result::{VigilError, VigilResult};
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default base URL of the application under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:8090";

/// Everything needed to run a suite against one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Base URL of the application under test
    pub base_url: String,
    /// Run the browser without a window
    pub headless: bool,
    /// Initial window size `[width, height]`
    pub window_size: (u32, u32),
    /// Default wait timeout
    pub default_timeout_ms: u64,
    /// Wait engine poll interval
    pub poll_interval_ms: u64,
    /// Pass `--disable-gpu`
    pub disable_gpu: bool,
    /// Pass `--no-sandbox`
    pub no_sandbox: bool,
    /// Extra browser flags
    pub extra_flags: Vec<String>,
    /// Browser executable override
    pub chromium_path: Option<String>,
    /// Per-case time budget
    pub case_timeout_ms: Option<u64>,
    /// Whole-run time budget; checked between cases
    pub suite_timeout_ms: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: session.headless,
            window_size: (DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            disable_gpu: session.disable_gpu,
            no_sandbox: session.no_sandbox,
            extra_flags: session.extra_flags.into_iter().collect(),
            chromium_path: None,
            case_timeout_ms: None,
            suite_timeout_ms: None,
        }
    }
}

impl RunConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML; missing fields take their defaults
    pub fn from_yaml_str(yaml: &str) -> VigilResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load YAML from a file
    pub fn from_file(path: &Path) -> VigilResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> VigilResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set window size
    #[must_use]
    pub const fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Set default wait timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set per-case time budget
    #[must_use]
    pub const fn with_case_timeout(mut self, timeout_ms: u64) -> Self {
        self.case_timeout_ms = Some(timeout_ms);
        self
    }

    /// Set whole-run time budget
    #[must_use]
    pub const fn with_suite_timeout(mut self, timeout_ms: u64) -> Self {
        self.suite_timeout_ms = Some(timeout_ms);
        self
    }

    /// Set browser executable
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Add a browser flag
    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        if !self.extra_flags.contains(&flag) {
            self.extra_flags.push(flag);
        }
        self
    }

    /// Check invariants
    ///
    /// # Errors
    ///
    /// [`VigilError::InvalidState`] naming the offending field.
    pub fn validate(&self) -> VigilResult<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(VigilError::invalid_state("base_url must not be empty"));
        }
        let Some((scheme, rest)) = base.split_once("://") else {
            return Err(VigilError::invalid_state(format!(
                "base_url must be an absolute URL, got {base:?}"
            )));
        };
        if !matches!(scheme, "http" | "https") || rest.is_empty() {
            return Err(VigilError::invalid_state(format!(
                "base_url must use http or https, got {base:?}"
            )));
        }
        if self.window_size.0 == 0 || self.window_size.1 == 0 {
            return Err(VigilError::invalid_state(format!(
                "window_size must be positive, got {}x{}",
                self.window_size.0, self.window_size.1
            )));
        }
        if self.default_timeout_ms == 0 {
            return Err(VigilError::invalid_state(
                "default_timeout_ms must be positive",
            ));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms >= self.default_timeout_ms {
            return Err(VigilError::invalid_state(format!(
                "poll_interval_ms must be between 1 and default_timeout_ms ({}), got {}",
                self.default_timeout_ms, self.poll_interval_ms
            )));
        }
        if self.case_timeout_ms == Some(0) {
            return Err(VigilError::invalid_state("case_timeout_ms must be positive"));
        }
        if self.suite_timeout_ms == Some(0) {
            return Err(VigilError::invalid_state("suite_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Browser launch options
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new()
            .headless(self.headless)
            .window_size(self.window_size.0, self.window_size.1)
            .disable_gpu(self.disable_gpu)
            .no_sandbox(self.no_sandbox);
        config.extra_flags = self.extra_flags.iter().cloned().collect();
        config.chromium_path.clone_from(&self.chromium_path);
        config
    }

    /// Wait engine defaults
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.default_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Per-case time budget
    #[must_use]
    pub fn case_timeout(&self) -> Option<Duration> {
        self.case_timeout_ms.map(Duration::from_millis)
    }

    /// Whole-run time budget
    #[must_use]
    pub fn suite_timeout(&self) -> Option<Duration> {
        self.suite_timeout_ms.map(Duration::from_millis)
    }
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_window_size(s: &str) -> VigilResult<(u32, u32)> {
    let invalid = || VigilError::invalid_state(format!("expected WIDTHxHEIGHT, got {s:?}"));
    let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod load_tests {
        use super::*;

        #[test]
        fn test_defaults_are_valid() {
            let config = RunConfig::default();
            assert!(config.validate().is_ok());
            assert_eq!(config.base_url, "http://localhost:8090");
            assert_eq!(config.window_size, (1920, 1080));
            assert_eq!(config.default_timeout_ms, 10_000);
        }

        #[test]
        fn test_partial_yaml_fills_defaults() {
            let config = RunConfig::from_yaml_str(
                "base_url: https://staging.example.com\nwindow_size: [1280, 720]\ncase_timeout_ms: 60000\n",
            )
            .unwrap();
            assert_eq!(config.base_url, "https://staging.example.com");
            assert_eq!(config.window_size, (1280, 720));
            assert_eq!(config.case_timeout(), Some(Duration::from_secs(60)));
            assert!(config.headless);
            assert_eq!(config.poll_interval_ms, 250);
        }

        #[test]
        fn test_unknown_field_rejected() {
            let err = RunConfig::from_yaml_str("base_url: http://x\nheadles: false\n").unwrap_err();
            assert!(matches!(err, VigilError::Yaml(_)));
        }

        #[test]
        fn test_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("vigil.yaml");
            std::fs::write(&path, "headless: false\n").unwrap();
            let config = RunConfig::from_file(&path).unwrap();
            assert!(!config.headless);
        }

        #[test]
        fn test_missing_file() {
            let err = RunConfig::from_file(Path::new("/nonexistent/vigil.yaml")).unwrap_err();
            assert!(matches!(err, VigilError::Io(_)));
        }

        #[test]
        fn test_yaml_roundtrip_preserves_flags() {
            let config = RunConfig::new().with_flag("--lang=en");
            let back = RunConfig::from_yaml_str(&config.to_yaml().unwrap()).unwrap();
            assert_eq!(back, config);
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_rejects_bad_base_url() {
            for url in ["", "localhost:8090", "ftp://host", "http://"] {
                let config = RunConfig::new().with_base_url(url);
                assert!(config.validate().is_err(), "{url:?} should be rejected");
            }
        }

        #[test]
        fn test_rejects_zero_window() {
            assert!(RunConfig::new().with_window_size(0, 600).validate().is_err());
        }

        #[test]
        fn test_poll_interval_must_be_below_timeout() {
            assert!(RunConfig::new()
                .with_timeout(1_000)
                .with_poll_interval(1_000)
                .validate()
                .is_err());
            assert!(RunConfig::new().with_poll_interval(0).validate().is_err());
            assert!(RunConfig::new()
                .with_timeout(1_000)
                .with_poll_interval(999)
                .validate()
                .is_ok());
        }
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn test_session_config() {
            let session = RunConfig::new()
                .with_headless(false)
                .with_window_size(375, 667)
                .with_chromium_path("/opt/chromium")
                .session_config();
            assert!(!session.headless);
            assert_eq!(session.window_size, (375, 667));
            assert_eq!(session.chromium_path.as_deref(), Some("/opt/chromium"));
            assert!(session.extra_flags.contains("--disable-dev-shm-usage"));
        }

        #[test]
        fn test_wait_options() {
            let options = RunConfig::new().with_timeout(5_000).wait_options();
            assert_eq!(options.timeout(), Duration::from_secs(5));
            assert_eq!(options.poll_interval(), Duration::from_millis(250));
        }
    }

    #[test]
    fn test_parse_window_size() {
        assert_eq!(parse_window_size("375x667").unwrap(), (375, 667));
        assert_eq!(parse_window_size("1920X1080").unwrap(), (1920, 1080));
        assert!(parse_window_size("1920").is_err());
        assert!(parse_window_size("0x10").is_err());
        assert!(parse_window_size("axb").is_err());
    }
}
