//! Chromium backend over the Chrome `DevTools` Protocol.
//!
//! Compiled with the `browser` feature. [`ChromiumLauncher`] starts one
//! browser process per run; [`ChromiumDriver`] drives its single page.
//! Element lookups and clicks go through page-side scripts built by
//! [`crate::selector::Selector`], so both backends see the same
//! [`crate::selector::ElementSnapshot`] shape.

use crate::driver::LogLevel;

/// Map a `console.*` call type to a log level
#[must_use]
pub fn console_level(kind: &str) -> LogLevel {
    match kind {
        "error" | "assert" => LogLevel::Severe,
        "warning" | "warn" => LogLevel::Warning,
        _ => LogLevel::Info,
    }
}

/// Render console call arguments the way devtools prints them
#[must_use]
pub fn render_console_args(args: &[(Option<serde_json::Value>, Option<String>)]) -> String {
    args.iter()
        .filter_map(|(value, description)| match value {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => description.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
mod cdp {
    use super::{console_level, render_console_args};
    use crate::driver::{BrowserDriver, ConsoleEntry, LogLevel, SessionConfig, SessionLauncher};
    use crate::result::{VigilError, VigilResult};
    use crate::selector::{ElementSnapshot, Selector};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
    use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
    use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
    use chromiumoxide::Page;
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use tracing::{debug, warn};

    /// Launches a local Chromium process
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ChromiumLauncher;

    impl ChromiumLauncher {
        /// Create a launcher
        #[must_use]
        pub const fn new() -> Self {
            Self
        }
    }

    #[async_trait]
    impl SessionLauncher for ChromiumLauncher {
        async fn launch(&self, config: &SessionConfig) -> VigilResult<Box<dyn BrowserDriver>> {
            Ok(Box::new(ChromiumDriver::launch(config).await?))
        }
    }

    /// One Chromium process with a single page
    pub struct ChromiumDriver {
        browser: Browser,
        page: Page,
        console: Arc<Mutex<Vec<ConsoleEntry>>>,
        tasks: Vec<JoinHandle<()>>,
    }

    impl std::fmt::Debug for ChromiumDriver {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ChromiumDriver")
                .field("tasks", &self.tasks.len())
                .finish_non_exhaustive()
        }
    }

    impl ChromiumDriver {
        /// Start the browser and open a blank page
        pub async fn launch(config: &SessionConfig) -> VigilResult<Self> {
            let (width, height) = config.window_size;
            let mut builder = BrowserConfig::builder()
                .window_size(width, height)
                .viewport(None);
            if !config.headless {
                builder = builder.with_head();
            }
            if config.no_sandbox {
                builder = builder.no_sandbox();
            }
            if config.disable_gpu {
                builder = builder.arg("--disable-gpu");
            }
            for flag in &config.extra_flags {
                builder = builder.arg(flag.as_str());
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder.build().map_err(VigilError::session_start)?;

            let (browser, mut handler) = Browser::launch(cdp_config)
                .await
                .map_err(|e| VigilError::session_start(e.to_string()))?;

            let handler_task = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(err) = event {
                        debug!(error = %err, "cdp handler stopped");
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| VigilError::session_start(e.to_string()))?;

            let console = Arc::new(Mutex::new(Vec::new()));
            let mut tasks = vec![handler_task];
            tasks.extend(Self::capture_console(&page, &console).await?);

            debug!(width, height, headless = config.headless, "chromium session started");
            Ok(Self {
                browser,
                page,
                console,
                tasks,
            })
        }

        async fn capture_console(
            page: &Page,
            console: &Arc<Mutex<Vec<ConsoleEntry>>>,
        ) -> VigilResult<Vec<JoinHandle<()>>> {
            let mut calls = page
                .event_listener::<EventConsoleApiCalled>()
                .await
                .map_err(|e| VigilError::session_start(e.to_string()))?;
            let mut exceptions = page
                .event_listener::<EventExceptionThrown>()
                .await
                .map_err(|e| VigilError::session_start(e.to_string()))?;

            let sink = Arc::clone(console);
            let calls_task = tokio::spawn(async move {
                while let Some(event) = calls.next().await {
                    let args: Vec<_> = event
                        .args
                        .iter()
                        .map(|arg| (arg.value.clone(), arg.description.clone()))
                        .collect();
                    let entry = ConsoleEntry::new(
                        console_level(event.r#type.as_ref()),
                        render_console_args(&args),
                    );
                    sink.lock().await.push(entry);
                }
            });

            let sink = Arc::clone(console);
            let exceptions_task = tokio::spawn(async move {
                while let Some(event) = exceptions.next().await {
                    let details = &event.exception_details;
                    let message = details
                        .exception
                        .as_ref()
                        .and_then(|e| e.description.clone())
                        .unwrap_or_else(|| details.text.clone());
                    sink.lock()
                        .await
                        .push(ConsoleEntry::new(LogLevel::Severe, message));
                }
            });

            Ok(vec![calls_task, exceptions_task])
        }

        async fn evaluate_value(&self, script: &str) -> VigilResult<serde_json::Value> {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| VigilError::script(e.to_string()))?;
            Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
        }
    }

    #[async_trait]
    impl BrowserDriver for ChromiumDriver {
        async fn navigate(&mut self, url: &str) -> VigilResult<()> {
            self.console.lock().await.clear();
            let response = self
                .page
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| VigilError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            if let Some(ref message) = response.result.error_text {
                return Err(VigilError::Navigation {
                    url: url.to_string(),
                    message: message.clone(),
                });
            }
            Ok(())
        }

        async fn current_url(&self) -> VigilResult<String> {
            let url = self
                .page
                .url()
                .await
                .map_err(|e| VigilError::driver(e.to_string()))?;
            Ok(url.unwrap_or_default())
        }

        async fn title(&self) -> VigilResult<String> {
            let title = self
                .page
                .get_title()
                .await
                .map_err(|e| VigilError::driver(e.to_string()))?;
            Ok(title.unwrap_or_default())
        }

        async fn page_source(&self) -> VigilResult<String> {
            self.page
                .content()
                .await
                .map_err(|e| VigilError::driver(e.to_string()))
        }

        async fn find_all(&self, selector: &Selector) -> VigilResult<Vec<ElementSnapshot>> {
            let value = self.evaluate_value(&selector.snapshot_script()).await?;
            serde_json::from_value(value).map_err(|e| {
                VigilError::script(format!("unexpected snapshot for {selector}: {e}"))
            })
        }

        async fn click(&self, selector: &Selector, index: usize) -> VigilResult<()> {
            let clicked = self.evaluate_value(&selector.click_script(index)).await?;
            if clicked == serde_json::Value::Bool(true) {
                Ok(())
            } else {
                Err(VigilError::not_found(format!("{selector} [{index}]")))
            }
        }

        async fn execute(&self, script: &str) -> VigilResult<serde_json::Value> {
            self.evaluate_value(script).await
        }

        async fn resize(&mut self, width: u32, height: u32) -> VigilResult<()> {
            let params = SetDeviceMetricsOverrideParams::new(
                i64::from(width),
                i64::from(height),
                1.0,
                false,
            );
            self.page
                .execute(params)
                .await
                .map_err(|e| VigilError::driver(e.to_string()))?;
            Ok(())
        }

        async fn viewport(&self) -> VigilResult<(u32, u32)> {
            let value = self
                .evaluate_value("[window.innerWidth, window.innerHeight]")
                .await?;
            serde_json::from_value(value)
                .map_err(|e| VigilError::script(format!("unexpected viewport: {e}")))
        }

        async fn ready_state(&self) -> VigilResult<String> {
            let value = self.evaluate_value("document.readyState").await?;
            Ok(value.as_str().unwrap_or_default().to_string())
        }

        async fn console_logs(&self) -> VigilResult<Vec<ConsoleEntry>> {
            Ok(self.console.lock().await.clone())
        }

        async fn quit(&mut self) -> VigilResult<()> {
            let closed = self.browser.close().await;
            for task in self.tasks.drain(..) {
                task.abort();
            }
            if let Err(err) = closed {
                warn!(error = %err, "browser close failed");
                return Err(VigilError::driver(err.to_string()));
            }
            let _ = self.browser.wait().await;
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumLauncher};
