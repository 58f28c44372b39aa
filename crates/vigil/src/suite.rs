//! The gallery verification suite.
//!
//! Fifteen ordered cases against the gallery application, sharing one
//! session. Cases 1-9 exercise the happy path; 10-15 probe error handling
//! and degraded conditions. Every fixed pause is replaced by a condition
//! wait, so the suite is as fast as the page allows.

use crate::condition::{
    document_ready, element_clickable, element_present, title_present, url_contains, viewport_is,
};
use crate::driver::LogLevel;
use crate::harness::{Intent, TestCase, TestSuite};
use crate::result::{ensure, VigilError, VigilResult};
use crate::selector::Selector;
use crate::session::Session;
use crate::strategy::{with_fallback, Route};
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::Instant;

/// Gallery route
pub const GALLERY_PATH: &str = "/gallery";

/// Unknown route used by the 404 case
pub const MISSING_PAGE_PATH: &str = "/non-existent-page";

/// Unknown route used by the invalid URL case
pub const INVALID_PAGE_PATH: &str = "/invalid-page-12345";

/// Page-load budget for the performance case
pub const LOAD_BUDGET: Duration = Duration::from_secs(10);

/// Page-load budget under degraded network conditions
pub const SLOW_LOAD_BUDGET: Duration = Duration::from_secs(30);

/// Mobile viewport checked by the responsiveness case
pub const MOBILE_VIEWPORT: (u32, u32) = (375, 667);

/// Desktop viewport restored by the responsiveness case
pub const DESKTOP_VIEWPORT: (u32, u32) = (1920, 1080);

/// Markers that identify an error page, matched against visible body text
const ERROR_INDICATORS: [&str; 2] = ["404", "not found"];

/// Name of the suite built by [`gallery_suite`]
pub const SUITE_NAME: &str = "gallery";

/// The full ordered gallery suite
pub fn gallery_suite() -> VigilResult<TestSuite> {
    use Intent::{Negative, Positive};
    TestSuite::from_cases(
        SUITE_NAME,
        vec![
            TestCase::new(1, "Homepage loads successfully", Positive, homepage_loads),
            TestCase::new(2, "Navigation to Gallery page works", Positive, gallery_navigation),
            TestCase::new(3, "Gallery page displays filter buttons", Positive, gallery_filters),
            TestCase::new(4, "Filter functionality works", Positive, filter_functionality),
            TestCase::new(5, "Page responsiveness check", Positive, page_responsiveness),
            TestCase::new(6, "Main content sections present", Positive, main_content_sections),
            TestCase::new(7, "JavaScript functionality verification", Positive, javascript_functionality),
            TestCase::new(8, "Form elements accessibility", Positive, form_accessibility),
            TestCase::new(9, "Page loading performance", Positive, page_loading_performance),
            TestCase::new(10, "Error handling and 404 page", Negative, error_handling_404),
            TestCase::new(11, "Invalid URL handling", Negative, invalid_url_handling),
            TestCase::new(12, "Broken image handling", Negative, broken_image_handling),
            TestCase::new(13, "Form validation", Negative, form_validation),
            TestCase::new(14, "Slow network handling", Negative, slow_network_handling)
                .with_timeout(SLOW_LOAD_BUDGET + Duration::from_secs(5)),
            TestCase::new(15, "JavaScript errors detection", Negative, javascript_errors_detection),
        ],
    )
}

fn homepage_loads(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path("/").await?;
        let title = session.wait_for(title_present()).await?;
        Ok(format!("Homepage loaded with title: {title}"))
    })
}

fn gallery_via_link(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path("/").await?;
        let link = session
            .wait_for(element_clickable(Selector::link_text("Gallery")))
            .await?;
        session.click(&link).await?;
        session.wait_for(url_contains(GALLERY_PATH)).await
    })
}

fn gallery_via_url(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(url_contains(GALLERY_PATH)).await
    })
}

fn gallery_navigation(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        let routed = with_fallback(session, gallery_via_link, gallery_via_url).await?;
        Ok(match routed.route {
            Route::Primary => format!("Navigated to gallery via navbar link ({})", routed.value),
            Route::Fallback => {
                let reason = routed
                    .primary_error
                    .map_or_else(String::new, |err| format!("; link navigation failed: {err}"));
                format!("Gallery reachable via direct URL ({}){reason}", routed.value)
            }
        })
    })
}

fn gallery_filters(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(element_present("button")).await?;
        let buttons = session.find_all(&Selector::css("button")).await?;
        ensure(!buttons.is_empty(), "filter buttons", "at least one button", 0)?;
        let labels: Vec<&str> = buttons.iter().map(|b| b.text()).collect();
        ensure(
            labels.contains(&"All"),
            "filter button labeled \"All\"",
            "a button labeled \"All\"",
            format!("{labels:?}"),
        )?;
        Ok(format!(
            "{} buttons present including \"All\"",
            buttons.len()
        ))
    })
}

fn filter_functionality(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(element_present("button")).await?;
        let buttons = session.find_all(&Selector::css("button")).await?;
        let characters = buttons
            .into_iter()
            .find(|b| b.text() == "Characters")
            .ok_or_else(|| VigilError::not_found("button labeled \"Characters\""))?;
        ensure(
            characters.is_clickable(),
            "\"Characters\" filter is clickable",
            "visible, enabled and uncovered",
            format!(
                "visible={} enabled={}",
                characters.is_displayed(),
                characters.is_enabled()
            ),
        )?;
        session.click(&characters).await?;
        let url = session.wait_for(url_contains(GALLERY_PATH)).await?;
        let items = session.find_all(&Selector::css("h3")).await?.len();
        Ok(format!(
            "\"Characters\" filter clicked; still on {url} with {items} gallery items \
             (filtered content not verified)"
        ))
    })
}

fn page_responsiveness(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;

        let (mobile_w, mobile_h) = MOBILE_VIEWPORT;
        session.resize(mobile_w, mobile_h).await?;
        session.wait_for(viewport_is(mobile_w, mobile_h)).await?;
        let body = session.wait_for(element_present("body")).await?;
        ensure(body.is_displayed(), "body displayed in mobile view", true, false)?;

        let (desktop_w, desktop_h) = DESKTOP_VIEWPORT;
        session.resize(desktop_w, desktop_h).await?;
        session.wait_for(viewport_is(desktop_w, desktop_h)).await?;
        let body = session.wait_for(element_present("body")).await?;
        ensure(body.is_displayed(), "body displayed in desktop view", true, false)?;

        Ok(format!(
            "Page displayed at {mobile_w}x{mobile_h} and {desktop_w}x{desktop_h}"
        ))
    })
}

fn main_content_sections(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(element_present("main")).await?;
        let sections = session.find_all(&Selector::css("section")).await?.len();
        ensure(sections > 0, "content sections", "> 0", sections)?;
        let headings = session.find_all(&Selector::css("h1, h2, h3")).await?.len();
        ensure(headings > 0, "heading elements", "> 0", headings)?;
        Ok(format!("{sections} sections and {headings} headings present"))
    })
}

fn javascript_functionality(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(document_ready()).await?;
        let react = session
            .execute(
                "typeof React !== 'undefined' || document.querySelector('[data-reactroot]') !== null",
            )
            .await?;
        let sum = session.execute("2 + 2").await?;
        ensure(sum.as_i64() == Some(4), "2 + 2 in page context", 4, &sum)?;
        Ok(format!(
            "JavaScript executes correctly (React global detected: {})",
            react.as_bool().unwrap_or(false)
        ))
    })
}

fn form_accessibility(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(element_present("body")).await?;
        let buttons = session.find_all(&Selector::css("button")).await?;
        let links = session.find_all(&Selector::css("a")).await?.len();
        let inputs = session.find_all(&Selector::css("input")).await?.len();
        let interactive = buttons.len() + links + inputs;
        ensure(interactive > 0, "interactive elements", "> 0", interactive)?;
        for button in &buttons {
            ensure(
                button.is_enabled() || button.attribute("disabled").is_some(),
                format!("button {:?} is enabled or marked disabled", button.text()),
                "enabled or disabled attribute",
                "disabled without attribute",
            )?;
        }
        Ok(format!(
            "{} buttons, {links} links, {inputs} inputs; all buttons accessible",
            buttons.len()
        ))
    })
}

fn page_loading_performance(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        let start = Instant::now();
        session.navigate_path(GALLERY_PATH).await?;
        session
            .wait_for_within(element_present("body"), LOAD_BUDGET)
            .await?;
        let elapsed = start.elapsed();
        ensure(
            elapsed < LOAD_BUDGET,
            "gallery load time",
            format!("< {}ms", LOAD_BUDGET.as_millis()),
            format!("{}ms", elapsed.as_millis()),
        )?;
        Ok(format!("Page loaded in {}ms", elapsed.as_millis()))
    })
}

/// Load `path` and require an error marker in the visible text or a
/// redirect to the gallery. Markup and inline scripts are not searched.
async fn expect_error_page(session: &mut Session, path: &str) -> VigilResult<String> {
    session.navigate_path(path).await?;
    let body = session.wait_for(element_present("body")).await?;
    let text = body.text().to_lowercase();
    let url = session.current_url().await?;
    if let Some(marker) = ERROR_INDICATORS.iter().find(|m| text.contains(*m)) {
        return Ok(format!("{path} shows an error page (found {marker:?})"));
    }
    if url.contains(GALLERY_PATH) {
        return Ok(format!("{path} redirected to {url}"));
    }
    Err(VigilError::assertion(
        format!("{path} handled as an error"),
        format!(
            "one of {} in page text or redirect to {GALLERY_PATH}",
            ERROR_INDICATORS.map(|m| format!("{m:?}")).join(", ")
        ),
        format!("none of the indicators present at {url}"),
    ))
}

fn error_handling_404(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(expect_error_page(session, MISSING_PAGE_PATH))
}

fn invalid_url_handling(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(expect_error_page(session, INVALID_PAGE_PATH))
}

/// Images that finished loading but have no pixels
const BROKEN_IMAGES_SCRIPT: &str =
    "Array.from(document.images).filter(img => img.complete && img.naturalWidth === 0).length";

fn broken_image_handling(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(element_present("body")).await?;
        let images = session.find_all(&Selector::css("img")).await?;
        if images.is_empty() {
            return Ok("No images present".to_string());
        }
        let missing_src = images
            .iter()
            .filter(|img| img.attribute("src").map_or(true, str::is_empty))
            .count();
        ensure(missing_src == 0, "image src attributes defined", 0, missing_src)?;
        let broken = session.execute(BROKEN_IMAGES_SCRIPT).await?;
        let broken = broken
            .as_u64()
            .ok_or_else(|| VigilError::script(format!("expected an image count, got {broken}")))?;
        ensure(broken == 0, "images decoded", "0 broken", broken)?;
        Ok(format!("{} images with valid sources", images.len()))
    })
}

/// Required fields that are empty yet report themselves valid
const UNCHECKED_REQUIRED_SCRIPT: &str = "Array.from(document.querySelectorAll('input[required], textarea[required]')).filter(el => el.value === '' && el.checkValidity()).length";

fn form_validation(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(element_present("body")).await?;
        let inputs = session.find_all(&Selector::css("input")).await?.len();
        let textareas = session.find_all(&Selector::css("textarea")).await?.len();
        if inputs + textareas == 0 {
            return Ok("No form elements to validate on gallery page".to_string());
        }
        let unchecked = session.execute(UNCHECKED_REQUIRED_SCRIPT).await?;
        let unchecked = unchecked.as_u64().ok_or_else(|| {
            VigilError::script(format!("expected a field count, got {unchecked}"))
        })?;
        ensure(
            unchecked == 0,
            "empty required fields rejected by validation",
            0,
            unchecked,
        )?;
        Ok(format!(
            "{inputs} inputs and {textareas} textareas validated"
        ))
    })
}

fn slow_network_handling(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        let start = Instant::now();
        session.navigate_path(GALLERY_PATH).await?;
        session
            .wait_for_within(element_present("body"), SLOW_LOAD_BUDGET)
            .await?;
        let elapsed = start.elapsed();
        ensure(
            elapsed < SLOW_LOAD_BUDGET,
            "gallery load time under slow conditions",
            format!("< {}ms", SLOW_LOAD_BUDGET.as_millis()),
            format!("{}ms", elapsed.as_millis()),
        )?;
        Ok(format!(
            "Page handles slow loading gracefully ({}ms)",
            elapsed.as_millis()
        ))
    })
}

fn javascript_errors_detection(session: &mut Session) -> BoxFuture<'_, VigilResult<String>> {
    Box::pin(async move {
        session.navigate_path(GALLERY_PATH).await?;
        session.wait_for(document_ready()).await?;
        let sum = session.execute("2 + 2").await?;
        ensure(sum.as_i64() == Some(4), "2 + 2 in page context", 4, &sum)?;
        let logs = session.console_logs().await?;
        let severe: Vec<_> = logs
            .iter()
            .filter(|entry| entry.level == LogLevel::Severe)
            .collect();
        Ok(match severe.first() {
            None => "JavaScript error detection completed (0 severe errors)".to_string(),
            Some(first) => format!(
                "JavaScript error detection completed ({} severe errors, first: {})",
                severe.len(),
                first.message
            ),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::driver::ConsoleEntry;
    use crate::harness::TestHarness;
    use crate::mock::{MockElement, MockLauncher, MockPage, MockSite};
    use crate::report::Outcome;
    use serde_json::json;

    fn gallery_page() -> MockPage {
        MockPage::new()
            .with_title("Gallery | Artify")
            .with_element(MockElement::new("body"))
            .with_element(MockElement::new("main"))
            .with_element(MockElement::new("section"))
            .with_element(MockElement::new("section"))
            .with_element(MockElement::new("h1").with_text("Gallery"))
            .with_element(MockElement::link("Home", "/"))
            .with_element(MockElement::button("All"))
            .with_element(MockElement::button("Characters"))
            .with_element(MockElement::button("Environments"))
            .with_element(MockElement::new("h3").with_text("Wanderer"))
            .with_element(MockElement::new("img").with_attribute("src", "/art/wanderer.png"))
    }

    fn site() -> MockSite {
        MockSite::new()
            .route(
                "/",
                MockPage::new()
                    .with_title("Artify")
                    .with_element(MockElement::new("body"))
                    .with_element(MockElement::link("Gallery", "/gallery")),
            )
            .route("/gallery", gallery_page())
            .fallback(
                MockPage::new()
                    .with_title("Not Found")
                    .with_element(MockElement::new("body"))
                    .with_element(MockElement::new("h1").with_text("404 - Page Not Found")),
            )
            .script("2 + 2", json!(4))
            .script("typeof React", json!(true))
            .script("naturalWidth", json!(0))
            .script("checkValidity", json!(0))
    }

    fn config() -> RunConfig {
        RunConfig::new().with_timeout(2_000).with_poll_interval(100)
    }

    #[test]
    fn test_suite_shape() {
        let suite = gallery_suite().unwrap();
        assert_eq!(suite.len(), 15);
        let ordinals: Vec<u32> = suite.cases().iter().map(TestCase::ordinal).collect();
        assert_eq!(ordinals, (1..=15).collect::<Vec<_>>());
        assert_eq!(suite.filter_intent(Intent::Positive).len(), 9);
        assert_eq!(suite.filter_intent(Intent::Negative).len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_suite_passes_on_healthy_site() {
        let launcher = MockLauncher::new(site());
        let report = TestHarness::new(config())
            .run(&launcher, &gallery_suite().unwrap())
            .await
            .unwrap();
        for result in report.results() {
            assert_eq!(
                result.outcome,
                Outcome::Passed,
                "case {} {}: {}",
                result.ordinal,
                result.name,
                result.detail
            );
        }
        assert!(report.is_success());
        assert!(report.results()[0].detail.contains("Artify"));
        assert!(report.results()[1].detail.contains("navbar link"));
        assert_eq!(launcher.handle().quit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_falls_back_to_direct_url() {
        let site = site().route(
            "/",
            MockPage::new()
                .with_title("Artify")
                .with_element(MockElement::link("Gallery", "/gallery").hidden()),
        );
        let launcher = MockLauncher::new(site);
        let suite = gallery_suite().unwrap().filter_name("Navigation to Gallery");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        let result = &report.results()[0];
        assert_eq!(result.outcome, Outcome::Passed);
        assert!(result.detail.contains("direct URL"), "{}", result.detail);
        assert!(result.detail.contains("link navigation failed"), "{}", result.detail);
        assert!(launcher
            .handle()
            .navigations()
            .contains(&"http://localhost:8090/gallery".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_characters_button_fails() {
        let site = site().route(
            "/gallery",
            MockPage::new()
                .with_element(MockElement::new("body"))
                .with_element(MockElement::button("All")),
        );
        let launcher = MockLauncher::new(site);
        let suite = gallery_suite().unwrap().filter_name("Filter functionality");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        let result = &report.results()[0];
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.detail.contains("Characters"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_click_reports_unverified_effect() {
        let launcher = MockLauncher::new(site());
        let suite = gallery_suite().unwrap().filter_name("Filter functionality");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        let result = &report.results()[0];
        assert_eq!(result.outcome, Outcome::Passed, "{}", result.detail);
        assert!(result.detail.contains("/gallery with 1 gallery items"));
        assert!(result.detail.contains("not verified"));
        assert!(launcher.handle().calls().contains(&"click:button[1]".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_page_without_indicators_fails() {
        let site = site().fallback(
            MockPage::new()
                .with_title("Artify")
                .with_element(MockElement::new("body"))
                .with_element(MockElement::new("h1").with_text("Welcome")),
        );
        let launcher = MockLauncher::new(site);
        let suite = gallery_suite().unwrap().filter_name("404");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        let result = &report.results()[0];
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.detail.contains("\"404\""), "{}", result.detail);
        assert!(result.detail.contains("none of the indicators"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_to_gallery_counts_as_handled() {
        let site = site()
            .route(INVALID_PAGE_PATH, MockPage::new().redirect_to(GALLERY_PATH));
        let launcher = MockLauncher::new(site);
        let suite = gallery_suite().unwrap().filter_name("Invalid URL");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        assert!(report.results()[0].detail.contains("redirected"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_without_src_fails() {
        let site = site().route("/gallery", gallery_page().with_element(MockElement::new("img")));
        let launcher = MockLauncher::new(site);
        let suite = gallery_suite().unwrap().filter_name("Broken image");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        assert_eq!(report.results()[0].outcome, Outcome::Failed);
        assert!(report.results()[0].detail.contains("src"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_image_fails() {
        let site = MockSite::new()
            .route("/gallery", gallery_page())
            .script("naturalWidth", json!(2));
        let launcher = MockLauncher::new(site);
        let suite = gallery_suite().unwrap().filter_name("Broken image");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        assert_eq!(report.results()[0].outcome, Outcome::Failed);
        assert!(report.results()[0].detail.contains("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_errors_are_reported() {
        let site = site().route(
            "/gallery",
            gallery_page().with_console(ConsoleEntry::new(
                LogLevel::Severe,
                "Uncaught TypeError: x is undefined",
            )),
        );
        let launcher = MockLauncher::new(site);
        let suite = gallery_suite().unwrap().filter_name("JavaScript errors");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        let result = &report.results()[0];
        assert!(result.outcome.is_passed());
        assert!(result.detail.contains("1 severe errors"));
        assert!(result.detail.contains("TypeError"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_responsiveness_waits_for_layout() {
        let launcher = MockLauncher::new(site().resize_lag(Duration::from_millis(300)));
        let suite = gallery_suite().unwrap().filter_name("responsiveness");
        let report = TestHarness::new(config()).run(&launcher, &suite).await.unwrap();
        assert!(report.results()[0].outcome.is_passed());
        assert_eq!(launcher.handle().viewport(), DESKTOP_VIEWPORT);
        let calls = launcher.handle().calls();
        assert!(calls.contains(&"resize:375x667".to_string()));
        assert!(calls.contains(&"resize:1920x1080".to_string()));
    }
}
