//! Mock browser backend for exercising the harness without Chromium.
//!
//! A [`MockSite`] maps paths to scripted [`MockPage`]s whose elements can
//! attach after a delay, so timing-sensitive behaviour of the wait engine can
//! be tested on a paused tokio clock.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vigil::mock::{MockElement, MockLauncher, MockPage, MockSite};
//!
//! let site = MockSite::new().route(
//!     "/gallery",
//!     MockPage::new()
//!         .with_title("Gallery")
//!         .with_element(MockElement::button("All").appears_after(Duration::from_secs(2))),
//! );
//! let launcher = MockLauncher::new(site);
//! let handle = launcher.handle();
//! // ... run a suite, then inspect handle.calls()
//! ```

mod driver;
mod page;

pub use driver::{MockDriver, MockHandle, MockLauncher, MockSite};
pub use page::{MockElement, MockPage};
