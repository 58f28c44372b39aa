//! Scripted page model served by the mock driver.

use crate::driver::ConsoleEntry;
use crate::selector::{ElementSnapshot, Selector};
use std::time::Duration;

/// One element on a mock page
#[derive(Debug, Clone)]
pub struct MockElement {
    /// CSS tokens this element answers to (tag name always included)
    matches: Vec<String>,
    /// Snapshot reported for it
    pub(crate) snapshot: ElementSnapshot,
    /// Delay after navigation before it is attached
    pub(crate) appears_after: Duration,
}

impl MockElement {
    /// Create an element answering to its tag name
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            matches: vec![tag.clone()],
            snapshot: ElementSnapshot::new(tag),
            appears_after: Duration::ZERO,
        }
    }

    /// Shorthand for a `<button>` with a label
    #[must_use]
    pub fn button(label: impl Into<String>) -> Self {
        Self::new("button").with_text(label)
    }

    /// Shorthand for an `<a>` with visible text and `href`
    #[must_use]
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new("a").with_text(text).with_attribute("href", href)
    }

    /// Also answer to the given CSS selector
    #[must_use]
    pub fn matching(mut self, css: impl Into<String>) -> Self {
        self.matches.push(css.into());
        self
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.snapshot.text = text.into();
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.snapshot.attributes.insert(name.into(), value.into());
        self
    }

    /// Attach only after `delay` has elapsed since navigation
    #[must_use]
    pub const fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    /// Render as hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.snapshot.visible = false;
        self
    }

    /// Render as disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.snapshot.enabled = false;
        self.snapshot
            .attributes
            .insert("disabled".to_string(), String::new());
        self
    }

    /// Render beneath an overlay
    #[must_use]
    pub const fn covered(mut self) -> Self {
        self.snapshot.covered = true;
        self
    }

    /// Whether this element is a match for `selector`
    pub(crate) fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Css(css) => css
                .split(',')
                .map(str::trim)
                .any(|part| self.matches.iter().any(|m| m == part)),
            Selector::LinkText(text) => self.snapshot.tag == "a" && self.snapshot.text == *text,
        }
    }
}

/// A page served for one path
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub(crate) title: String,
    pub(crate) source: Option<String>,
    pub(crate) elements: Vec<MockElement>,
    pub(crate) console: Vec<ConsoleEntry>,
    pub(crate) ready_after: Duration,
    pub(crate) redirect_to: Option<String>,
}

impl MockPage {
    /// Create an empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Override the serialized page source
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add an element
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Add a console entry emitted on load
    #[must_use]
    pub fn with_console(mut self, entry: ConsoleEntry) -> Self {
        self.console.push(entry);
        self
    }

    /// Report `readyState == "loading"` until `delay` has elapsed
    #[must_use]
    pub const fn ready_after(mut self, delay: Duration) -> Self {
        self.ready_after = delay;
        self
    }

    /// Redirect navigation to another path
    #[must_use]
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into());
        self
    }

    /// Visible text of attached elements, one per line, as `body.innerText`
    /// would report it
    pub(crate) fn body_text(&self, elapsed: Duration) -> String {
        self.elements
            .iter()
            .filter(|e| e.appears_after <= elapsed && e.snapshot.visible)
            .filter(|e| e.snapshot.tag != "body" && !e.snapshot.text.is_empty())
            .map(|e| e.snapshot.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Page source: the override, or markup generated from the elements
    pub(crate) fn render_source(&self, elapsed: Duration) -> String {
        if let Some(source) = &self.source {
            return source.clone();
        }
        let mut html = format!("<html><head><title>{}</title></head><body>", self.title);
        for element in self.elements.iter().filter(|e| e.appears_after <= elapsed) {
            html.push_str(&format!(
                "<{tag}>{text}</{tag}>",
                tag = element.snapshot.tag,
                text = element.snapshot.text
            ));
        }
        html.push_str("</body></html>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_matches_tag_and_extra_selectors() {
        let el = MockElement::new("section").matching("main section");
        assert!(el.matches(&Selector::css("section")));
        assert!(el.matches(&Selector::css("main section")));
        assert!(el.matches(&Selector::css("h1, section")));
        assert!(!el.matches(&Selector::css("div")));
    }

    #[test]
    fn test_link_text_matching() {
        let link = MockElement::link("Gallery", "/gallery");
        assert!(link.matches(&Selector::link_text("Gallery")));
        assert!(!link.matches(&Selector::link_text("About")));
        assert!(!MockElement::button("Gallery").matches(&Selector::link_text("Gallery")));
    }

    #[test]
    fn test_rendered_source_only_includes_attached_elements() {
        let page = MockPage::new()
            .with_title("Home")
            .with_element(MockElement::new("h1").with_text("Now"))
            .with_element(
                MockElement::new("p")
                    .with_text("Later")
                    .appears_after(Duration::from_secs(2)),
            );
        let early = page.render_source(Duration::from_secs(1));
        assert!(early.contains("<title>Home</title>"));
        assert!(early.contains("<h1>Now</h1>"));
        assert!(!early.contains("Later"));
        assert!(page.render_source(Duration::from_secs(2)).contains("<p>Later</p>"));
    }

    #[test]
    fn test_body_text_skips_hidden_and_pending() {
        let page = MockPage::new()
            .with_source("<script>window.onerror = report;</script>")
            .with_element(MockElement::new("body"))
            .with_element(MockElement::new("h1").with_text("404"))
            .with_element(MockElement::new("p").with_text("secret").hidden())
            .with_element(
                MockElement::new("p")
                    .with_text("Page Not Found")
                    .appears_after(Duration::from_secs(1)),
            );
        assert_eq!(page.body_text(Duration::ZERO), "404");
        assert_eq!(page.body_text(Duration::from_secs(1)), "404\nPage Not Found");
    }

    #[test]
    fn test_disabled_sets_attribute() {
        let el = MockElement::button("Go").disabled();
        assert!(!el.snapshot.enabled);
        assert!(el.snapshot.attributes.contains_key("disabled"));
    }
}
