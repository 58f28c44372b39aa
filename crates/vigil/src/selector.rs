//! Element selectors and the element snapshots they resolve to.
//!
//! A [`Selector`] renders to a JavaScript expression yielding an array of
//! matching DOM elements, so any driver that can evaluate script can resolve
//! it. Resolution always produces a snapshot ([`ElementRef`]), never a live
//! handle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary", "h1, h2, h3")
    Css(String),
    /// Anchor whose trimmed visible text equals the given string
    LinkText(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a link-text selector
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// JavaScript expression evaluating to an array of matching elements
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(css) => format!("Array.from(document.querySelectorAll({}))", js_string(css)),
            Self::LinkText(text) => format!(
                "Array.from(document.querySelectorAll('a')).filter(el => (el.innerText || el.textContent || '').trim() === {})",
                js_string(text)
            ),
        }
    }

    /// Script returning a JSON snapshot of every matching element
    #[must_use]
    pub fn snapshot_script(&self) -> String {
        format!(
            r"(() => {{
  const els = {query};
  return els.map((el, index) => {{
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const visible = rect.width > 0 && rect.height > 0
      && style.visibility !== 'hidden' && style.display !== 'none';
    let covered = false;
    if (visible) {{
      const top = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
      covered = top !== null && top !== el && !el.contains(top);
    }}
    const attributes = {{}};
    for (const attr of el.attributes) {{ attributes[attr.name] = attr.value; }}
    return {{
      index,
      tag: el.tagName.toLowerCase(),
      text: (el.innerText || el.textContent || '').trim(),
      visible,
      enabled: !el.disabled,
      covered,
      attributes,
    }};
  }});
}})()",
            query = self.to_query()
        )
    }

    /// Script clicking the `index`-th match; evaluates to `false` if it is gone
    #[must_use]
    pub fn click_script(&self, index: usize) -> String {
        format!(
            "(() => {{ const el = {}[{index}]; if (!el) {{ return false; }} el.click(); return true; }})()",
            self.to_query()
        )
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "{css}"),
            Self::LinkText(text) => write!(f, "link text {text:?}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(css: &str) -> Self {
        Self::Css(css.to_string())
    }
}

/// Quote a string as a JavaScript literal
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Snapshot of one element as reported by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Position among the selector's matches
    pub index: usize,
    /// Lower-cased tag name
    pub tag: String,
    /// Trimmed visible text
    #[serde(default)]
    pub text: String,
    /// Has a non-empty box and is not hidden
    #[serde(default)]
    pub visible: bool,
    /// Not disabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Another element sits on top of its center point
    #[serde(default)]
    pub covered: bool,
    /// Attribute name → value
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

const fn default_true() -> bool {
    true
}

impl ElementSnapshot {
    /// Create a visible, enabled snapshot with no text
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            index: 0,
            tag: tag.into(),
            text: String::new(),
            visible: true,
            enabled: true,
            covered: false,
            attributes: BTreeMap::new(),
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set enabled state
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Mark as covered by another element
    #[must_use]
    pub const fn with_covered(mut self, covered: bool) -> Self {
        self.covered = covered;
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Reference to a matched element: the selector that found it plus the
/// snapshot taken at lookup time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    /// Selector that produced this match
    pub selector: Selector,
    /// Snapshot at lookup time
    #[serde(flatten)]
    pub snapshot: ElementSnapshot,
}

impl ElementRef {
    /// Pair a snapshot with the selector that found it
    #[must_use]
    pub const fn new(selector: Selector, snapshot: ElementSnapshot) -> Self {
        Self { selector, snapshot }
    }

    /// Lower-cased tag name
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.snapshot.tag
    }

    /// Trimmed visible text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.snapshot.text
    }

    /// Attribute value, if present
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.snapshot.attributes.get(name).map(String::as_str)
    }

    /// Whether the element is displayed
    #[must_use]
    pub const fn is_displayed(&self) -> bool {
        self.snapshot.visible
    }

    /// Whether the element is enabled
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.snapshot.enabled
    }

    /// Present, visible, enabled and not covered
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.snapshot.visible && self.snapshot.enabled && !self.snapshot.covered
    }
}
