//! Condition predicates polled by the wait engine.
//!
//! A condition reads remote state through the [`Session`] and reports either
//! [`Probe::Matched`] with an extracted value or [`Probe::NotYet`] with a short
//! description of what it saw. Conditions never mutate the page; the wait
//! engine may evaluate them many times per second.

use crate::result::VigilResult;
use crate::selector::{ElementRef, Selector};
use crate::session::Session;
use async_trait::async_trait;

/// Outcome of a single evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Condition holds; carries the extracted value
    Matched(T),
    /// Condition does not hold yet; carries the observed state
    NotYet(String),
}

impl<T> Probe<T> {
    /// Check if matched
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// A named, side-effect free predicate over session state
#[async_trait]
pub trait Condition: Send + Sync {
    /// Value extracted on match
    type Output: Send;

    /// Name used in logs and timeout errors
    fn name(&self) -> String;

    /// Evaluate once against the current remote state
    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<Self::Output>>;
}

/// At least one element matches the selector
#[derive(Debug, Clone)]
pub struct ElementPresent {
    selector: Selector,
}

/// Wait for any element matching `selector`; yields the first match
#[must_use]
pub fn element_present(selector: impl Into<Selector>) -> ElementPresent {
    ElementPresent {
        selector: selector.into(),
    }
}

#[async_trait]
impl Condition for ElementPresent {
    type Output = ElementRef;

    fn name(&self) -> String {
        format!("element-present({})", self.selector)
    }

    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<ElementRef>> {
        let found = session.find_all(&self.selector).await?;
        Ok(match found.into_iter().next() {
            Some(element) => Probe::Matched(element),
            None => Probe::NotYet("no matching elements".to_string()),
        })
    }
}

/// A matching element is present, visible, enabled and not covered
#[derive(Debug, Clone)]
pub struct ElementClickable {
    selector: Selector,
}

/// Wait for a clickable element matching `selector`; yields the first one
#[must_use]
pub fn element_clickable(selector: impl Into<Selector>) -> ElementClickable {
    ElementClickable {
        selector: selector.into(),
    }
}

#[async_trait]
impl Condition for ElementClickable {
    type Output = ElementRef;

    fn name(&self) -> String {
        format!("element-clickable({})", self.selector)
    }

    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<ElementRef>> {
        let found = session.find_all(&self.selector).await?;
        if found.is_empty() {
            return Ok(Probe::NotYet("no matching elements".to_string()));
        }
        let total = found.len();
        let hidden = found.iter().filter(|e| !e.is_displayed()).count();
        let disabled = found.iter().filter(|e| !e.is_enabled()).count();
        Ok(match found.into_iter().find(ElementRef::is_clickable) {
            Some(element) => Probe::Matched(element),
            None => Probe::NotYet(format!(
                "{total} matching, none clickable ({hidden} hidden, {disabled} disabled, rest covered)"
            )),
        })
    }
}

/// Current URL contains a substring
#[derive(Debug, Clone)]
pub struct UrlContains {
    fragment: String,
}

/// Wait for the current URL to contain `fragment`; yields the URL
#[must_use]
pub fn url_contains(fragment: impl Into<String>) -> UrlContains {
    UrlContains {
        fragment: fragment.into(),
    }
}

#[async_trait]
impl Condition for UrlContains {
    type Output = String;

    fn name(&self) -> String {
        format!("url-contains({})", self.fragment)
    }

    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<String>> {
        let url = session.current_url().await?;
        Ok(if url.contains(&self.fragment) {
            Probe::Matched(url)
        } else {
            Probe::NotYet(format!("url is {url}"))
        })
    }
}

/// Some element matching the selector has exactly the expected text
#[derive(Debug, Clone)]
pub struct TextEquals {
    selector: Selector,
    expected: String,
}

/// Wait for an element matching `selector` whose trimmed text equals
/// `expected`; yields that element
#[must_use]
pub fn text_equals(selector: impl Into<Selector>, expected: impl Into<String>) -> TextEquals {
    TextEquals {
        selector: selector.into(),
        expected: expected.into(),
    }
}

#[async_trait]
impl Condition for TextEquals {
    type Output = ElementRef;

    fn name(&self) -> String {
        format!("text-equals({}, {:?})", self.selector, self.expected)
    }

    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<ElementRef>> {
        let found = session.find_all(&self.selector).await?;
        let seen: Vec<String> = found.iter().map(|e| format!("{:?}", e.text())).collect();
        Ok(match found.into_iter().find(|e| e.text() == self.expected) {
            Some(element) => Probe::Matched(element),
            None if seen.is_empty() => Probe::NotYet("no matching elements".to_string()),
            None => Probe::NotYet(format!("texts: [{}]", seen.join(", "))),
        })
    }
}

/// `document.readyState` is `complete`
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentReady;

/// Wait for the document to finish loading
#[must_use]
pub const fn document_ready() -> DocumentReady {
    DocumentReady
}

#[async_trait]
impl Condition for DocumentReady {
    type Output = ();

    fn name(&self) -> String {
        "document-ready".to_string()
    }

    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<()>> {
        let state = session.ready_state().await?;
        Ok(if state == "complete" {
            Probe::Matched(())
        } else {
            Probe::NotYet(format!("readyState is {state}"))
        })
    }
}

/// The page reports the given viewport size
#[derive(Debug, Clone, Copy)]
pub struct ViewportIs {
    width: u32,
    height: u32,
}

/// Wait for layout to reflect a resize
#[must_use]
pub const fn viewport_is(width: u32, height: u32) -> ViewportIs {
    ViewportIs { width, height }
}

#[async_trait]
impl Condition for ViewportIs {
    type Output = (u32, u32);

    fn name(&self) -> String {
        format!("viewport-is({}x{})", self.width, self.height)
    }

    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<(u32, u32)>> {
        let (width, height) = session.reported_viewport().await?;
        Ok(if (width, height) == (self.width, self.height) {
            Probe::Matched((width, height))
        } else {
            Probe::NotYet(format!("viewport is {width}x{height}"))
        })
    }
}

/// The document has a non-empty title
#[derive(Debug, Clone, Copy, Default)]
pub struct TitlePresent;

/// Wait for a non-empty document title; yields it
#[must_use]
pub const fn title_present() -> TitlePresent {
    TitlePresent
}

#[async_trait]
impl Condition for TitlePresent {
    type Output = String;

    fn name(&self) -> String {
        "title-present".to_string()
    }

    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<String>> {
        let title = session.title().await?;
        Ok(if title.trim().is_empty() {
            Probe::NotYet("title is empty".to_string())
        } else {
            Probe::Matched(title)
        })
    }
}

/// A script evaluates to a truthy value
#[derive(Debug, Clone)]
pub struct ScriptTruthy {
    name: String,
    script: String,
}

/// Wait for `script` to evaluate truthy; yields the value
#[must_use]
pub fn script_truthy(name: impl Into<String>, script: impl Into<String>) -> ScriptTruthy {
    ScriptTruthy {
        name: name.into(),
        script: script.into(),
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[async_trait]
impl Condition for ScriptTruthy {
    type Output = serde_json::Value;

    fn name(&self) -> String {
        format!("script-truthy({})", self.name)
    }

    async fn evaluate(&self, session: &Session) -> VigilResult<Probe<serde_json::Value>> {
        let value = session.execute(&self.script).await?;
        Ok(if is_truthy(&value) {
            Probe::Matched(value)
        } else {
            Probe::NotYet(format!("script returned {value}"))
        })
    }
}
