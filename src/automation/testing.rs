//! In-memory page automation fake for unit tests.
//!
//! A [`FakePage`] holds a map of URL -> selector -> elements and
//! records navigations, activations, and per-selector query counts so
//! tests can assert on how the pipeline drove the session.

use super::PageAutomation;
use crate::error::AutomationError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A canned element: text plus attributes.
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    /// Identifier echoed into the activation log when clicked.
    pub id: String,
    /// Visible text returned by `read_text`.
    pub text: String,
    /// Attribute map consulted by `read_attribute`.
    pub attrs: HashMap<String, String>,
}

impl FakeElement {
    pub fn with_text(text: &str) -> Self {
        Self {
            id: text.to_string(),
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }
}

/// Fake page automation backed by per-URL selector maps.
#[derive(Debug, Default)]
pub struct FakePage {
    pages: HashMap<String, HashMap<String, Vec<FakeElement>>>,
    current: Mutex<String>,
    navigations: Mutex<Vec<String>>,
    activations: Mutex<Vec<String>>,
    query_counts: Mutex<HashMap<String, u32>>,
    session_limit: Mutex<Option<usize>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an element under (url, selector). Repeated calls for
    /// the same pair append in document order.
    pub fn add_element(&mut self, url: &str, selector: &str, element: FakeElement) {
        self.pages
            .entry(url.to_string())
            .or_default()
            .entry(selector.to_string())
            .or_default()
            .push(element);
    }

    /// Makes the session die after `navigations` successful
    /// navigations; every later navigation reports a lost session.
    pub fn lose_session_after(&self, navigations: usize) {
        *self.session_limit.lock().unwrap() = Some(navigations);
    }

    /// URLs navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    /// Element ids that were activated, in order.
    pub fn activations(&self) -> Vec<String> {
        self.activations.lock().unwrap().clone()
    }

    /// How many times a selector was queried (single or all).
    pub fn query_count(&self, selector: &str) -> u32 {
        self.query_counts
            .lock()
            .unwrap()
            .get(selector)
            .copied()
            .unwrap_or(0)
    }

    fn lookup(&self, selector: &str) -> Vec<FakeElement> {
        let current = self.current.lock().unwrap().clone();
        self.pages
            .get(&current)
            .and_then(|content| content.get(selector))
            .cloned()
            .unwrap_or_default()
    }

    fn count_query(&self, selector: &str) {
        *self
            .query_counts
            .lock()
            .unwrap()
            .entry(selector.to_string())
            .or_insert(0) += 1;
    }
}

#[async_trait]
impl PageAutomation for FakePage {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        if let Some(limit) = *self.session_limit.lock().unwrap()
            && self.navigations.lock().unwrap().len() >= limit
        {
            return Err(AutomationError::SessionLost("browser closed".to_string()));
        }
        *self.current.lock().unwrap() = url.to_string();
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn wait_settled(&self) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn query_single(&self, selector: &str) -> Result<Option<FakeElement>, AutomationError> {
        self.count_query(selector);
        Ok(self.lookup(selector).into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<FakeElement>, AutomationError> {
        self.count_query(selector);
        Ok(self.lookup(selector))
    }

    async fn activate(&self, element: &FakeElement) -> Result<(), AutomationError> {
        self.activations.lock().unwrap().push(element.id.clone());
        Ok(())
    }

    async fn read_text(&self, element: &FakeElement) -> Result<String, AutomationError> {
        Ok(element.text.clone())
    }

    async fn read_attribute(
        &self,
        element: &FakeElement,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        Ok(element.attrs.get(name).cloned())
    }

    async fn scroll_to_bottom_until_stable(&self) -> Result<(), AutomationError> {
        Ok(())
    }
}
