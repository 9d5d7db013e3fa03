//! Page automation interface and implementations.
//!
//! The pipeline drives a single shared browser page: navigation,
//! element queries, and simulated activations all go through the
//! [`PageAutomation`] trait so that every component's dependency on the
//! session is visible in its signature, and so the core logic can be
//! exercised against an in-memory fake.

mod chrome;

#[cfg(test)]
pub mod testing;

pub use chrome::ChromeSession;

use crate::error::AutomationError;
use async_trait::async_trait;

/// Capabilities of a single automated browser page.
///
/// All operations act on the page's current document; navigating away
/// invalidates previously returned elements, so callers finish reading
/// a page before moving on. Implementations are not required to support
/// concurrent use.
#[async_trait]
pub trait PageAutomation: Send + Sync {
    /// Opaque handle to an element on the current page.
    type Element: Send + Sync;

    /// Navigates the page to the given URL.
    async fn navigate(&self, url: &str) -> Result<(), AutomationError>;

    /// Waits for dynamically loaded content to settle.
    async fn wait_settled(&self) -> Result<(), AutomationError>;

    /// Returns the first element matching `selector`, if any.
    async fn query_single(&self, selector: &str)
    -> Result<Option<Self::Element>, AutomationError>;

    /// Returns all elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, AutomationError>;

    /// Simulates a user activation (click) on the element.
    async fn activate(&self, element: &Self::Element) -> Result<(), AutomationError>;

    /// Reads the element's visible text.
    async fn read_text(&self, element: &Self::Element) -> Result<String, AutomationError>;

    /// Reads an attribute value from the element.
    async fn read_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, AutomationError>;

    /// Scrolls to the bottom repeatedly until the page stops growing,
    /// forcing lazy-loaded listing content to materialize.
    async fn scroll_to_bottom_until_stable(&self) -> Result<(), AutomationError>;
}
