//! UiDriver - the browser capability the harness consumes.
//!
//! The harness never talks to a browser directly. Everything above this
//! trait (waits, table queries, scenarios) goes through [`UiDriver`], which
//! has two implementations:
//!
//! - [`crate::browser::ChromiumDriver`]: Chromium over CDP (`browser` feature)
//! - [`crate::mock::MockDriver`]: in-memory DOM for unit tests
//!
//! Element operations on a handle whose node has left the document fail with
//! [`crate::HarnessError::Stale`]. Drivers never retry on their own.

use crate::locator::Selector;
use crate::result::HarnessResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque reference to a DOM element resolved by a driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier
    pub id: String,
    /// Lower-case tag name at resolution time
    pub tag_name: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into().to_ascii_lowercase(),
        }
    }

    /// True if the element is an `input`
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.tag_name == "input"
    }
}

/// Browser automation capability
///
/// All methods take `&self`: a single session is shared by the running test
/// and its helpers, and is never used from two tests at once.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Navigate to an absolute URL
    async fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Current document title
    async fn title(&self) -> HarnessResult<String>;

    /// All elements matching `selector`, in document order.
    ///
    /// With a scope, only descendants of that element are searched.
    async fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        selector: &Selector,
    ) -> HarnessResult<Vec<ElementHandle>>;

    /// Rendered text of the element, trimmed
    async fn text(&self, element: &ElementHandle) -> HarnessResult<String>;

    /// Attribute value, `None` if absent
    async fn attribute(&self, element: &ElementHandle, name: &str)
        -> HarnessResult<Option<String>>;

    /// Whether the element is displayed
    async fn is_displayed(&self, element: &ElementHandle) -> HarnessResult<bool>;

    /// Click the element
    async fn click(&self, element: &ElementHandle) -> HarnessResult<()>;

    /// Type text into the element
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> HarnessResult<()>;

    /// Select the element's entire content (so the next keystrokes replace it)
    async fn select_all(&self, element: &ElementHandle) -> HarnessResult<()>;

    /// Evaluate a script in the page and return its JSON result
    async fn execute_script(&self, script: &str) -> HarnessResult<serde_json::Value>;

    /// Capture a PNG screenshot of the viewport
    async fn screenshot(&self) -> HarnessResult<Vec<u8>>;

    /// Resize the viewport
    async fn set_window_size(&self, width: u32, height: u32) -> HarnessResult<()>;

    /// Maximize the window
    async fn maximize(&self) -> HarnessResult<()>;

    /// Close the browser session
    async fn close(&self) -> HarnessResult<()>;
}

#[async_trait]
impl<T: UiDriver + ?Sized> UiDriver for std::sync::Arc<T> {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        (**self).navigate(url).await
    }

    async fn title(&self) -> HarnessResult<String> {
        (**self).title().await
    }

    async fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        selector: &Selector,
    ) -> HarnessResult<Vec<ElementHandle>> {
        (**self).find_all(scope, selector).await
    }

    async fn text(&self, element: &ElementHandle) -> HarnessResult<String> {
        (**self).text(element).await
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> HarnessResult<Option<String>> {
        (**self).attribute(element, name).await
    }

    async fn is_displayed(&self, element: &ElementHandle) -> HarnessResult<bool> {
        (**self).is_displayed(element).await
    }

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
        (**self).click(element).await
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        (**self).send_keys(element, text).await
    }

    async fn select_all(&self, element: &ElementHandle) -> HarnessResult<()> {
        (**self).select_all(element).await
    }

    async fn execute_script(&self, script: &str) -> HarnessResult<serde_json::Value> {
        (**self).execute_script(script).await
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        (**self).screenshot().await
    }

    async fn set_window_size(&self, width: u32, height: u32) -> HarnessResult<()> {
        (**self).set_window_size(width, height).await
    }

    async fn maximize(&self) -> HarnessResult<()> {
        (**self).maximize().await
    }

    async fn close(&self) -> HarnessResult<()> {
        (**self).close().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_normalizes_tag() {
        let handle = ElementHandle::new("e1", "INPUT");
        assert_eq!(handle.tag_name, "input");
        assert!(handle.is_input());
        assert!(!ElementHandle::new("e2", "div").is_input());
    }

    #[test]
    fn test_handle_serializes() {
        let handle = ElementHandle::new("e1", "td");
        let json = serde_json::to_string(&handle).unwrap();
        let back: ElementHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }
}
