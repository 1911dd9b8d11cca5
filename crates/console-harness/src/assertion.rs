//! Assertions that fail with [`HarnessError::AssertionFailed`].
//!
//! Because failures are ordinary errors rather than panics, any assertion
//! can be wrapped in [`crate::retry`] to wait out an asynchronous re-render.

use crate::driver::{ElementHandle, UiDriver};
use crate::locator::Selector;
use crate::result::{HarnessError, HarnessResult};
use std::fmt::Debug;

/// Assert two values are equal
pub fn expect_eq<T: PartialEq + Debug>(actual: &T, expected: &T, what: &str) -> HarnessResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "{what}: expected {expected:?}, got {actual:?}"
        )))
    }
}

/// Assert a condition holds
pub fn expect_true(condition: bool, message: &str) -> HarnessResult<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::assertion(message))
    }
}

/// Assert a collection has exactly `expected` items
pub fn expect_len<T>(items: &[T], expected: usize, what: &str) -> HarnessResult<()> {
    expect_eq(&items.len(), &expected, &format!("{what} count"))
}

/// Start a fluent assertion over resolved elements
#[must_use]
pub fn assert_elements(driver: &dyn UiDriver, elements: Vec<ElementHandle>) -> ElementsAssert<'_> {
    ElementsAssert { driver, elements }
}

/// Fluent assertions over a list of elements
pub struct ElementsAssert<'a> {
    driver: &'a dyn UiDriver,
    elements: Vec<ElementHandle>,
}

impl Debug for ElementsAssert<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementsAssert")
            .field("elements", &self.elements)
            .finish_non_exhaustive()
    }
}

impl<'a> ElementsAssert<'a> {
    /// Exactly `size` elements
    pub fn has_size(self, size: usize) -> HarnessResult<Self> {
        expect_len(&self.elements, size, "elements")?;
        Ok(self)
    }

    /// Element at `index`, which must exist
    pub fn get(&self, index: usize) -> HarnessResult<ElementAssert<'a>> {
        let element = self.elements.get(index).cloned().ok_or_else(|| {
            HarnessError::assertion(format!(
                "no element at index {index} (have {})",
                self.elements.len()
            ))
        })?;
        Ok(ElementAssert {
            driver: self.driver,
            element,
        })
    }
}

/// Fluent assertions over one element
pub struct ElementAssert<'a> {
    driver: &'a dyn UiDriver,
    element: ElementHandle,
}

impl Debug for ElementAssert<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementAssert")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

impl ElementAssert<'_> {
    /// Underlying handle
    #[must_use]
    pub const fn element(&self) -> &ElementHandle {
        &self.element
    }

    /// Rendered text equals `value`
    pub async fn has_value(self, value: &str) -> HarnessResult<Self> {
        let text = self.driver.text(&self.element).await?;
        expect_eq(&text.as_str(), &value, "element text")?;
        Ok(self)
    }

    /// The element's `dt`/`dd` pairs contain `key`, mapped to `value` when
    /// given
    pub async fn map_contains(self, key: &str, value: Option<&str>) -> HarnessResult<Self> {
        let keys = self.texts("dt").await?;
        let values = self.texts("dd").await?;
        expect_eq(&keys.len(), &values.len(), "dt/dd pairs")?;
        let index = keys.iter().position(|k| k == key).ok_or_else(|| {
            HarnessError::assertion(format!("key '{key}' not found in {keys:?}"))
        })?;
        if let Some(expected) = value {
            expect_eq(&values[index].as_str(), &expected, &format!("value of '{key}'"))?;
        }
        Ok(self)
    }

    async fn texts(&self, tag: &str) -> HarnessResult<Vec<String>> {
        let mut texts = Vec::new();
        for item in self
            .driver
            .find_all(Some(&self.element), &Selector::tag(tag))
            .await?
        {
            texts.push(self.driver.text(&item).await?.trim().to_string());
        }
        Ok(texts)
    }
}
