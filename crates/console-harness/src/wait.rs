//! Locator & wait engine.
//!
//! Every interaction with the console goes through a [`Waiter`]: resolve a
//! locator, poll until the condition holds or the deadline passes, then act.
//! A stale reference seen while polling only means "not yet". A locator that
//! never resolves is [`HarnessError::NotFound`].
//!
//! ```no_run
//! # async fn demo(waiter: console_harness::Waiter<'_>) -> console_harness::HarnessResult<()> {
//! waiter.send_keys(&"username".into(), "admin").await?;
//! waiter.click(&"login_button".into()).await?;
//! let crumb = waiter.get_text(&"path_component".into()).await?;
//! # let _ = crumb;
//! # Ok(())
//! # }
//! ```

use crate::driver::{ElementHandle, UiDriver};
use crate::locator::{Locator, Selector, WaitCondition, WaitOptions};
use crate::result::{HarnessError, HarnessResult};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Attempts made for each of the first `minimum` list items before taking
/// whatever text it has
const LIST_ITEM_TEXT_ATTEMPTS: usize = 10;

/// Pause between list item text checks
const LIST_ITEM_TEXT_PAUSE: Duration = Duration::from_millis(50);

/// Polling front-end over a [`UiDriver`]
#[derive(Clone, Copy)]
pub struct Waiter<'a> {
    driver: &'a dyn UiDriver,
    options: WaitOptions,
}

impl std::fmt::Debug for Waiter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Waiter<'a> {
    /// Create a waiter with default options (15s deadline, 50ms polling)
    #[must_use]
    pub fn new(driver: &'a dyn UiDriver) -> Self {
        Self {
            driver,
            options: WaitOptions::default(),
        }
    }

    /// Create with custom options
    #[must_use]
    pub const fn with_options(driver: &'a dyn UiDriver, options: WaitOptions) -> Self {
        Self { driver, options }
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &'a dyn UiDriver {
        self.driver
    }

    /// Active wait options
    #[must_use]
    pub const fn options(&self) -> WaitOptions {
        self.options
    }

    // =========================================================================
    // Polling core
    // =========================================================================

    /// Run `probe` until it yields a value or `timeout` elapses.
    ///
    /// The probe runs at least once. Stale failures are swallowed; any other
    /// failure aborts the wait.
    pub(crate) async fn poll_until<T, F, Fut>(
        &self,
        timeout: Duration,
        mut probe: F,
    ) -> HarnessResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = HarnessResult<Option<T>>>,
    {
        let start = Instant::now();
        loop {
            match probe().await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(err) if err.is_stale() => debug!(error = %err, "stale while polling"),
                Err(err) => return Err(err),
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(None);
            }
            tokio::time::sleep(self.options.poll_interval().min(timeout - elapsed)).await;
        }
    }

    async fn first_matching(
        &self,
        scope: Option<&ElementHandle>,
        selector: &Selector,
        condition: WaitCondition,
    ) -> HarnessResult<Option<ElementHandle>> {
        for candidate in self.driver.find_all(scope, selector).await? {
            match condition {
                WaitCondition::Present => return Ok(Some(candidate)),
                WaitCondition::Visible => match self.driver.is_displayed(&candidate).await {
                    Ok(true) => return Ok(Some(candidate)),
                    Ok(false) => {}
                    Err(err) if err.is_stale() => {}
                    Err(err) => return Err(err),
                },
            }
        }
        Ok(None)
    }

    fn not_found(
        &self,
        locator: impl std::fmt::Display,
        condition: WaitCondition,
        timeout: Duration,
    ) -> HarnessError {
        HarnessError::NotFound {
            locator: locator.to_string(),
            condition: condition.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Wait until `locator` satisfies `condition`
    pub async fn wait_for(
        &self,
        locator: &Locator,
        condition: WaitCondition,
    ) -> HarnessResult<ElementHandle> {
        self.wait_for_with_timeout(locator, condition, self.options.timeout())
            .await
    }

    /// Wait with an explicit deadline
    pub async fn wait_for_with_timeout(
        &self,
        locator: &Locator,
        condition: WaitCondition,
        timeout: Duration,
    ) -> HarnessResult<ElementHandle> {
        let selector = locator.selector();
        let selector = &selector;
        let this = self;
        let found = self
            .poll_until(timeout, move || this.first_matching(None, selector, condition))
            .await?;
        found.ok_or_else(|| {
            debug!(%locator, %condition, timeout_ms = timeout.as_millis() as u64, "wait timed out");
            self.not_found(locator, condition, timeout)
        })
    }

    /// Shorthand for `wait_for(locator, Present)`
    pub async fn wait_present(&self, locator: &Locator) -> HarnessResult<ElementHandle> {
        self.wait_for(locator, WaitCondition::Present).await
    }

    /// Resolve without waiting. A missing element is `None`, not an error.
    pub async fn try_get(&self, locator: &Locator) -> HarnessResult<Option<ElementHandle>> {
        Ok(self
            .driver
            .find_all(None, &locator.selector())
            .await?
            .into_iter()
            .next())
    }

    /// Resolve an input that may be tagged directly or through a wrapper.
    ///
    /// If the element carrying the identifier is not an `input`, its first
    /// descendant `input` is returned instead.
    pub async fn wait_input(
        &self,
        locator: &Locator,
        condition: WaitCondition,
    ) -> HarnessResult<ElementHandle> {
        let start = Instant::now();
        let element = self.wait_for(locator, condition).await?;
        if element.is_input() {
            return Ok(element);
        }
        let remaining = self.options.timeout().saturating_sub(start.elapsed());
        let input = Selector::tag("input");
        let (input_ref, wrapper, this) = (&input, &element, self);
        let found = self
            .poll_until(remaining, move || async move {
                let inputs = this.driver.find_all(Some(wrapper), input_ref).await?;
                Ok::<_, HarnessError>(inputs.into_iter().next())
            })
            .await?;
        found.ok_or_else(|| {
            self.not_found(format!("{locator} > input"), condition, self.options.timeout())
        })
    }

    /// Resolve an input by its form `name`
    pub async fn wait_input_by_name(
        &self,
        name: &str,
        condition: WaitCondition,
    ) -> HarnessResult<ElementHandle> {
        self.wait_for(&Locator::input_name(name), condition).await
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Wait for the element to be visible, then click it
    pub async fn click(&self, locator: &Locator) -> HarnessResult<()> {
        let element = self.wait_for(locator, WaitCondition::Visible).await?;
        self.driver.click(&element).await
    }

    /// Type into the input identified by `locator` (directly or via wrapper)
    pub async fn send_keys(&self, locator: &Locator, text: &str) -> HarnessResult<()> {
        let input = self.wait_input(locator, WaitCondition::Visible).await?;
        self.driver.send_keys(&input, text).await
    }

    /// Wait for the element to be visible and return its text
    pub async fn get_text(&self, locator: &Locator) -> HarnessResult<String> {
        let element = self.wait_for(locator, WaitCondition::Visible).await?;
        self.driver.text(&element).await
    }

    /// Replace the content of a named input
    pub async fn replace_input_by_name(&self, name: &str, value: &str) -> HarnessResult<()> {
        let input = self.wait_input_by_name(name, WaitCondition::Visible).await?;
        self.driver.click(&input).await?;
        self.driver.select_all(&input).await?;
        self.driver.send_keys(&input, value).await
    }

    // =========================================================================
    // Indexed lists
    // =========================================================================

    /// Texts of the items `prefix0`, `prefix1`, ...
    ///
    /// The first `minimum` items are awaited and given a few polls to receive
    /// non-empty text, since lists render one item at a time. Further items
    /// are read only if already present, and empty texts among them are
    /// skipped.
    pub async fn get_text_list(&self, prefix: &str, minimum: usize) -> HarnessResult<Vec<String>> {
        let mut items = Vec::new();
        for index in 0..minimum {
            let locator = Locator::test_id(format!("{prefix}{index}"));
            let mut text = String::new();
            for attempt in 0..LIST_ITEM_TEXT_ATTEMPTS {
                text = self.get_text(&locator).await?;
                if !text.is_empty() {
                    break;
                }
                if attempt + 1 < LIST_ITEM_TEXT_ATTEMPTS {
                    tokio::time::sleep(LIST_ITEM_TEXT_PAUSE).await;
                }
            }
            items.push(text);
        }

        let mut index = minimum;
        while let Some(element) = self
            .try_get(&Locator::test_id(format!("{prefix}{index}")))
            .await?
        {
            index += 1;
            let text = self.driver.text(&element).await?;
            if !text.is_empty() {
                items.push(text);
            }
        }
        Ok(items)
    }

    /// First item `prefix{n}` whose text equals `text`, ignoring case.
    ///
    /// Fails with `NotFound` when the next index never appears.
    pub async fn find_in_list(&self, prefix: &str, text: &str) -> HarnessResult<ElementHandle> {
        let wanted = text.to_lowercase();
        let mut index = 0usize;
        loop {
            let locator = Locator::test_id(format!("{prefix}{index}"));
            let element = self.wait_for(&locator, WaitCondition::Visible).await?;
            if self.driver.text(&element).await?.to_lowercase() == wanted {
                return Ok(element);
            }
            index += 1;
        }
    }
}
